//! Edge ordering.
//!
//! Edges are printed fastest first. Printing a slow edge and then crossing it
//! with a fast one drags the fresh material, so all edges of a speed are
//! grouped into a bucket and buckets are scheduled in strictly descending
//! speed. Within a bucket, edges are ordered by material index so material
//! swaps cluster, then by input position.
//!
//! Speeds are grouped by exact value: two speeds that differ in the last bit
//! form separate buckets.

use crate::network::{Edge, EdgeId};
use crate::{CoordF, Error, Result};
use log::debug;
use std::cmp::Ordering;

/// Edges sharing one exact print speed.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeedBucket {
    /// Print speed of every edge in the bucket (mm/s).
    pub speed: CoordF,
    /// Edge ids in scheduling order.
    pub edges: Vec<EdgeId>,
}

impl SpeedBucket {
    /// Number of edges in the bucket.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Check if the bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Resolved edges grouped into speed buckets.
#[derive(Clone, Debug, Default)]
pub struct PrintJob {
    edges: Vec<Edge>,
    buckets: Vec<SpeedBucket>,
}

impl PrintJob {
    /// All edges, indexed by [`EdgeId`].
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Look up an edge by id.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    /// Speed buckets, fastest first.
    pub fn buckets(&self) -> &[SpeedBucket] {
        &self.buckets
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Total number of layers across all edges.
    pub fn total_layers(&self) -> u64 {
        self.edges.iter().map(|e| e.layers as u64).sum()
    }

    /// Edges of a bucket in scheduling order.
    pub fn bucket_edges<'a>(&'a self, bucket: &'a SpeedBucket) -> impl Iterator<Item = &'a Edge> {
        bucket.edges.iter().map(move |&id| self.edge(id))
    }
}

/// Builds a [`PrintJob`] from resolved edges.
#[derive(Clone, Copy, Debug, Default)]
pub struct EdgeOrderer;

impl EdgeOrderer {
    /// Create a new orderer.
    pub fn new() -> Self {
        Self
    }

    /// Sort key comparison: speed descending, material ascending, input
    /// position ascending.
    fn compare(a: &Edge, b: &Edge) -> Ordering {
        b.speed
            .total_cmp(&a.speed)
            .then(a.material.cmp(&b.material))
            .then(a.id.cmp(&b.id))
    }

    /// Partition edges into speed buckets.
    ///
    /// `edges[i]` must carry `EdgeId(i)`.
    pub fn order(&self, edges: Vec<Edge>) -> Result<PrintJob> {
        for (i, edge) in edges.iter().enumerate() {
            if edge.id != EdgeId(i) {
                return Err(Error::Configuration(format!(
                    "edge at position {} carries id {}; ids must match input order",
                    i, edge.id
                )));
            }
            if !edge.speed.is_finite() {
                return Err(Error::InvalidGeometry(format!(
                    "edge {} has non-finite speed",
                    edge.id
                )));
            }
        }

        let mut sorted: Vec<&Edge> = edges.iter().collect();
        sorted.sort_by(|a, b| Self::compare(a, b));

        let mut buckets: Vec<SpeedBucket> = Vec::new();
        for edge in sorted {
            match buckets.last_mut() {
                Some(bucket) if bucket.speed == edge.speed => bucket.edges.push(edge.id),
                _ => buckets.push(SpeedBucket {
                    speed: edge.speed,
                    edges: vec![edge.id],
                }),
            }
        }

        for bucket in &buckets {
            debug!(
                "Speed bucket {} mm/s: {} edges {:?}",
                bucket.speed,
                bucket.len(),
                bucket.edges.iter().map(|id| id.0).collect::<Vec<_>>()
            );
        }

        Ok(PrintJob { edges, buckets })
    }
}
