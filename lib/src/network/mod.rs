//! Printed network model.
//!
//! A network is a set of 1-based numbered nodes with planar positions and a
//! list of edges connecting them. Edges arrive as raw rows ([`EdgeSpec`]) and
//! become fully parameterised [`Edge`]s once their print parameters have been
//! resolved from the mapping tables.
//!
//! Edge identity is the row position in the input ([`EdgeId`]), never the
//! edge's values: a network may legally contain the same connection twice.

mod edge;

pub use edge::{Edge, EdgeId, EdgeSpec};

use crate::geometry::{PointF, Segment};
use crate::params::ParameterResolver;
use crate::{CoordF, Error, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// A network node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// 1-based node number, as used by the edge table.
    pub id: usize,
    /// Position in the logical frame (mm).
    pub position: PointF,
}

/// Node row as it appears in input files.
#[derive(Clone, Debug, Deserialize)]
struct NodeRow {
    #[serde(default)]
    id: Option<usize>,
    x: CoordF,
    y: CoordF,
}

#[derive(Clone, Debug, Deserialize)]
struct NetworkFile {
    nodes: Vec<NodeRow>,
    edges: Vec<EdgeSpec>,
}

/// Nodes and un-resolved edges of one input network.
#[derive(Clone, Debug, Default)]
pub struct NetworkGraph {
    nodes: Vec<Node>,
    edges: Vec<EdgeSpec>,
}

impl NetworkGraph {
    /// Build a graph from node positions (numbered from 1) and edge rows.
    pub fn new(positions: Vec<PointF>, edges: Vec<EdgeSpec>) -> Result<Self> {
        let nodes = positions
            .into_iter()
            .enumerate()
            .map(|(i, position)| Node { id: i + 1, position })
            .collect();
        let graph = Self { nodes, edges };
        graph.validate()?;
        Ok(graph)
    }

    /// Load a network from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a network from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: NetworkFile = serde_json::from_str(json)?;
        let mut positions = Vec::with_capacity(file.nodes.len());
        for (i, row) in file.nodes.into_iter().enumerate() {
            if let Some(id) = row.id {
                if id != i + 1 {
                    return Err(Error::InvalidGeometry(format!(
                        "node at row {} is numbered {}; nodes must be numbered 1..n in order",
                        i + 1,
                        id
                    )));
                }
            }
            positions.push(PointF::new(row.x, row.y));
        }
        Self::new(positions, file.edges)
    }

    /// Check that every edge refers to existing nodes with finite positions.
    pub fn validate(&self) -> Result<()> {
        for node in &self.nodes {
            if !node.position.is_finite() {
                return Err(Error::InvalidGeometry(format!(
                    "node {} has a non-finite position",
                    node.id
                )));
            }
        }

        let mut seen = HashSet::new();
        for (row, spec) in self.edges.iter().enumerate() {
            for &id in &spec.end_nodes {
                self.node(id)?;
            }
            let mut key = spec.end_nodes;
            key.sort_unstable();
            if !seen.insert(key) {
                warn!(
                    "Edge {} duplicates connection {}-{}; it will be printed again",
                    row, key[0], key[1]
                );
            }
        }
        Ok(())
    }

    /// Get a node by its 1-based number.
    pub fn node(&self, id: usize) -> Result<&Node> {
        id.checked_sub(1)
            .and_then(|i| self.nodes.get(i))
            .ok_or_else(|| {
                Error::InvalidGeometry(format!(
                    "edge refers to node {} but the network has nodes 1..={}",
                    id,
                    self.nodes.len()
                ))
            })
    }

    /// Segment between the two end nodes of an edge row.
    pub fn segment(&self, spec: &EdgeSpec) -> Result<Segment> {
        let a = self.node(spec.end_nodes[0])?.position;
        let b = self.node(spec.end_nodes[1])?.position;
        Ok(Segment::new(a, b))
    }

    /// All nodes, in numbering order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edge rows, in input order.
    pub fn edges(&self) -> &[EdgeSpec] {
        &self.edges
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Resolve print parameters for every edge and validate the result.
    ///
    /// Fails on the first edge that has no exact mapping row or invalid
    /// geometry; no partially resolved list is returned.
    pub fn resolve_edges(&self, resolver: &ParameterResolver) -> Result<Vec<Edge>> {
        let mut edges = Vec::with_capacity(self.edges.len());
        for (row, spec) in self.edges.iter().enumerate() {
            let segment = self.segment(spec)?;
            let params = resolver.resolve(
                spec.material_index(),
                spec.print_speed_mmps,
                spec.print_pressure_psi,
            )?;
            let edge = Edge::new(EdgeId(row), spec, segment, params);
            edge.validate()?;
            debug!(
                "Edge {} resolved: spacing={}mm first={}mm layer={}mm",
                row, params.spacing, params.first_layer_height, params.layer_height
            );
            edges.push(edge);
        }
        Ok(edges)
    }
}
