//! Layer-interleaved deposition scheduling.
//!
//! Within a speed bucket no edge gets a second layer before every other
//! unfinished edge of the bucket has received its current one. Each edge
//! carries a small state machine:
//!
//! ```text
//! Pending(1) -> Pending(2) -> ... -> Pending(layers) -> Done
//! ```
//!
//! Buckets run strictly in order (fastest first); a bucket is finished
//! before the next one starts.

use super::{MaterialSwapController, MeanderPath};
use crate::config::PlannerConfig;
use crate::gcode::DepositionDevice;
use crate::network::{Edge, EdgeId};
use crate::ordering::{PrintJob, SpeedBucket};
use crate::{CoordF, Error, Result};
use log::{debug, info};

/// Layer progress of one edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeState {
    /// Next layer to deposit (1-based).
    Pending(u32),
    /// All layers deposited.
    Done,
}

impl EdgeState {
    /// State after depositing the current layer of an edge with `layers` layers.
    pub fn advance(self, layers: u32) -> Self {
        match self {
            EdgeState::Pending(k) if k < layers => EdgeState::Pending(k + 1),
            _ => EdgeState::Done,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, EdgeState::Done)
    }
}

/// Nozzle height of layer `k` (1-based) of an edge.
#[inline]
pub fn layer_height_at(edge: &Edge, k: u32) -> CoordF {
    edge.first_layer_height + edge.layer_height * (k.saturating_sub(1)) as CoordF
}

/// One deposited layer, in emission order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerRecord {
    pub edge: EdgeId,
    pub layer: u32,
    pub height: CoordF,
}

/// Totals for a completed schedule.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScheduleStats {
    /// Layers deposited across all edges.
    pub layers: u64,
    /// Total meander path length (mm).
    pub deposited_length_mm: CoordF,
}

/// Drives every edge of a [`PrintJob`] through its layers.
#[derive(Debug)]
pub struct LayerInterleaveScheduler<'a> {
    job: &'a PrintJob,
    config: &'a PlannerConfig,
    states: Vec<EdgeState>,
    log: Vec<LayerRecord>,
    stats: ScheduleStats,
}

impl<'a> LayerInterleaveScheduler<'a> {
    /// Prepare a schedule with every edge at layer 1.
    ///
    /// All edges are validated here so that nothing is emitted for a job
    /// that cannot be printed completely.
    pub fn new(job: &'a PrintJob, config: &'a PlannerConfig) -> Result<Self> {
        for edge in job.edges() {
            edge.validate()?;
        }
        Ok(Self {
            job,
            config,
            states: vec![EdgeState::Pending(1); job.edge_count()],
            log: Vec::new(),
            stats: ScheduleStats::default(),
        })
    }

    /// Current state of an edge.
    pub fn state(&self, id: EdgeId) -> EdgeState {
        self.states[id.0]
    }

    /// Layers emitted so far, in order.
    pub fn layer_log(&self) -> &[LayerRecord] {
        &self.log
    }

    /// Run all buckets, fastest first.
    ///
    /// `on_bucket` receives (bucket_index, bucket) before each bucket starts.
    pub fn run<D, F>(
        &mut self,
        swap: &mut MaterialSwapController<'_>,
        device: &mut D,
        mut on_bucket: F,
    ) -> Result<ScheduleStats>
    where
        D: DepositionDevice + ?Sized,
        F: FnMut(usize, &SpeedBucket),
    {
        let job = self.job;
        for (index, bucket) in job.buckets().iter().enumerate() {
            on_bucket(index, bucket);
            info!(
                "Bucket {}/{}: {} mm/s, {} edges",
                index + 1,
                job.buckets().len(),
                bucket.speed,
                bucket.len()
            );
            self.run_bucket(bucket, swap, device)?;
        }
        Ok(self.stats)
    }

    /// Interleave the layers of one bucket until all its edges are done.
    fn run_bucket<D: DepositionDevice + ?Sized>(
        &mut self,
        bucket: &SpeedBucket,
        swap: &mut MaterialSwapController<'_>,
        device: &mut D,
    ) -> Result<()> {
        let job = self.job;
        loop {
            let mut visited = false;
            for &id in &bucket.edges {
                let EdgeState::Pending(k) = self.states[id.0] else {
                    continue;
                };
                let edge = job.edge(id);
                self.deposit_layer(edge, k, swap, device)?;
                self.states[id.0] = self.states[id.0].advance(edge.layers);
                visited = true;
            }
            if !visited {
                return Ok(());
            }
        }
    }

    fn deposit_layer<D: DepositionDevice + ?Sized>(
        &mut self,
        edge: &Edge,
        k: u32,
        swap: &mut MaterialSwapController<'_>,
        device: &mut D,
    ) -> Result<()> {
        let mut path = MeanderPath::new(edge.segment, edge.spacing, edge.passes)?;
        let path_length = path.path_length();
        let start = path.next().ok_or_else(|| {
            Error::InvalidGeometry(format!("edge {}: empty meander", edge.id))
        })?;

        swap.swap(edge.material, device)?;
        let material = swap.active_config()?;
        let height = layer_height_at(edge, k);

        debug!(
            "Edge {} layer {}/{} at z={:.4} ({} passes)",
            edge.id, k, edge.layers, height, edge.passes
        );
        device.comment(&format!("edge {} layer {}/{}", edge.id, k, edge.layers));

        // start printing
        device.move_absolute(Some(start.x), Some(start.y), None);
        device.set_pressure(material.pressure_com, edge.pressure);
        device.dwell(material.dwell_time);
        device.move_absolute(None, None, Some(height));
        device.set_feed_rate(edge.speed);
        device.toggle_deposition(material.pressure_com);

        for point in path {
            device.move_absolute(Some(point.x), Some(point.y), None);
        }

        // stop printing
        device.toggle_deposition(material.pressure_com);
        device.set_feed_rate(self.config.travel_speed);
        device.move_absolute(None, None, Some(self.config.travel_height));
        if self.config.post_extrusion_dwell > 0.0 {
            device.dwell(self.config.post_extrusion_dwell);
        }

        self.log.push(LayerRecord {
            edge: edge.id,
            layer: k,
            height,
        });
        self.stats.layers += 1;
        self.stats.deposited_length_mm += path_length;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MaterialConfig, MaterialTable};
    use crate::gcode::{GCodeCommand, GCodeWriter};
    use crate::geometry::Segment;
    use crate::ordering::EdgeOrderer;
    use std::collections::HashMap;

    fn edge(id: usize, speed: f64, material: usize, layers: u32) -> Edge {
        Edge {
            id: EdgeId(id),
            end_nodes: [1, 2],
            segment: Segment::from_coords(0.0, id as f64, 10.0, id as f64),
            material,
            speed,
            pressure: 40.0,
            spacing: 0.5,
            first_layer_height: 0.2,
            layer_height: 0.15,
            passes: 2,
            layers,
        }
    }

    fn materials() -> MaterialTable {
        MaterialTable::new(vec![
            MaterialConfig::new("A", 1, 0.5),
            MaterialConfig::new("B", 2, 0.5).home(1.0, 1.0),
        ])
        .unwrap()
    }

    fn run(edges: Vec<Edge>) -> (Vec<LayerRecord>, GCodeWriter, usize) {
        let job = EdgeOrderer::new().order(edges).unwrap();
        let config = PlannerConfig::default();
        let table = materials();
        let mut writer = GCodeWriter::default();
        let mut swap = MaterialSwapController::new(&table, 0, config.travel_height).unwrap();
        swap.activate(&mut writer);
        let mut scheduler = LayerInterleaveScheduler::new(&job, &config).unwrap();
        scheduler.run(&mut swap, &mut writer, |_, _| {}).unwrap();
        for e in job.edges() {
            assert!(scheduler.state(e.id).is_done());
        }
        (scheduler.layer_log().to_vec(), writer, swap.swap_count())
    }

    #[test]
    fn test_state_transitions() {
        assert_eq!(EdgeState::Pending(1).advance(3), EdgeState::Pending(2));
        assert_eq!(EdgeState::Pending(3).advance(3), EdgeState::Done);
        assert_eq!(EdgeState::Done.advance(3), EdgeState::Done);
    }

    #[test]
    fn test_layer_heights() {
        let e = edge(0, 10.0, 0, 4);
        assert!((layer_height_at(&e, 1) - 0.2).abs() < 1e-12);
        assert!((layer_height_at(&e, 2) - 0.35).abs() < 1e-12);
        assert!((layer_height_at(&e, 4) - 0.65).abs() < 1e-12);
    }

    #[test]
    fn test_every_layer_visited_once() {
        let (log, _, _) = run(vec![
            edge(0, 10.0, 0, 3),
            edge(1, 10.0, 0, 1),
            edge(2, 5.0, 0, 2),
        ]);
        let mut visits: HashMap<EdgeId, Vec<u32>> = HashMap::new();
        for r in &log {
            visits.entry(r.edge).or_default().push(r.layer);
        }
        assert_eq!(visits[&EdgeId(0)], vec![1, 2, 3]);
        assert_eq!(visits[&EdgeId(1)], vec![1]);
        assert_eq!(visits[&EdgeId(2)], vec![1, 2]);
        assert_eq!(log.len(), 6);
    }

    #[test]
    fn test_same_speed_edges_interleave() {
        let (log, _, _) = run(vec![edge(0, 8.0, 0, 3), edge(1, 8.0, 0, 3)]);
        let order: Vec<(usize, u32)> = log.iter().map(|r| (r.edge.0, r.layer)).collect();
        assert_eq!(order, vec![(0, 1), (1, 1), (0, 2), (1, 2), (0, 3), (1, 3)]);

        // no edge ever runs more than one layer ahead of its bucket mates
        let mut done = [0u32; 2];
        for r in &log {
            done[r.edge.0] += 1;
            assert!(done[0].abs_diff(done[1]) <= 1);
        }
    }

    #[test]
    fn test_identical_edges_progress_independently() {
        let first = edge(0, 8.0, 0, 3);
        let mut twin = first.clone();
        twin.id = EdgeId(1);
        assert_eq!(first.segment, twin.segment);

        let (log, writer, _) = run(vec![first, twin]);
        let order: Vec<(usize, u32)> = log.iter().map(|r| (r.edge.0, r.layer)).collect();
        assert_eq!(order, vec![(0, 1), (1, 1), (0, 2), (1, 2), (0, 3), (1, 3)]);
        assert_eq!(log.len(), 2 * 3);

        let layers_on = writer
            .commands()
            .iter()
            .filter(|c| matches!(c, GCodeCommand::SetPressure { .. }))
            .count();
        assert_eq!(layers_on, 6);
    }

    #[test]
    fn test_bucket_callback_order() {
        let job = EdgeOrderer::new()
            .order(vec![edge(0, 5.0, 0, 1), edge(1, 10.0, 0, 1), edge(2, 7.0, 0, 1)])
            .unwrap();
        let config = PlannerConfig::default();
        let table = materials();
        let mut writer = GCodeWriter::default();
        let mut swap = MaterialSwapController::new(&table, 0, config.travel_height).unwrap();
        let mut scheduler = LayerInterleaveScheduler::new(&job, &config).unwrap();

        let mut seen = Vec::new();
        let stats = scheduler
            .run(&mut swap, &mut writer, |i, bucket| seen.push((i, bucket.speed)))
            .unwrap();
        assert_eq!(seen, vec![(0, 10.0), (1, 7.0), (2, 5.0)]);
        assert_eq!(stats.layers, 3);
        // 2 passes over 10mm, 0.5mm apart
        assert!((stats.deposited_length_mm - 3.0 * 20.5).abs() < 1e-9);
    }

    #[test]
    fn test_faster_bucket_finishes_first() {
        let (log, _, _) = run(vec![edge(0, 5.0, 0, 2), edge(1, 10.0, 0, 2)]);
        let order: Vec<usize> = log.iter().map(|r| r.edge.0).collect();
        assert_eq!(order, vec![1, 1, 0, 0]);
    }

    #[test]
    fn test_layer_heights_emitted() {
        let (log, _, _) = run(vec![edge(0, 10.0, 0, 3)]);
        let heights: Vec<f64> = log.iter().map(|r| r.height).collect();
        let expected = [0.2, 0.35, 0.5];
        for (h, e) in heights.iter().zip(expected) {
            assert!((h - e).abs() < 1e-9);
        }
    }

    #[test]
    fn test_deposition_sequence() {
        let (_, writer, _) = run(vec![edge(0, 10.0, 0, 1)]);
        let cmds = writer.commands();
        let set_press = cmds
            .iter()
            .position(|c| matches!(c, GCodeCommand::SetPressure { com: 1, .. }))
            .unwrap();
        assert!(matches!(cmds[set_press + 1], GCodeCommand::Dwell(_)));
        assert!(matches!(cmds[set_press + 2], GCodeCommand::LinearMove(_)));
        assert!(matches!(cmds[set_press + 3], GCodeCommand::Feed(f) if f == 10.0));
        assert!(matches!(cmds[set_press + 4], GCodeCommand::TogglePressure { com: 1 }));

        // 2 passes: 3 moves while depositing, then toggle off
        assert!(matches!(cmds[set_press + 8], GCodeCommand::TogglePressure { com: 1 }));
        assert!(matches!(cmds[set_press + 9], GCodeCommand::Feed(f) if f == 15.0));
        assert!(!writer.is_depositing());
    }

    #[test]
    fn test_swaps_only_on_material_change() {
        let (_, writer, swaps) = run(vec![
            edge(0, 10.0, 0, 2),
            edge(1, 10.0, 1, 2),
            edge(2, 5.0, 1, 1),
        ]);
        // 10 mm/s: 0,1,0,1 -> three swaps; 5 mm/s stays on material 1
        assert_eq!(swaps, 3);
        let resets = writer
            .commands()
            .iter()
            .filter(|c| matches!(c, GCodeCommand::SetPosition { .. }))
            .count();
        assert_eq!(resets, 3);
    }

    #[test]
    fn test_invalid_edge_rejected_before_emission() {
        let mut bad = edge(0, 10.0, 0, 1);
        bad.spacing = 0.0;
        let job = EdgeOrderer::new().order(vec![bad]).unwrap();
        let config = PlannerConfig::default();
        assert!(LayerInterleaveScheduler::new(&job, &config).is_err());
    }
}
