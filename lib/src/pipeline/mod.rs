//! Pipeline module - orchestrates a complete planning run.
//!
//! network → parameter lookup → speed buckets → interleaved layers → G-code
//!
//! Everything is planned into an in-memory writer. If any step fails the
//! writer is dropped and no output exists, so a file is only ever written
//! for a complete plan.
//!
//! # Example
//!
//! ```rust,ignore
//! use lce_gcode::{MaterialTable, NetworkGraph, NetworkPlanner, ParameterResolver, PlannerConfig};
//!
//! let planner = NetworkPlanner::new(
//!     PlannerConfig::default(),
//!     ParameterResolver::from_file("mappings.json")?,
//!     MaterialTable::from_file("material_data.json")?,
//! );
//! let output = planner.plan(&NetworkGraph::from_file("network.json")?)?;
//! output.gcode.write_to_file("network_bylayer.pgm")?;
//! ```

use crate::config::{MaterialTable, PlannerConfig};
use crate::gcode::{DepositionDevice, GCode, GCodeWriter};
use crate::network::{Edge, NetworkGraph};
use crate::ordering::{EdgeOrderer, PrintJob};
use crate::params::ParameterResolver;
use crate::toolpath::{LayerInterleaveScheduler, MaterialSwapController};
use crate::{CoordF, Result, VERSION};
use log::info;
use std::fmt;

/// Resolve and order the edges of a network: the annotated edge list, in
/// print order.
pub fn annotate_edges(graph: &NetworkGraph, resolver: &ParameterResolver) -> Result<Vec<Edge>> {
    let job = resolve_job(graph, resolver)?;
    Ok(ordered_edges(&job))
}

fn resolve_job(graph: &NetworkGraph, resolver: &ParameterResolver) -> Result<PrintJob> {
    graph.validate()?;
    let edges = graph.resolve_edges(resolver)?;
    EdgeOrderer::new().order(edges)
}

fn ordered_edges(job: &PrintJob) -> Vec<Edge> {
    job.buckets()
        .iter()
        .flat_map(|bucket| job.bucket_edges(bucket).cloned())
        .collect()
}

/// Totals of a planning run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlanSummary {
    /// Number of speed buckets.
    pub buckets: usize,
    /// Number of edges.
    pub edges: usize,
    /// Layers deposited across all edges.
    pub layers: u64,
    /// Material swaps performed.
    pub material_swaps: usize,
    /// Total meander path length (mm).
    pub deposited_length_mm: CoordF,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} edges in {} speed buckets, {} layers, {} material swaps, {:.1}mm deposited",
            self.edges, self.buckets, self.layers, self.material_swaps, self.deposited_length_mm
        )
    }
}

/// Result of a successful planning run.
#[derive(Debug)]
pub struct PlanOutput {
    /// Rendered program.
    pub gcode: GCode,
    /// Run totals.
    pub summary: PlanSummary,
    /// Ordered job the program was generated from.
    pub job: PrintJob,
}

/// Plans deposition programs for node/edge networks.
#[derive(Clone, Debug)]
pub struct NetworkPlanner {
    config: PlannerConfig,
    resolver: ParameterResolver,
    materials: MaterialTable,
}

impl NetworkPlanner {
    pub fn new(config: PlannerConfig, resolver: ParameterResolver, materials: MaterialTable) -> Self {
        Self {
            config,
            resolver,
            materials,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn resolver(&self) -> &ParameterResolver {
        &self.resolver
    }

    /// Resolve and order the edges of a network without emitting anything.
    pub fn prepare(&self, graph: &NetworkGraph) -> Result<PrintJob> {
        let job = resolve_job(graph, &self.resolver)?;
        for edge in job.edges() {
            self.materials.get(edge.material)?;
        }
        Ok(job)
    }

    /// Resolved edges in print order, for writing back an annotated network.
    pub fn annotate(&self, graph: &NetworkGraph) -> Result<Vec<Edge>> {
        Ok(ordered_edges(&self.prepare(graph)?))
    }

    /// Plan a complete G-code program.
    pub fn plan(&self, graph: &NetworkGraph) -> Result<PlanOutput> {
        self.plan_with_callback(graph, |_, _| {})
    }

    /// Plan with a progress callback.
    ///
    /// The callback receives (stage_name, progress_0_to_1).
    pub fn plan_with_callback<F>(&self, graph: &NetworkGraph, mut callback: F) -> Result<PlanOutput>
    where
        F: FnMut(&str, f64),
    {
        self.config.validate()?;
        self.materials.validate()?;

        callback("resolving", 0.0);
        let job = self.prepare(graph)?;
        callback("resolving", 1.0);

        info!(
            "Planning {} edges in {} speed buckets ({} layers)",
            job.edge_count(),
            job.buckets().len(),
            job.total_layers()
        );

        let mut writer =
            GCodeWriter::new(self.config.precision).with_mirror_z_axes(&self.config.mirror_z_axes);
        let mut swap = MaterialSwapController::new(
            &self.materials,
            self.config.initial_material,
            self.config.travel_height,
        )?;
        let mut scheduler = LayerInterleaveScheduler::new(&job, &self.config)?;

        self.write_preamble(&mut writer, &job);
        swap.activate(&mut writer);
        writer.set_feed_rate(self.config.travel_speed);
        writer.move_absolute(None, None, Some(self.config.travel_height));

        let bucket_count = job.buckets().len();
        let stats = scheduler.run(&mut swap, &mut writer, |i, _| {
            callback("depositing", i as f64 / bucket_count as f64);
        })?;
        callback("depositing", 1.0);

        writer.finalize();

        let summary = PlanSummary {
            buckets: bucket_count,
            edges: job.edge_count(),
            layers: stats.layers,
            material_swaps: swap.swap_count(),
            deposited_length_mm: stats.deposited_length_mm,
        };
        info!("Planned {}", summary);

        Ok(PlanOutput {
            gcode: writer.into_gcode(),
            summary,
            job,
        })
    }

    fn write_preamble(&self, writer: &mut GCodeWriter, job: &PrintJob) {
        writer.comment(&format!("Generated by lce-gcode {}", VERSION));
        writer.comment(&format!(
            "{} edges, {} speed buckets, {} materials",
            job.edge_count(),
            job.buckets().len(),
            self.materials.len()
        ));
        writer.comment(&format!(
            "Travel: {:.1}mm/s at z={:.1}mm",
            self.config.travel_speed, self.config.travel_height
        ));
        writer.comment("");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaterialConfig;
    use crate::params::{MappingRow, ParameterTable};
    use crate::{EdgeSpec, Error, PointF};

    fn row(speed: f64, pressure: f64) -> MappingRow {
        MappingRow {
            print_speed_mmps: speed,
            print_pressure_psi: pressure,
            first_layer_height_mm: 0.2,
            layer_height_mm: 0.1,
            spacing_mm: 0.4,
        }
    }

    fn planner() -> NetworkPlanner {
        let table = ParameterTable::new(vec![row(10.0, 40.0), row(5.0, 30.0)]);
        NetworkPlanner::new(
            PlannerConfig::default(),
            ParameterResolver::new(vec![table.clone(), table]),
            MaterialTable::new(vec![
                MaterialConfig::new("A", 1, 0.5),
                MaterialConfig::new("B", 2, 0.5).home(5.0, 2.0),
            ])
            .unwrap(),
        )
    }

    fn graph(edges: Vec<EdgeSpec>) -> NetworkGraph {
        NetworkGraph::new(
            vec![
                PointF::new(0.0, 0.0),
                PointF::new(10.0, 0.0),
                PointF::new(10.0, 10.0),
            ],
            edges,
        )
        .unwrap()
    }

    #[test]
    fn test_plan_summary() {
        let g = graph(vec![
            EdgeSpec::new([1, 2], 5.0, 30.0, 2, 2),
            EdgeSpec::new([2, 3], 10.0, 40.0, 3, 1).with_material(1),
        ]);
        let out = planner().plan(&g).unwrap();
        assert_eq!(out.summary.edges, 2);
        assert_eq!(out.summary.buckets, 2);
        assert_eq!(out.summary.layers, 3);
        assert_eq!(out.summary.material_swaps, 2);
        // 2 layers of (2 * 10 + 0.4) plus 1 layer of (3 * 10 + 0.8)
        assert!((out.summary.deposited_length_mm - 71.6).abs() < 1e-9);

        let text = out.gcode.content();
        assert!(text.starts_with("G90"));
        assert!(text.trim_end().ends_with("M2"));
    }

    #[test]
    fn test_missing_parameters_abort() {
        let g = graph(vec![EdgeSpec::new([1, 2], 7.0, 40.0, 2, 2)]);
        let err = planner().plan(&g).unwrap_err();
        assert!(matches!(err, Error::ParameterNotFound { material: 0, .. }));
    }

    #[test]
    fn test_unknown_material_aborts_before_emission() {
        let g = graph(vec![EdgeSpec::new([1, 2], 10.0, 40.0, 2, 2).with_material(4)]);
        assert!(planner().plan(&g).is_err());
    }

    #[test]
    fn test_annotate_orders_by_speed() {
        let g = graph(vec![
            EdgeSpec::new([1, 2], 5.0, 30.0, 2, 2),
            EdgeSpec::new([2, 3], 10.0, 40.0, 3, 1),
        ]);
        let edges = planner().annotate(&g).unwrap();
        assert_eq!(edges[0].speed, 10.0);
        assert_eq!(edges[1].speed, 5.0);
        assert!((edges[0].spacing - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_oversized_pass_count_rejected_before_planning() {
        let g = graph(vec![EdgeSpec::new([1, 2], 10.0, 40.0, 3_000_000_000, 1)]);
        let p = planner();
        assert!(matches!(p.prepare(&g), Err(Error::InvalidGeometry(_))));
        assert!(matches!(p.plan(&g), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_progress_callback() {
        let g = graph(vec![
            EdgeSpec::new([1, 2], 5.0, 30.0, 2, 1),
            EdgeSpec::new([2, 3], 10.0, 40.0, 2, 1),
        ]);
        let mut stages = Vec::new();
        planner()
            .plan_with_callback(&g, |stage, progress| stages.push((stage.to_string(), progress)))
            .unwrap();

        let depositing: Vec<f64> = stages
            .iter()
            .filter(|(s, _)| s == "depositing")
            .map(|(_, p)| *p)
            .collect();
        assert_eq!(depositing, vec![0.0, 0.5, 1.0]);
        assert_eq!(stages[0], ("resolving".to_string(), 0.0));
    }

    #[test]
    fn test_summary_display() {
        let summary = PlanSummary {
            buckets: 2,
            edges: 3,
            layers: 7,
            material_swaps: 1,
            deposited_length_mm: 12.34,
        };
        let s = summary.to_string();
        assert!(s.contains("3 edges"));
        assert!(s.contains("7 layers"));
        assert!(s.contains("12.3mm"));
    }
}
