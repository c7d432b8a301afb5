//! # LCE G-code
//!
//! Toolpath planner for direct-ink-writing of liquid-crystal-elastomer
//! networks.
//!
//! This library turns a node/edge network into an ordered motion and
//! actuation command stream:
//! - Print parameter lookup from per-material speed/pressure tables
//! - Speed-bucketed edge ordering (fastest first)
//! - Layer interleaving across edges of the same speed
//! - Wide-line meander path generation
//! - Multi-head material swaps with home offset translation
//! - Aerotech-style G-code emission
//!
//! ## Example
//!
//! ```rust,ignore
//! use lce_gcode::{NetworkGraph, NetworkPlanner, ParameterResolver, MaterialTable, PlannerConfig};
//!
//! let graph = NetworkGraph::from_file("network.json")?;
//! let resolver = ParameterResolver::from_file("mappings.json")?;
//! let materials = MaterialTable::from_file("material_data.json")?;
//! let planner = NetworkPlanner::new(PlannerConfig::default(), resolver, materials);
//! let output = planner.plan(&graph)?;
//! output.gcode.write_to_file("network_bylayer.pgm")?;
//! ```

pub mod config;
pub mod gcode;
pub mod geometry;
pub mod network;
pub mod ordering;
pub mod params;
pub mod pipeline;
pub mod toolpath;

pub use config::{MaterialConfig, MaterialTable, PlannerConfig};
pub use gcode::{DepositionDevice, GCode, GCodeCommand, GCodeStats, GCodeWriter};
pub use geometry::{PointF, Segment};
pub use network::{Edge, EdgeId, EdgeSpec, NetworkGraph, Node};
pub use ordering::{EdgeOrderer, PrintJob, SpeedBucket};
pub use params::{MappingRow, ParameterResolver, ParameterTable, ResolvedParams};
pub use pipeline::{annotate_edges, NetworkPlanner, PlanOutput, PlanSummary};
pub use toolpath::{
    layer_height_at, EdgeState, LayerInterleaveScheduler, LayerRecord, MaterialState,
    MaterialSwapController, MeanderPath, ScheduleStats,
};

/// Floating-point coordinate type (millimeters).
pub type CoordF = f64;

/// Result type used throughout the planner.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for planning operations.
///
/// Every variant aborts the planning run for the current input; physical
/// print parameters are never substituted with defaults.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "No print parameters for speed {speed} mm/s and pressure {pressure} psi \
         with material index {material}. Check the speed/pressure mapping table."
    )]
    ParameterNotFound {
        material: usize,
        speed: CoordF,
        pressure: CoordF,
    },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_not_found_message() {
        let err = Error::ParameterNotFound {
            material: 1,
            speed: 7.5,
            pressure: 42.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("7.5"));
        assert!(msg.contains("42"));
        assert!(msg.contains("material index 1"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
