//! Toolpath planning.
//!
//! - [`MeanderPath`] fills the width of one edge with serpentine passes
//! - [`MaterialSwapController`] switches heads and translates the working frame
//! - [`LayerInterleaveScheduler`] deposits every edge layer by layer,
//!   interleaving edges of the same speed

mod material_swap;
mod meander;
mod scheduler;

pub use material_swap::{MaterialState, MaterialSwapController};
pub use meander::MeanderPath;
pub use scheduler::{
    layer_height_at, EdgeState, LayerInterleaveScheduler, LayerRecord, ScheduleStats,
};
