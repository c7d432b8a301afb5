//! Configuration module.
//!
//! Planner settings shared by every material head, and the static per-material
//! head configuration (axis, pressure channel, dwell, home position).

mod material;
mod planner_config;

pub use material::{MaterialConfig, MaterialTable};
pub use planner_config::PlannerConfig;
