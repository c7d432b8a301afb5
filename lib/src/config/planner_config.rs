//! Planner configuration.
//!
//! Printer-wide constants for travel moves and output formatting. Everything
//! that varies per edge (speed, pressure, heights, spacing) comes from the
//! network and the mapping tables instead.

use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Global planner settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    // === Travel ===
    /// Travel move speed (mm/s), used whenever the head is not depositing.
    pub travel_speed: CoordF,
    /// Height above the substrate for travel and parking (mm).
    pub travel_height: CoordF,

    // === Deposition ===
    /// Dwell after deposition stops (s), 0 = none.
    pub post_extrusion_dwell: CoordF,
    /// Material head active at program start.
    pub initial_material: usize,
    /// Additional vertical axes that follow every Z move
    /// (e.g. a camera or curing stage sharing the gantry).
    pub mirror_z_axes: Vec<String>,

    // === Output ===
    /// Decimal places for coordinates in emitted G-code.
    pub precision: usize,
}

impl PlannerConfig {
    /// Create a new PlannerConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a planner configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a planner configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method: set travel speed.
    pub fn travel_speed(mut self, speed: CoordF) -> Self {
        self.travel_speed = speed;
        self
    }

    /// Builder method: set travel height.
    pub fn travel_height(mut self, height: CoordF) -> Self {
        self.travel_height = height;
        self
    }

    /// Builder method: set post-extrusion dwell.
    pub fn post_extrusion_dwell(mut self, seconds: CoordF) -> Self {
        self.post_extrusion_dwell = seconds;
        self
    }

    /// Builder method: set the starting material head.
    pub fn initial_material(mut self, material: usize) -> Self {
        self.initial_material = material;
        self
    }

    /// Builder method: set the mirrored Z axes.
    pub fn mirror_z_axes<I, S>(mut self, axes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mirror_z_axes = axes.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method: set output precision.
    pub fn precision(mut self, digits: usize) -> Self {
        self.precision = digits;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.travel_speed > 0.0) {
            return Err(Error::Configuration(
                "travel speed must be positive".into(),
            ));
        }
        if !(self.travel_height > 0.0) {
            return Err(Error::Configuration(
                "travel height must be positive".into(),
            ));
        }
        if !(self.post_extrusion_dwell >= 0.0) {
            return Err(Error::Configuration(
                "post-extrusion dwell cannot be negative".into(),
            ));
        }
        if self.mirror_z_axes.iter().any(|a| a.trim().is_empty()) {
            return Err(Error::Configuration(
                "mirrored axis names cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            travel_speed: 15.0,
            travel_height: 10.0,
            post_extrusion_dwell: 0.0,
            initial_material: 0,
            mirror_z_axes: vec!["C".to_string()],
            precision: 6,
        }
    }
}

impl fmt::Display for PlannerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlannerConfig(travel={:.1}mm/s @ {:.1}mm, start material={})",
            self.travel_speed, self.travel_height, self.initial_material
        )
    }
}
