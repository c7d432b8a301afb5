//! Per-material head configuration.
//!
//! Each material is deposited by its own head. A head moves on its own
//! vertical axis, is pressurised through its own controller channel and was
//! homed at its own physical position, expressed in the shared logical frame.

use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Static configuration of one material head.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialConfig {
    /// Physical axis driving this head's vertical stage (e.g. "A").
    pub axis_name: String,
    /// Pressure box channel.
    #[serde(rename = "pressure_COM", alias = "pressure_com")]
    pub pressure_com: u32,
    /// Dwell after a pressure change before the head moves (s).
    pub dwell_time: CoordF,
    /// Home position X in the shared logical frame (mm).
    pub x_home_position: CoordF,
    /// Home position Y in the shared logical frame (mm).
    pub y_home_position: CoordF,
}

impl MaterialConfig {
    /// Create a material config with its home at the logical origin.
    pub fn new(axis_name: impl Into<String>, pressure_com: u32, dwell_time: CoordF) -> Self {
        Self {
            axis_name: axis_name.into(),
            pressure_com,
            dwell_time,
            x_home_position: 0.0,
            y_home_position: 0.0,
        }
    }

    /// Builder method: set the home position.
    pub fn home(mut self, x: CoordF, y: CoordF) -> Self {
        self.x_home_position = x;
        self.y_home_position = y;
        self
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.axis_name.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "material {} has an empty axis name",
                index
            )));
        }
        if !(self.dwell_time >= 0.0) {
            return Err(Error::Configuration(format!(
                "material {} has a negative or invalid dwell time",
                index
            )));
        }
        if !self.x_home_position.is_finite() || !self.y_home_position.is_finite() {
            return Err(Error::Configuration(format!(
                "material {} has a non-finite home position",
                index
            )));
        }
        Ok(())
    }
}

/// Material head configurations indexed by material index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialTable {
    materials: Vec<MaterialConfig>,
}

impl MaterialTable {
    /// Build a table from configs ordered by material index.
    pub fn new(materials: Vec<MaterialConfig>) -> Result<Self> {
        let table = Self { materials };
        table.validate()?;
        Ok(table)
    }

    /// Load a material table from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a material table from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Validate every entry.
    pub fn validate(&self) -> Result<()> {
        if self.materials.is_empty() {
            return Err(Error::Configuration(
                "material table contains no materials".into(),
            ));
        }
        for (index, material) in self.materials.iter().enumerate() {
            material.validate(index)?;
        }
        Ok(())
    }

    /// Look up a material, failing if it has no configuration entry.
    pub fn get(&self, index: usize) -> Result<&MaterialConfig> {
        self.materials.get(index).ok_or_else(|| {
            Error::Configuration(format!(
                "material index {} has no configuration entry ({} configured)",
                index,
                self.materials.len()
            ))
        })
    }

    /// Number of configured materials.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
