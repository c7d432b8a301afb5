//! Print parameter lookup.
//!
//! Each material has a calibration table mapping an exact (speed, pressure)
//! pair to the deposited line geometry: first layer height, layer height and
//! pass spacing. Lookups never interpolate or fall back to a nearest row; a
//! pair that was not calibrated cannot be printed.

use crate::{CoordF, Error, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One calibrated row of a speed/pressure mapping table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MappingRow {
    pub print_speed_mmps: CoordF,
    pub print_pressure_psi: CoordF,
    #[serde(rename = "firstlayerheight_mm")]
    pub first_layer_height_mm: CoordF,
    #[serde(rename = "z_layerheight_mm")]
    pub layer_height_mm: CoordF,
    #[serde(rename = "xy_spacing_mm")]
    pub spacing_mm: CoordF,
}

impl MappingRow {
    #[inline]
    fn matches(&self, speed: CoordF, pressure: CoordF) -> bool {
        self.print_speed_mmps == speed && self.print_pressure_psi == pressure
    }

    /// Parameters carried by this row.
    pub fn params(&self) -> ResolvedParams {
        ResolvedParams {
            first_layer_height: self.first_layer_height_mm,
            layer_height: self.layer_height_mm,
            spacing: self.spacing_mm,
        }
    }
}

/// Line geometry resolved for an edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedParams {
    /// Height of the first layer (mm).
    pub first_layer_height: CoordF,
    /// Height increment per layer after the first (mm).
    pub layer_height: CoordF,
    /// Lateral distance between passes (mm).
    pub spacing: CoordF,
}

/// Mapping table of a single material.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterTable {
    rows: Vec<MappingRow>,
}

impl ParameterTable {
    /// Create a table from rows.
    pub fn new(rows: Vec<MappingRow>) -> Self {
        let table = Self { rows };
        table.warn_duplicates();
        table
    }

    /// Load a table from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a table from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let rows: Vec<MappingRow> = serde_json::from_str(json)?;
        Ok(Self::new(rows))
    }

    /// First row matching (speed, pressure) exactly.
    pub fn lookup(&self, speed: CoordF, pressure: CoordF) -> Option<&MappingRow> {
        self.rows.iter().find(|row| row.matches(speed, pressure))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Indices of rows that can never match because an earlier row has the
    /// same (speed, pressure).
    pub fn shadowed_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(i, row)| {
                self.rows[..*i]
                    .iter()
                    .any(|prev| prev.matches(row.print_speed_mmps, row.print_pressure_psi))
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn warn_duplicates(&self) {
        for i in self.shadowed_rows() {
            let row = &self.rows[i];
            warn!(
                "Mapping row {} ({} mm/s, {} psi) is shadowed by an earlier row",
                i, row.print_speed_mmps, row.print_pressure_psi
            );
        }
    }
}

/// Resolves print parameters from per-material tables.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterResolver {
    tables: Vec<ParameterTable>,
}

impl ParameterResolver {
    /// Create a resolver from tables ordered by material index.
    pub fn new(tables: Vec<ParameterTable>) -> Self {
        Self { tables }
    }

    /// Load one table file per material, in material order.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let tables = paths
            .iter()
            .map(ParameterTable::from_file)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(tables))
    }

    /// Load all tables from a single JSON file (array of tables).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse all tables from a JSON string (array of tables).
    pub fn from_json(json: &str) -> Result<Self> {
        let tables: Vec<Vec<MappingRow>> = serde_json::from_str(json)?;
        Ok(Self::new(
            tables.into_iter().map(ParameterTable::new).collect(),
        ))
    }

    /// Number of materials with a table.
    pub fn material_count(&self) -> usize {
        self.tables.len()
    }

    /// Table for a material.
    pub fn table(&self, material: usize) -> Result<&ParameterTable> {
        self.tables.get(material).ok_or_else(|| {
            Error::Configuration(format!(
                "no speed/pressure mapping table for material index {} ({} loaded)",
                material,
                self.tables.len()
            ))
        })
    }

    /// Resolve (first layer height, layer height, spacing) for an exact
    /// (speed, pressure) pair.
    pub fn resolve(
        &self,
        material: usize,
        speed: CoordF,
        pressure: CoordF,
    ) -> Result<ResolvedParams> {
        self.table(material)?
            .lookup(speed, pressure)
            .map(MappingRow::params)
            .ok_or(Error::ParameterNotFound {
                material,
                speed,
                pressure,
            })
    }
}
