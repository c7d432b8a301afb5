//! Edge rows and resolved edges.

use crate::geometry::Segment;
use crate::params::ResolvedParams;
use crate::toolpath::MeanderPath;
use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an edge: its row position in the input network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub usize);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An edge row as it appears in the input network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    /// The two end node numbers (1-based).
    #[serde(alias = "EndNodes")]
    pub end_nodes: [usize; 2],
    /// Material selector; absent for single-material networks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stimulus: Option<usize>,
    /// Target print speed (mm/s).
    pub print_speed_mmps: CoordF,
    /// Target print pressure (psi).
    pub print_pressure_psi: CoordF,
    /// Number of side-by-side passes that make up the line width.
    pub numpaths_xy: u32,
    /// Number of stacked layers.
    pub numlayers_z: u32,
}

impl EdgeSpec {
    /// Create a single-material edge row.
    pub fn new(
        end_nodes: [usize; 2],
        print_speed_mmps: CoordF,
        print_pressure_psi: CoordF,
        numpaths_xy: u32,
        numlayers_z: u32,
    ) -> Self {
        Self {
            end_nodes,
            stimulus: None,
            print_speed_mmps,
            print_pressure_psi,
            numpaths_xy,
            numlayers_z,
        }
    }

    /// Builder method: set the material selector.
    pub fn with_material(mut self, material: usize) -> Self {
        self.stimulus = Some(material);
        self
    }

    /// Builder method: set the end nodes.
    pub fn with_end_nodes(mut self, end_nodes: [usize; 2]) -> Self {
        self.end_nodes = end_nodes;
        self
    }

    /// Material index, 0 when the row carries no selector.
    #[inline]
    pub fn material_index(&self) -> usize {
        self.stimulus.unwrap_or(0)
    }
}

/// A fully parameterised edge, ready for scheduling.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Edge {
    /// Row position in the input network.
    pub id: EdgeId,
    /// End node numbers (1-based).
    pub end_nodes: [usize; 2],
    /// Node positions of the two ends.
    #[serde(skip)]
    pub segment: Segment,
    /// Material index (0 for single-material prints).
    #[serde(rename = "stimulus")]
    pub material: usize,
    /// Print speed (mm/s).
    #[serde(rename = "print_speed_mmps")]
    pub speed: CoordF,
    /// Print pressure (psi).
    #[serde(rename = "print_pressure_psi")]
    pub pressure: CoordF,
    /// Distance between adjacent passes (mm).
    #[serde(rename = "xy_spacing_mm")]
    pub spacing: CoordF,
    /// Height of the first layer (mm).
    #[serde(rename = "firstlayerheight_mm")]
    pub first_layer_height: CoordF,
    /// Height increment per additional layer (mm).
    #[serde(rename = "z_layerheight_mm")]
    pub layer_height: CoordF,
    /// Number of passes per layer.
    #[serde(rename = "numpaths_xy")]
    pub passes: u32,
    /// Number of layers.
    #[serde(rename = "numlayers_z")]
    pub layers: u32,
}

impl Edge {
    /// Combine an input row with its resolved parameters.
    pub fn new(id: EdgeId, spec: &EdgeSpec, segment: Segment, params: ResolvedParams) -> Self {
        Self {
            id,
            end_nodes: spec.end_nodes,
            segment,
            material: spec.material_index(),
            speed: spec.print_speed_mmps,
            pressure: spec.print_pressure_psi,
            spacing: params.spacing,
            first_layer_height: params.first_layer_height,
            layer_height: params.layer_height,
            passes: spec.numpaths_xy,
            layers: spec.numlayers_z,
        }
    }

    /// Check that every value needed for emission is strictly positive and
    /// that the edge has a usable direction.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("print speed", self.speed),
            ("print pressure", self.pressure),
            ("xy spacing", self.spacing),
            ("first layer height", self.first_layer_height),
            ("layer height", self.layer_height),
        ];
        for (name, value) in checks {
            if !(value > 0.0) || !value.is_finite() {
                return Err(Error::InvalidGeometry(format!(
                    "edge {} has {} {}; it must be greater than 0",
                    self.id, name, value
                )));
            }
        }
        if self.passes == 0 {
            return Err(Error::InvalidGeometry(format!(
                "edge {} has no xy passes",
                self.id
            )));
        }
        if self.passes > MeanderPath::MAX_PASSES {
            return Err(Error::InvalidGeometry(format!(
                "edge {} has {} xy passes; at most {} are supported",
                self.id,
                self.passes,
                MeanderPath::MAX_PASSES
            )));
        }
        if self.layers == 0 {
            return Err(Error::InvalidGeometry(format!(
                "edge {} has no z layers",
                self.id
            )));
        }
        self.segment.unit_direction().map_err(|e| match e {
            Error::InvalidGeometry(msg) => {
                Error::InvalidGeometry(format!("edge {}: {}", self.id, msg))
            }
            other => other,
        })?;
        Ok(())
    }
}
