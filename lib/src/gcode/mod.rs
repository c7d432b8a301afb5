//! G-code generation module.
//!
//! The planner talks to the printer through the [`DepositionDevice`] trait.
//! [`GCodeWriter`] is the concrete device: it records Aerotech-style commands
//! (the dialect of the pressure-driven DIW controller), tracks the logical
//! position and axis bindings, and renders everything into a [`GCode`] buffer
//! once planning has finished.

mod generator;
mod writer;

pub use generator::{GCode, GCodeStats};
pub use writer::GCodeWriter;

use crate::CoordF;
use std::fmt;

/// Logical vertical axis name.
pub const LOGICAL_Z: &str = "Z";

/// Position of the tool in the current logical frame (mm).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    pub x: CoordF,
    pub y: CoordF,
    pub z: CoordF,
}

impl Position {
    /// Create a new position.
    pub const fn new(x: CoordF, y: CoordF, z: CoordF) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// Command sink for one physical printer.
///
/// Commands are consumed strictly in call order; the order of calls is the
/// physical print order. Waiting is expressed with [`dwell`](Self::dwell),
/// never by blocking the caller.
pub trait DepositionDevice {
    /// Move to absolute logical coordinates; `None` axes stay put.
    fn move_absolute(&mut self, x: Option<CoordF>, y: Option<CoordF>, z: Option<CoordF>);

    /// Set the feed rate for following moves (mm/s).
    fn set_feed_rate(&mut self, mmps: CoordF);

    /// Set the pressure of a pressure box channel (psi).
    fn set_pressure(&mut self, channel: u32, psi: CoordF);

    /// Toggle deposition on a pressure box channel.
    fn toggle_deposition(&mut self, channel: u32);

    /// Wait for the given time (s).
    fn dwell(&mut self, seconds: CoordF);

    /// Bind a logical axis to a physical axis.
    fn rebind_axis(&mut self, logical: &str, physical: &str);

    /// Redefine the current position as `(x, y)`, shifting the working origin.
    fn set_home_offset(&mut self, x: Option<CoordF>, y: Option<CoordF>);

    /// Current logical position.
    fn current_position(&self) -> Position;

    /// Emit an annotation; devices without comments may ignore it.
    fn comment(&mut self, _text: &str) {}

    /// End the program.
    fn finalize(&mut self);
}

/// A value for one named axis in a linear move.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisValue {
    pub axis: String,
    pub value: CoordF,
}

impl AxisValue {
    /// Create a new axis value.
    pub fn new(axis: impl Into<String>, value: CoordF) -> Self {
        Self {
            axis: axis.into(),
            value,
        }
    }
}

/// G-code command types.
#[derive(Clone, Debug, PartialEq)]
pub enum GCodeCommand {
    /// G1 - Linear move on physical axes
    LinearMove(Vec<AxisValue>),
    /// G1 F - Set feed rate
    Feed(CoordF),
    /// G4 - Dwell (seconds)
    Dwell(CoordF),
    /// G90 - Absolute positioning
    AbsolutePositioning,
    /// G92 - Set position
    SetPosition { x: Option<CoordF>, y: Option<CoordF> },
    /// Set pressure box channel pressure
    SetPressure { com: u32, psi: CoordF },
    /// Toggle pressure box channel
    TogglePressure { com: u32 },
    /// M2 - Program end
    ProgramEnd,
    /// Comment
    Comment(String),
}

impl GCodeCommand {
    /// Convert the command to a G-code string with `precision` decimals.
    pub fn to_gcode(&self, precision: usize) -> String {
        match self {
            GCodeCommand::LinearMove(axes) => {
                let mut cmd = String::from("G1");
                for av in axes {
                    cmd.push_str(&format!(" {}{:.*}", av.axis, precision, av.value));
                }
                cmd
            }
            GCodeCommand::Feed(f) => format!("G1 F{:.*}", precision, f),
            GCodeCommand::Dwell(s) => format!("G4 P{:.*}", precision, s),
            GCodeCommand::AbsolutePositioning => "G90".to_string(),
            GCodeCommand::SetPosition { x, y } => {
                let mut cmd = String::from("G92");
                if let Some(v) = x {
                    cmd.push_str(&format!(" X{:.*}", precision, v));
                }
                if let Some(v) = y {
                    cmd.push_str(&format!(" Y{:.*}", precision, v));
                }
                cmd
            }
            GCodeCommand::SetPressure { com, psi } => {
                format!("Call setPress P{} Q{:.*}", com, precision, psi)
            }
            GCodeCommand::TogglePressure { com } => format!("Call togglePress P{}", com),
            GCodeCommand::ProgramEnd => "M2".to_string(),
            GCodeCommand::Comment(text) => format!("; {}", text),
        }
    }
}
