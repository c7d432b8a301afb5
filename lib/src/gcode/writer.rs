//! Aerotech-style G-code writer.

use super::{AxisValue, DepositionDevice, GCode, GCodeCommand, GCodeStats, Position, LOGICAL_Z};
use crate::CoordF;
use std::collections::{BTreeSet, HashMap};

/// Records commands for a multi-head pressure-driven printer.
///
/// The logical Z axis is written under whichever physical axis it is
/// currently bound to; mirrored axes receive the same Z value on every move.
/// Nothing is rendered until [`into_gcode`](Self::into_gcode), so a failed
/// plan can simply drop the writer.
#[derive(Debug, Clone)]
pub struct GCodeWriter {
    commands: Vec<GCodeCommand>,
    precision: usize,
    axis_map: HashMap<String, String>,
    mirror_z_axes: Vec<String>,
    position: Position,
    feed_rate: Option<CoordF>,
    active_channels: BTreeSet<u32>,
    stats: GCodeStats,
    finalized: bool,
}

impl GCodeWriter {
    /// Create a writer in absolute positioning mode.
    pub fn new(precision: usize) -> Self {
        Self {
            commands: vec![GCodeCommand::AbsolutePositioning],
            precision,
            axis_map: HashMap::new(),
            mirror_z_axes: Vec::new(),
            position: Position::default(),
            feed_rate: None,
            active_channels: BTreeSet::new(),
            stats: GCodeStats::default(),
            finalized: false,
        }
    }

    /// Builder: axes that follow every Z move.
    pub fn with_mirror_z_axes(mut self, axes: &[String]) -> Self {
        self.mirror_z_axes = axes.to_vec();
        self
    }

    /// Physical axis a logical axis is currently written as.
    pub fn bound_axis<'a>(&'a self, logical: &'a str) -> &'a str {
        self.axis_map
            .get(logical)
            .map(String::as_str)
            .unwrap_or(logical)
    }

    /// Commands recorded so far.
    pub fn commands(&self) -> &[GCodeCommand] {
        &self.commands
    }

    /// Check if any pressure channel is currently depositing.
    pub fn is_depositing(&self) -> bool {
        !self.active_channels.is_empty()
    }

    /// Render all recorded commands.
    pub fn into_gcode(self) -> GCode {
        let mut gcode = GCode::new();
        for cmd in &self.commands {
            gcode.append_line(&cmd.to_gcode(self.precision));
        }
        gcode.stats = self.stats;
        gcode.stats.line_count = self.commands.len();
        gcode
    }

    fn account_move(&mut self, target: Position) {
        let dx = target.x - self.position.x;
        let dy = target.y - self.position.y;
        let dz = target.z - self.position.z;
        let distance = (dx * dx + dy * dy + dz * dz).sqrt();

        if self.is_depositing() {
            self.stats.deposition_distance_mm += distance;
        } else {
            self.stats.travel_distance_mm += distance;
        }
        if let Some(feed) = self.feed_rate.filter(|f| *f > 0.0) {
            self.stats.print_time_seconds += distance / feed;
        }
    }
}

impl Default for GCodeWriter {
    fn default() -> Self {
        Self::new(6)
    }
}

impl DepositionDevice for GCodeWriter {
    fn move_absolute(&mut self, x: Option<CoordF>, y: Option<CoordF>, z: Option<CoordF>) {
        let mut axes = Vec::with_capacity(3 + self.mirror_z_axes.len());
        let mut target = self.position;
        if let Some(v) = x {
            axes.push(AxisValue::new(self.bound_axis("X"), v));
            target.x = v;
        }
        if let Some(v) = y {
            axes.push(AxisValue::new(self.bound_axis("Y"), v));
            target.y = v;
        }
        if let Some(v) = z {
            axes.push(AxisValue::new(self.bound_axis(LOGICAL_Z), v));
            for axis in &self.mirror_z_axes {
                axes.push(AxisValue::new(axis.clone(), v));
            }
            target.z = v;
        }
        if axes.is_empty() {
            return;
        }
        self.account_move(target);
        self.position = target;
        self.commands.push(GCodeCommand::LinearMove(axes));
    }

    fn set_feed_rate(&mut self, mmps: CoordF) {
        self.feed_rate = Some(mmps);
        self.commands.push(GCodeCommand::Feed(mmps));
    }

    fn set_pressure(&mut self, channel: u32, psi: CoordF) {
        self.commands
            .push(GCodeCommand::SetPressure { com: channel, psi });
    }

    fn toggle_deposition(&mut self, channel: u32) {
        if !self.active_channels.remove(&channel) {
            self.active_channels.insert(channel);
            self.stats.deposition_count += 1;
        }
        self.commands
            .push(GCodeCommand::TogglePressure { com: channel });
    }

    fn dwell(&mut self, seconds: CoordF) {
        self.stats.dwell_seconds += seconds;
        self.stats.print_time_seconds += seconds;
        self.commands.push(GCodeCommand::Dwell(seconds));
    }

    fn rebind_axis(&mut self, logical: &str, physical: &str) {
        self.axis_map
            .insert(logical.to_string(), physical.to_string());
    }

    fn set_home_offset(&mut self, x: Option<CoordF>, y: Option<CoordF>) {
        if let Some(v) = x {
            self.position.x = v;
        }
        if let Some(v) = y {
            self.position.y = v;
        }
        self.commands.push(GCodeCommand::SetPosition { x, y });
    }

    fn current_position(&self) -> Position {
        self.position
    }

    fn comment(&mut self, text: &str) {
        self.commands.push(GCodeCommand::Comment(text.to_string()));
    }

    fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        if self.is_depositing() {
            let channels: Vec<u32> = self.active_channels.iter().copied().collect();
            for channel in channels {
                self.toggle_deposition(channel);
            }
        }
        self.commands.push(GCodeCommand::ProgramEnd);
        self.finalized = true;
    }
}
