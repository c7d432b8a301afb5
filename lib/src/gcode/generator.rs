//! Rendered G-code output.

use crate::Result;
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// A complete, rendered G-code program.
///
/// Produced only after planning succeeded, so a program on disk is never a
/// truncated toolpath.
#[derive(Clone, Default)]
pub struct GCode {
    /// The G-code content as a string.
    content: String,

    /// Statistics about the generated G-code.
    pub stats: GCodeStats,
}

impl GCode {
    /// Create a new empty GCode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the G-code content as a string.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Get the length of the G-code content in bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Check if the G-code is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Append a line to the G-code.
    pub fn append_line(&mut self, line: &str) {
        self.content.push_str(line);
        self.content.push('\n');
    }

    /// Write the G-code to a file.
    ///
    /// The program is written to a temporary file next to `path` and renamed
    /// into place, so `path` holds either the old content or the whole new
    /// program.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            writer.write_all(self.content.as_bytes())?;
            writer.flush()?;
        }
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Get the number of lines in the G-code.
    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }

    /// Iterate over the lines of the G-code.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.lines()
    }
}

impl fmt::Debug for GCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GCode({} bytes, {} lines)",
            self.len(),
            self.line_count()
        )
    }
}

impl fmt::Display for GCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.content)
    }
}

/// Statistics about generated G-code.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GCodeStats {
    /// Total estimated run time including dwells (seconds).
    pub print_time_seconds: f64,

    /// Distance moved while depositing (mm).
    pub deposition_distance_mm: f64,

    /// Distance moved while not depositing, including Z moves (mm).
    pub travel_distance_mm: f64,

    /// Total dwell time (seconds).
    pub dwell_seconds: f64,

    /// Number of deposition starts.
    pub deposition_count: usize,

    /// Number of G-code lines.
    pub line_count: usize,
}

impl GCodeStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get print time formatted as HH:MM:SS.
    pub fn print_time_formatted(&self) -> String {
        let total_seconds = self.print_time_seconds as u64;
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

impl fmt::Display for GCodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GCodeStats(time={}, deposited={:.1}mm, travel={:.1}mm, lines={})",
            self.print_time_formatted(),
            self.deposition_distance_mm,
            self.travel_distance_mm,
            self.line_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcode_new() {
        let gcode = GCode::new();
        assert!(gcode.is_empty());
        assert_eq!(gcode.len(), 0);
    }

    #[test]
    fn test_gcode_append_line() {
        let mut gcode = GCode::new();
        gcode.append_line("G90");
        gcode.append_line("G1 X10 Y10");

        assert_eq!(gcode.line_count(), 2);
        let lines: Vec<&str> = gcode.lines().collect();
        assert_eq!(lines, vec!["G90", "G1 X10 Y10"]);
    }

    #[test]
    fn test_gcode_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pgm");

        let mut gcode = GCode::new();
        gcode.append_line("M2");
        gcode.write_to_file(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "M2\n");
    }

    #[test]
    fn test_gcode_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pgm");
        std::fs::write(&path, "old program that is longer\n").unwrap();

        let mut gcode = GCode::new();
        gcode.append_line("G90");
        gcode.write_to_file(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "G90\n");
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_gcode_failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("taken.pgm");
        std::fs::create_dir(&target).unwrap();

        let mut gcode = GCode::new();
        gcode.append_line("M2");
        assert!(gcode.write_to_file(&target).is_err());

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("taken.pgm")]);
        assert!(target.is_dir());
    }

    #[test]
    fn test_gcode_stats_print_time_formatted() {
        let mut stats = GCodeStats::new();
        stats.print_time_seconds = 3661.0;

        assert_eq!(stats.print_time_formatted(), "01:01:01");
    }
}
