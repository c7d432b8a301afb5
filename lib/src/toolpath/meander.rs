//! Wide-line meander generation.
//!
//! A wide line is printed as `n` parallel passes `s` apart, connected at
//! alternating ends:
//!
//! ```text
//!   start ──────────────▶ ┐
//!                         │ s
//!         ┌ ◀──────────── ┘
//!       s │
//!         └ ──────────────▶ end
//! ```
//!
//! The passes are centred on the nominal segment, so the outermost pass
//! centres lie `s * (n - 1) / 2` either side of it. Older generators
//! started at `s * n / 2`, which shifts every pass by `s / 2` to one side;
//! programs from the two do not match point for point.

use crate::geometry::{PointF, Segment};
use crate::{CoordF, Error, Result};
use std::iter::FusedIterator;

/// Lazy sequence of meander waypoints.
///
/// Yields the start point, then for each pass its far end and, between
/// passes, the lateral step: `2n` points (`2n - 1` moves) for `n` passes.
#[derive(Clone, Debug)]
pub struct MeanderPath {
    unit: PointF,
    perp: PointF,
    length: CoordF,
    spacing: CoordF,
    next: PointF,
    direction: CoordF,
    emitted: u32,
    total: u32,
}

impl MeanderPath {
    /// Largest supported pass count; the waypoint count `2n` must fit a `u32`.
    pub const MAX_PASSES: u32 = u32::MAX / 2;

    /// Plan a meander over `segment` with `passes` passes `spacing` apart.
    pub fn new(segment: Segment, spacing: CoordF, passes: u32) -> Result<Self> {
        if !(spacing > 0.0) || !spacing.is_finite() {
            return Err(Error::InvalidGeometry(format!(
                "meander spacing must be greater than 0, got {}",
                spacing
            )));
        }
        if passes == 0 {
            return Err(Error::InvalidGeometry(
                "meander needs at least one pass".into(),
            ));
        }
        if passes > Self::MAX_PASSES {
            return Err(Error::InvalidGeometry(format!(
                "meander pass count {} exceeds {}",
                passes,
                Self::MAX_PASSES
            )));
        }
        let unit = segment.unit_direction()?;
        let perp = unit.perp();
        let half_width = spacing * (passes - 1) as CoordF / 2.0;

        Ok(Self {
            unit,
            perp,
            length: segment.length(),
            spacing,
            next: segment.a + perp * half_width,
            direction: 1.0,
            emitted: 0,
            total: passes * 2,
        })
    }

    /// Number of passes.
    pub fn passes(&self) -> u32 {
        self.total / 2
    }

    /// Total deposited path length (mm).
    pub fn path_length(&self) -> CoordF {
        let passes = self.passes() as CoordF;
        self.length * passes + self.spacing * (passes - 1.0)
    }
}

impl Iterator for MeanderPath {
    type Item = PointF;

    fn next(&mut self) -> Option<PointF> {
        if self.emitted >= self.total {
            return None;
        }
        let point = self.next;
        if self.emitted % 2 == 0 {
            // along the line
            self.next = point + self.unit * (self.length * self.direction);
        } else {
            // step over to the next pass
            self.next = point - self.perp * self.spacing;
            self.direction = -self.direction;
        }
        self.emitted += 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total - self.emitted) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MeanderPath {}

impl FusedIterator for MeanderPath {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::signed_offset;

    fn meander(seg: Segment, spacing: f64, passes: u32) -> Vec<PointF> {
        MeanderPath::new(seg, spacing, passes).unwrap().collect()
    }

    #[test]
    fn test_three_pass_example() {
        let pts = meander(Segment::from_coords(0.0, 0.0, 10.0, 0.0), 1.0, 3);
        let expected = [
            (0.0, 1.0),
            (10.0, 1.0),
            (10.0, 0.0),
            (0.0, 0.0),
            (0.0, -1.0),
            (10.0, -1.0),
        ];
        assert_eq!(pts.len(), expected.len());
        for (p, (x, y)) in pts.iter().zip(expected) {
            assert!(p.approx_eq(&PointF::new(x, y), 1e-9), "{:?} != ({}, {})", p, x, y);
        }
    }

    #[test]
    fn test_single_pass_is_the_segment() {
        let seg = Segment::from_coords(1.0, 2.0, 4.0, 6.0);
        let pts = meander(seg, 0.4, 1);
        assert_eq!(pts.len(), 2);
        assert!(pts[0].approx_eq(&seg.a, 1e-9));
        assert!(pts[1].approx_eq(&seg.b, 1e-9));
    }

    #[test]
    fn test_waypoint_count() {
        let seg = Segment::from_coords(0.0, 0.0, 3.0, 4.0);
        for n in 1..=7 {
            let path = MeanderPath::new(seg, 0.3, n).unwrap();
            assert_eq!(path.len(), 2 * n as usize);
            assert_eq!(path.count(), 2 * n as usize);
        }
    }

    #[test]
    fn test_offsets_are_centred_half_spacing_multiples() {
        let seg = Segment::from_coords(-2.0, 1.0, 5.0, -3.0);
        let spacing = 0.6;
        for n in 1..=6u32 {
            let pts = meander(seg, spacing, n);
            let offsets: Vec<f64> = pts.iter().map(|p| signed_offset(&seg, *p)).collect();
            let max = offsets.iter().cloned().fold(f64::MIN, f64::max);
            let min = offsets.iter().cloned().fold(f64::MAX, f64::min);
            assert!((max + min).abs() < 1e-9, "not centred for n={}", n);
            assert!((max - spacing * (n - 1) as f64 / 2.0).abs() < 1e-9);
            for off in offsets {
                let halves = off / (spacing / 2.0);
                assert!((halves - halves.round()).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_odd_pass_symmetry_about_bisector() {
        let seg = Segment::from_coords(0.0, 0.0, 8.0, 0.0);
        let pts = meander(seg, 0.5, 5);
        for p in &pts {
            let mirrored = PointF::new(8.0 - p.x, p.y);
            assert!(pts.iter().any(|q| q.approx_eq(&mirrored, 1e-9)));
        }
        assert!(pts.last().unwrap().x > 7.9);
    }

    #[test]
    fn test_passes_alternate_direction() {
        let seg = Segment::from_coords(0.0, 0.0, 0.0, 5.0);
        let pts = meander(seg, 1.0, 4);
        for pass in 0..4 {
            let a = pts[2 * pass];
            let b = pts[2 * pass + 1];
            let forward = b.y > a.y;
            assert_eq!(forward, pass % 2 == 0);
        }
    }

    #[test]
    fn test_path_length() {
        let path = MeanderPath::new(Segment::from_coords(0.0, 0.0, 10.0, 0.0), 1.0, 3).unwrap();
        assert!((path.path_length() - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_input_fails_fast() {
        let point = Segment::from_coords(1.0, 1.0, 1.0, 1.0);
        assert!(matches!(
            MeanderPath::new(point, 1.0, 2),
            Err(Error::InvalidGeometry(_))
        ));

        let seg = Segment::from_coords(0.0, 0.0, 1.0, 0.0);
        assert!(MeanderPath::new(seg, 0.0, 2).is_err());
        assert!(MeanderPath::new(seg, -1.0, 2).is_err());
        assert!(MeanderPath::new(seg, f64::NAN, 2).is_err());
        assert!(MeanderPath::new(seg, 1.0, 0).is_err());
    }

    #[test]
    fn test_huge_pass_count_rejected() {
        let seg = Segment::from_coords(0.0, 0.0, 1.0, 0.0);
        assert!(matches!(
            MeanderPath::new(seg, 0.1, MeanderPath::MAX_PASSES + 1),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(MeanderPath::new(seg, 0.1, u32::MAX).is_err());

        let path = MeanderPath::new(seg, 0.1, MeanderPath::MAX_PASSES).unwrap();
        assert_eq!(path.passes(), MeanderPath::MAX_PASSES);
        assert_eq!(path.len(), 2 * MeanderPath::MAX_PASSES as usize);
    }

    #[test]
    fn test_iterator_is_fused() {
        let mut path = MeanderPath::new(Segment::from_coords(0.0, 0.0, 1.0, 0.0), 1.0, 1).unwrap();
        assert!(path.next().is_some());
        assert!(path.next().is_some());
        assert!(path.next().is_none());
        assert!(path.next().is_none());
    }
}
