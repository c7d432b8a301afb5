//! Straight segment between two node positions.

use super::PointF;
use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};

/// A segment defined by two endpoints (mm).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub a: PointF,
    pub b: PointF,
}

impl Segment {
    /// Create a new segment from two points.
    #[inline]
    pub const fn new(a: PointF, b: PointF) -> Self {
        Self { a, b }
    }

    /// Create a segment from coordinates.
    #[inline]
    pub const fn from_coords(ax: CoordF, ay: CoordF, bx: CoordF, by: CoordF) -> Self {
        Self {
            a: PointF::new(ax, ay),
            b: PointF::new(bx, by),
        }
    }

    /// Direction vector (b - a).
    #[inline]
    pub fn direction(&self) -> PointF {
        self.b - self.a
    }

    /// Length of the segment.
    #[inline]
    pub fn length(&self) -> CoordF {
        self.a.distance(&self.b)
    }


    /// Unit direction vector.
    ///
    /// Fails for coincident or non-finite endpoints instead of producing NaN.
    pub fn unit_direction(&self) -> Result<PointF> {
        if !self.a.is_finite() || !self.b.is_finite() {
            return Err(Error::InvalidGeometry(format!(
                "segment {} -> {} has non-finite coordinates",
                self.a, self.b
            )));
        }
        let len = self.length();
        if len <= 0.0 {
            return Err(Error::InvalidGeometry(format!(
                "zero-length segment at {}",
                self.a
            )));
        }
        let dir = self.direction();
        Ok(PointF::new(dir.x / len, dir.y / len))
    }

    /// Unit normal (unit direction rotated 90 degrees CCW).
    pub fn unit_normal(&self) -> Result<PointF> {
        Ok(self.unit_direction()?.perp())
    }
}
