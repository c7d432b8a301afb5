//! Geometry primitives for toolpath planning.
//!
//! - [`PointF`] - 2D point / vector in millimeters
//! - [`Segment`] - straight segment between two node positions
//!
//! Planning works directly in floating-point millimeters: node positions come
//! from measured or designed coordinates and are emitted to the controller
//! unchanged.

mod point;
mod segment;

pub use point::PointF;
pub use segment::Segment;

use crate::CoordF;

/// Check if a value is approximately equal to another within epsilon.
#[inline]
pub fn approx_eq(a: CoordF, b: CoordF, epsilon: CoordF) -> bool {
    (a - b).abs() < epsilon
}

/// Signed distance of `p` from the infinite line through `seg`.
///
/// Positive on the side the segment's unit normal points to.
pub fn signed_offset(seg: &Segment, p: PointF) -> CoordF {
    let dir = seg.direction();
    let len = dir.length();
    if len == 0.0 {
        return p.distance(&seg.a);
    }
    dir.cross(&(p - seg.a)) / len
}
