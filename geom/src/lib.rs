//! Planar geometry for road networks. Coordinates are meters in a right-handed frame with y
//! pointing up (north), the way SUMO stores network shapes.

#[macro_use]
extern crate anyhow;

pub use crate::angle::Angle;
pub use crate::bounds::Bounds;
pub use crate::circle::Circle;
pub use crate::distance::Distance;
pub use crate::duration::Duration;
pub use crate::line::{line_intersection, Line};
pub use crate::polygon::Polygon;
pub use crate::polyline::{PolyLine, MITER_LIMIT};
pub use crate::pt::{HashablePt2D, Pt2D};
pub use crate::ring::Ring;
pub use crate::speed::Speed;
pub use crate::tessellation::{Tessellation, Triangle};
pub use crate::time::Time;

mod angle;
mod bounds;
mod circle;
mod distance;
mod duration;
mod line;
mod polygon;
mod polyline;
mod pt;
mod ring;
mod speed;
mod tessellation;
mod time;

/// Two points closer than this are treated as the same point.
pub const EPSILON_DIST: Distance = Distance::const_meters(0.0001);

/// Reduce the precision of an f64. This helps ensure serialization is idempotent (everything is
/// exactly the same before and after saving/loading). Ideally we'd use some kind of proper
/// fixed-precision type instead of f64.
pub fn trim_f64(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
