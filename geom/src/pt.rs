use std::fmt;

use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::{trim_f64, Angle, Distance, EPSILON_DIST};

/// A point in world space, measured in meters. y points up.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pt2D {
    x: f64,
    y: f64,
}

impl Pt2D {
    /// Panics on NaN or infinite input; parsers must validate coordinates before building points.
    pub fn new(x: f64, y: f64) -> Pt2D {
        if !x.is_finite() || !y.is_finite() {
            panic!("Bad Pt2D {}, {}", x, y);
        }

        Pt2D {
            x: trim_f64(x),
            y: trim_f64(y),
        }
    }

    pub fn zero() -> Pt2D {
        Pt2D::new(0.0, 0.0)
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }

    /// Equality within some threshold
    pub fn approx_eq(self, other: Pt2D, threshold: Distance) -> bool {
        self.dist_to(other) <= threshold
    }

    pub fn dist_to(self, to: Pt2D) -> Distance {
        Distance::meters(self.raw_dist_to(to))
    }

    pub(crate) fn raw_dist_to(self, to: Pt2D) -> f64 {
        ((self.x() - to.x()).powi(2) + (self.y() - to.y()).powi(2)).sqrt()
    }

    /// Counter-clockwise from east
    pub fn angle_to(self, to: Pt2D) -> Angle {
        Angle::new((to.y() - self.y()).atan2(to.x() - self.x()))
    }

    pub fn project_away(self, dist: Distance, theta: Angle) -> Pt2D {
        let (sin, cos) = theta.normalized_radians().sin_cos();
        Pt2D::new(
            self.x() + dist.inner_meters() * cos,
            self.y() + dist.inner_meters() * sin,
        )
    }

    pub fn offset(self, dx: f64, dy: f64) -> Pt2D {
        Pt2D::new(self.x() + dx, self.y() + dy)
    }

    /// Linear interpolation towards another point. `pct` isn't clamped.
    pub fn lerp(self, other: Pt2D, pct: f64) -> Pt2D {
        Pt2D::new(
            self.x() + (other.x() - self.x()) * pct,
            self.y() + (other.y() - self.y()) * pct,
        )
    }

    /// The average of all points. Returns the origin for an empty slice.
    pub fn center(pts: &[Pt2D]) -> Pt2D {
        if pts.is_empty() {
            return Pt2D::zero();
        }
        let mut x = 0.0;
        let mut y = 0.0;
        for pt in pts {
            x += pt.x();
            y += pt.y();
        }
        let len = pts.len() as f64;
        Pt2D::new(x / len, y / len)
    }

    pub fn to_hashable(self) -> HashablePt2D {
        HashablePt2D {
            x_nan: NotNan::new(self.x()).unwrap(),
            y_nan: NotNan::new(self.y()).unwrap(),
        }
    }

    /// Drops consecutive points closer than `EPSILON_DIST`, keeping the first of each run.
    pub fn dedupe_adjacent(pts: Vec<Pt2D>) -> Vec<Pt2D> {
        let mut result: Vec<Pt2D> = Vec::with_capacity(pts.len());
        for pt in pts {
            if result
                .last()
                .map(|last| last.approx_eq(pt, EPSILON_DIST))
                .unwrap_or(false)
            {
                continue;
            }
            result.push(pt);
        }
        result
    }
}

impl fmt::Display for Pt2D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pt2D({0}, {1})", self.x(), self.y())
    }
}

impl From<Pt2D> for geo::Coord {
    fn from(pt: Pt2D) -> Self {
        geo::Coord {
            x: pt.x(),
            y: pt.y(),
        }
    }
}

impl From<Pt2D> for geo::Point {
    fn from(pt: Pt2D) -> Self {
        geo::Point::new(pt.x(), pt.y())
    }
}

impl From<geo::Coord> for Pt2D {
    fn from(coord: geo::Coord) -> Self {
        Pt2D::new(coord.x, coord.y)
    }
}

/// This isn't opinionated about what the (x, y) represents, and doesn't trim precision.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct HashablePt2D {
    x_nan: NotNan<f64>,
    y_nan: NotNan<f64>,
}

impl From<Pt2D> for HashablePt2D {
    fn from(pt: Pt2D) -> Self {
        pt.to_hashable()
    }
}
