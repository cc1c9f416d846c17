use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{Angle, Distance, PolyLine, Pt2D, EPSILON_DIST};

/// A line segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line(Pt2D, Pt2D);

impl Line {
    /// Creates a line segment between two points, which must not be the same.
    pub fn new(pt1: Pt2D, pt2: Pt2D) -> Result<Line> {
        if pt1.dist_to(pt2) <= EPSILON_DIST {
            bail!("Line from {} to {} too small", pt1, pt2);
        }
        Ok(Line(pt1, pt2))
    }

    /// Callers must already know the points are distinct.
    pub(crate) fn unchecked_new(pt1: Pt2D, pt2: Pt2D) -> Line {
        Line(pt1, pt2)
    }

    pub fn pt1(&self) -> Pt2D {
        self.0
    }

    pub fn pt2(&self) -> Pt2D {
        self.1
    }

    pub fn points(&self) -> Vec<Pt2D> {
        vec![self.0, self.1]
    }

    pub fn to_polyline(&self) -> PolyLine {
        PolyLine::unchecked_new(self.points())
    }

    pub fn length(&self) -> Distance {
        self.pt1().dist_to(self.pt2())
    }

    pub fn reversed(&self) -> Line {
        Line(self.pt2(), self.pt1())
    }

    pub fn angle(&self) -> Angle {
        self.pt1().angle_to(self.pt2())
    }

    /// Shifts the segment sideways. Positive widths go to the right of the direction of travel,
    /// negative to the left.
    pub fn shift_either_direction(&self, width: Distance) -> Line {
        let len = self.pt1().raw_dist_to(self.pt2());
        let w = width.inner_meters();
        // The right-hand normal in a y-up frame is (dy, -dx).
        let nx = (self.pt2().y() - self.pt1().y()) / len * w;
        let ny = -(self.pt2().x() - self.pt1().x()) / len * w;
        Line(self.pt1().offset(nx, ny), self.pt2().offset(nx, ny))
    }

    pub fn shift_right(&self, width: Distance) -> Line {
        self.shift_either_direction(width)
    }

    pub fn shift_left(&self, width: Distance) -> Line {
        self.shift_either_direction(-width)
    }

    /// Returns the point where two segments cross, if they do.
    pub fn intersection(&self, other: &Line) -> Option<Pt2D> {
        if is_counter_clockwise(self.pt1(), other.pt1(), other.pt2())
            == is_counter_clockwise(self.pt2(), other.pt1(), other.pt2())
            || is_counter_clockwise(self.pt1(), self.pt2(), other.pt1())
                == is_counter_clockwise(self.pt1(), self.pt2(), other.pt2())
        {
            return None;
        }
        line_intersection(self, other)
    }

    pub fn unbounded_percent_along(&self, percent: f64) -> Pt2D {
        self.pt1().lerp(self.pt2(), percent)
    }

    /// Returns a point some distance along the segment, or None if the distance is negative or
    /// beyond the end.
    pub fn dist_along(&self, dist: Distance) -> Option<Pt2D> {
        let len = self.length();
        if dist < Distance::ZERO || dist > len + EPSILON_DIST {
            return None;
        }
        Some(self.unbounded_dist_along(dist))
    }

    pub fn unbounded_dist_along(&self, dist: Distance) -> Pt2D {
        self.unbounded_percent_along(dist / self.length())
    }

    /// The signed cross product of the segment's direction and the vector to the point. Positive
    /// means the point is to the left.
    pub fn side_of(&self, pt: Pt2D) -> f64 {
        (self.pt2().x() - self.pt1().x()) * (pt.y() - self.pt1().y())
            - (self.pt2().y() - self.pt1().y()) * (pt.x() - self.pt1().x())
    }
}

/// Where the infinite lines through two segments cross. None if they're parallel.
pub fn line_intersection(l1: &Line, l2: &Line) -> Option<Pt2D> {
    let x1 = l1.pt1().x();
    let y1 = l1.pt1().y();
    let x2 = l1.pt2().x();
    let y2 = l1.pt2().y();

    let x3 = l2.pt1().x();
    let y3 = l2.pt1().y();
    let x4 = l2.pt2().x();
    let y4 = l2.pt2().y();

    let denom = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
    // Relative to the segment lengths, so nearly parallel segments count as parallel.
    let scale = l1.length().inner_meters() * l2.length().inner_meters();
    if denom.abs() <= 1e-9 * scale {
        return None;
    }

    let numer_a = x1 * y2 - y1 * x2;
    let numer_b = x3 * y4 - y3 * x4;
    let x = (numer_a * (x3 - x4) - (x1 - x2) * numer_b) / denom;
    let y = (numer_a * (y3 - y4) - (y1 - y2) * numer_b) / denom;
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    Some(Pt2D::new(x, y))
}

fn is_counter_clockwise(pt1: Pt2D, pt2: Pt2D, pt3: Pt2D) -> bool {
    (pt3.y() - pt1.y()) * (pt2.x() - pt1.x()) > (pt2.y() - pt1.y()) * (pt3.x() - pt1.x())
}
