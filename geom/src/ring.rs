use std::collections::HashSet;
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{Bounds, Distance, Line, PolyLine, Polygon, Pt2D, EPSILON_DIST};

/// Like a PolyLine, but closed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    // first equals last
    pts: Vec<Pt2D>,
}

impl Ring {
    pub fn new(pts: Vec<Pt2D>) -> Result<Ring> {
        if pts.len() < 4 {
            bail!("Can't make a ring with < 4 points");
        }
        if pts[0] != *pts.last().unwrap() {
            bail!("Can't make a ring with mismatching first/last points");
        }

        if pts
            .windows(2)
            .any(|pair| pair[0].approx_eq(pair[1], EPSILON_DIST))
        {
            bail!("Ring has ~dupe adjacent pts");
        }

        let result = Ring { pts };

        let mut seen_pts = HashSet::new();
        for pt in result.pts.iter().skip(1) {
            seen_pts.insert(pt.to_hashable());
        }
        if seen_pts.len() != result.pts.len() - 1 {
            bail!("Ring has repeat non-adjacent points");
        }

        Ok(result)
    }

    /// Squishes adjacent duplicate points and closes the ring if needed.
    pub fn deduping_new(pts: Vec<Pt2D>) -> Result<Ring> {
        let mut pts = Pt2D::dedupe_adjacent(pts);
        if pts.len() >= 2 {
            let first = pts[0];
            let last = pts.len() - 1;
            if pts[last].approx_eq(first, EPSILON_DIST) {
                pts[last] = first;
            } else {
                pts.push(first);
            }
        }
        Ring::new(pts)
    }

    pub fn points(&self) -> &Vec<Pt2D> {
        &self.pts
    }

    pub fn into_points(self) -> Vec<Pt2D> {
        self.pts
    }

    pub fn lines(&self) -> impl Iterator<Item = Line> + '_ {
        self.pts
            .windows(2)
            .map(|pair| Line::unchecked_new(pair[0], pair[1]))
    }

    /// Positive when the points go counter-clockwise.
    pub fn signed_area(&self) -> f64 {
        let mut sum = 0.0;
        for pair in self.pts.windows(2) {
            sum += pair[0].x() * pair[1].y() - pair[1].x() * pair[0].y();
        }
        sum / 2.0
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    pub fn reversed(mut self) -> Ring {
        self.pts.reverse();
        self
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds::from(&self.pts)
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Ring {
        Ring {
            pts: self.pts.iter().map(|pt| pt.offset(dx, dy)).collect(),
        }
    }

    pub fn into_polygon(self) -> Result<Polygon> {
        Polygon::with_holes(self, Vec::new())
    }

    /// Traces the ring with a stroke of some width.
    pub fn to_outline(&self, thickness: Distance) -> Result<Polygon> {
        // The start/end corner isn't mitered, but a thin stroke hides that.
        PolyLine::new(self.pts.clone())?.make_polygons(thickness)
    }

    pub fn to_geo(&self) -> geo::LineString {
        geo::LineString::new(self.pts.iter().map(|pt| geo::Coord::from(*pt)).collect())
    }

    pub fn from_geo(ls: &geo::LineString) -> Result<Ring> {
        Ring::deduping_new(ls.coords().map(|c| Pt2D::new(c.x, c.y)).collect())
    }
}

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Ring::new(vec![")?;
        for pt in &self.pts {
            writeln!(f, "  Pt2D::new({}, {}),", pt.x(), pt.y())?;
        }
        write!(f, "])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closes_and_orients() {
        let ring = Ring::deduping_new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(0.0, 10.0),
            Pt2D::new(10.0, 10.0),
            Pt2D::new(10.0, 0.0),
        ])
        .unwrap();
        assert_eq!(ring.points().len(), 5);
        assert!(!ring.is_ccw());
        assert_eq!(ring.signed_area(), -100.0);
        assert!(ring.reversed().is_ccw());
    }

    #[test]
    fn rejects_degenerate() {
        assert!(Ring::deduping_new(vec![Pt2D::new(0.0, 0.0), Pt2D::new(1.0, 0.0)]).is_err());
        assert!(Ring::new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(1.0, 0.0),
            Pt2D::new(1.0, 1.0),
            Pt2D::new(1.0, 0.0),
            Pt2D::new(0.0, 0.0),
        ])
        .is_err());
    }
}
