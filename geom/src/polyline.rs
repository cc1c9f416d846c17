use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{line_intersection, Angle, Bounds, Distance, Line, Polygon, Pt2D, Ring, EPSILON_DIST};

/// When shifting a polyline, a corner is joined with a miter unless the miter point lands farther
/// than this multiple of the shift width from the original corner. Past that, the outer side of
/// the corner is beveled.
pub const MITER_LIMIT: f64 = 4.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolyLine {
    pts: Vec<Pt2D>,
    length: Distance,
}

impl PolyLine {
    /// Needs at least two points, and no two adjacent points may be the same.
    pub fn new(pts: Vec<Pt2D>) -> Result<PolyLine> {
        if pts.len() < 2 {
            bail!("Need at least two points for a PolyLine, got {}", pts.len());
        }
        if pts
            .windows(2)
            .any(|pair| pair[0].approx_eq(pair[1], EPSILON_DIST))
        {
            bail!("PolyLine has ~dupe adjacent pts: {:?}", pts);
        }

        Ok(PolyLine::unchecked_new(pts))
    }

    /// Removes adjacent duplicate points first. SUMO shapes sometimes repeat a point.
    pub fn deduping_new(pts: Vec<Pt2D>) -> Result<PolyLine> {
        PolyLine::new(Pt2D::dedupe_adjacent(pts))
    }

    pub(crate) fn unchecked_new(pts: Vec<Pt2D>) -> PolyLine {
        let length = pts
            .windows(2)
            .map(|pair| pair[0].dist_to(pair[1]))
            .sum();
        PolyLine { pts, length }
    }

    pub fn points(&self) -> &Vec<Pt2D> {
        &self.pts
    }

    pub fn into_points(self) -> Vec<Pt2D> {
        self.pts
    }

    pub fn length(&self) -> Distance {
        self.length
    }

    pub fn lines(&self) -> impl Iterator<Item = Line> + '_ {
        self.pts
            .windows(2)
            .map(|pair| Line::unchecked_new(pair[0], pair[1]))
    }

    pub fn first_pt(&self) -> Pt2D {
        self.pts[0]
    }

    pub fn last_pt(&self) -> Pt2D {
        self.pts[self.pts.len() - 1]
    }

    pub fn first_line(&self) -> Line {
        Line::unchecked_new(self.pts[0], self.pts[1])
    }

    pub fn last_line(&self) -> Line {
        Line::unchecked_new(self.pts[self.pts.len() - 2], self.pts[self.pts.len() - 1])
    }

    pub fn reversed(&self) -> PolyLine {
        let mut pts = self.pts.clone();
        pts.reverse();
        PolyLine {
            pts,
            length: self.length,
        }
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds::from(&self.pts)
    }

    pub fn translate(&self, dx: f64, dy: f64) -> PolyLine {
        PolyLine::unchecked_new(self.pts.iter().map(|pt| pt.offset(dx, dy)).collect())
    }

    /// Returns the point and direction some distance along the line.
    pub fn dist_along(&self, dist_along: Distance) -> Result<(Pt2D, Angle)> {
        if dist_along < Distance::ZERO {
            bail!("dist_along {} is negative", dist_along);
        }
        if dist_along > self.length + EPSILON_DIST {
            bail!(
                "dist_along {} is longer than the polyline's length {}",
                dist_along,
                self.length
            );
        }

        let mut dist_left = dist_along;
        let num_lines = self.pts.len() - 1;
        for (idx, l) in self.lines().enumerate() {
            let length = l.length();
            if dist_left <= length || idx == num_lines - 1 {
                let pct = (dist_left / length).min(1.0);
                return Ok((l.unbounded_percent_along(pct), l.angle()));
            }
            dist_left -= length;
        }
        unreachable!()
    }

    pub fn middle(&self) -> Pt2D {
        // Can't fail; half the length is always in range
        match self.dist_along(self.length / 2.0) {
            Ok((pt, _)) => pt,
            Err(_) => self.first_pt(),
        }
    }

    /// Returns the piece of the line between two distances. Both must be in range and the slice
    /// must be longer than `EPSILON_DIST`.
    pub fn exact_slice(&self, start: Distance, end: Distance) -> Result<PolyLine> {
        if start < Distance::ZERO || end <= start {
            bail!("Can't get a polyline slice [{}, {}]", start, end);
        }
        if end > self.length + EPSILON_DIST {
            bail!(
                "Slice [{}, {}] has an end too big for polyline of length {}",
                start,
                end,
                self.length
            );
        }

        let mut result: Vec<Pt2D> = Vec::new();
        let mut dist_so_far = Distance::ZERO;

        for line in self.lines() {
            let length = line.length();

            // Does this line contain the first point of the slice?
            if result.is_empty() && dist_so_far + length >= start {
                result.push(line.unbounded_dist_along(start - dist_so_far));
            }

            // Does this line contain the last point of the slice?
            if dist_so_far + length >= end {
                result.push(line.unbounded_dist_along(end - dist_so_far));
                return PolyLine::deduping_new(result);
            }

            // If we're in the middle, just collect the endpoint.
            if !result.is_empty() {
                result.push(line.pt2());
            }

            dist_so_far += length;
        }

        // Only reachable when end is within EPSILON_DIST past the last point.
        result.push(self.last_pt());
        PolyLine::deduping_new(result)
    }

    pub fn shift_right(&self, width: Distance) -> Result<PolyLine> {
        self.shift_with_sharp_angles(width)
    }

    pub fn shift_left(&self, width: Distance) -> Result<PolyLine> {
        self.shift_with_sharp_angles(-width)
    }

    /// Positive width shifts to the right, negative to the left. Corners use a miter join, unless
    /// the miter would stick out past `MITER_LIMIT` times the width, in which case the outside of
    /// the corner gets a bevel. The result has at least as many points as the input.
    pub fn shift_either_direction(&self, width: Distance) -> Result<PolyLine> {
        self.shift_with_sharp_angles(width)
    }

    fn shift_with_sharp_angles(&self, width: Distance) -> Result<PolyLine> {
        if width == Distance::ZERO {
            return Ok(self.clone());
        }
        if self.pts.len() == 2 {
            let l = self.first_line().shift_either_direction(width);
            return PolyLine::new(l.points());
        }

        let miter_limit = MITER_LIMIT * width.abs();
        let mut result: Vec<Pt2D> = Vec::new();
        let lines: Vec<Line> = self.lines().collect();
        for (idx, pair) in lines.windows(2).enumerate() {
            let l1 = pair[0].shift_either_direction(width);
            let l2 = pair[1].shift_either_direction(width);
            let corner = pair[0].pt2();

            if idx == 0 {
                result.push(l1.pt1());
            }

            match line_intersection(&l1, &l2) {
                None => {
                    // Collinear. If the line doubles back on itself, keep both ends.
                    result.push(l1.pt2());
                    if !l1.pt2().approx_eq(l2.pt1(), EPSILON_DIST) {
                        result.push(l2.pt1());
                    }
                }
                Some(hit) => {
                    // Turning left puts the right side on the outside of the corner.
                    let turns_left = pair[0].side_of(pair[1].pt2()) > 0.0;
                    let outside = turns_left == (width > Distance::ZERO);
                    if outside && hit.dist_to(corner) > miter_limit {
                        result.push(l1.pt2());
                        result.push(l2.pt1());
                    } else {
                        result.push(hit);
                    }
                }
            }

            if idx == lines.len() - 2 {
                result.push(l2.pt2());
            }
        }

        PolyLine::deduping_new(result)
    }

    /// Thickens the line into a polygon with the given total width, centered on the line. The
    /// exterior ring is counter-clockwise. Fails for non-positive widths, or when the shifted
    /// sides collapse.
    pub fn make_polygons(&self, width: Distance) -> Result<Polygon> {
        if width <= EPSILON_DIST {
            bail!("Can't make a polygon of width {}", width);
        }
        let half = width / 2.0;
        let mut pts = self.shift_right(half)?.into_points();
        let mut left = self.shift_left(half)?.into_points();
        left.reverse();
        pts.extend(left);
        pts.push(pts[0]);
        Ring::deduping_new(pts)?.into_polygon()
    }

    /// Dashes of `dash_len`, separated by `dash_separation`, starting at the beginning of the line.
    /// A final dash that would run past the end is dropped.
    pub fn dashed_lines(
        &self,
        width: Distance,
        dash_len: Distance,
        dash_separation: Distance,
    ) -> Vec<Polygon> {
        let mut polygons = Vec::new();
        if dash_len <= EPSILON_DIST || dash_separation < Distance::ZERO {
            return polygons;
        }

        let total_length = self.length();
        let mut start = Distance::ZERO;
        while start + dash_len <= total_length {
            if let Ok(poly) = self
                .exact_slice(start, start + dash_len)
                .and_then(|slice| slice.make_polygons(width))
            {
                polygons.push(poly);
            }
            start += dash_len + dash_separation;
        }
        polygons
    }
}

impl fmt::Display for PolyLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "PolyLine::new(vec![")?;
        for pt in &self.pts {
            writeln!(f, "  Pt2D::new({}, {}),", pt.x(), pt.y())?;
        }
        write!(f, "])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pl(pts: Vec<(f64, f64)>) -> PolyLine {
        PolyLine::new(pts.into_iter().map(|(x, y)| Pt2D::new(x, y)).collect()).unwrap()
    }

    #[test]
    fn rejects_bad_input() {
        assert!(PolyLine::new(vec![Pt2D::new(0.0, 0.0)]).is_err());
        assert!(PolyLine::new(vec![Pt2D::new(0.0, 0.0), Pt2D::new(0.0, 0.0)]).is_err());
        assert!(
            PolyLine::deduping_new(vec![Pt2D::new(0.0, 0.0), Pt2D::new(0.0, 0.0)]).is_err()
        );
        assert!(PolyLine::deduping_new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(0.0, 0.0),
            Pt2D::new(1.0, 0.0)
        ])
        .is_ok());
    }

    #[test]
    fn straight_strip_area() {
        let line = pl(vec![(0.0, 0.0), (100.0, 0.0)]);
        let poly = line.make_polygons(Distance::meters(3.5)).unwrap();
        assert!((poly.area() - 350.0).abs() < 1e-3);
        assert!(poly.exterior().is_ccw());
    }

    #[test]
    fn shift_roundtrip() {
        let line = pl(vec![(0.0, 0.0), (50.0, 0.0), (100.0, 20.0), (120.0, 60.0)]);
        let w = Distance::meters(1.5);
        let back = line
            .shift_right(w)
            .unwrap()
            .shift_left(w)
            .unwrap();
        assert_eq!(back.points().len(), line.points().len());
        for (pt1, pt2) in back.points().iter().zip(line.points()) {
            assert!(pt1.approx_eq(*pt2, Distance::meters(0.001)), "{} vs {}", pt1, pt2);
        }
    }

    #[test]
    fn sharp_corner_is_beveled() {
        // A hairpin: the miter point on the outside would be very far away
        let line = pl(vec![(0.0, 0.0), (100.0, 0.0), (0.0, 5.0)]);
        let w = Distance::meters(1.0);
        // Turning left, so the right side is outside
        let right = line.shift_right(w).unwrap();
        assert_eq!(right.points().len(), 4);
        for pt in right.points() {
            assert!(pt.dist_to(Pt2D::new(100.0, 0.0)) < Distance::meters(101.0));
            assert!(pt.x() <= 100.0 + MITER_LIMIT);
        }
        // The inside of the corner keeps a single miter point
        let left = line.shift_left(w).unwrap();
        assert_eq!(left.points().len(), 3);
    }

    #[test]
    fn gentle_corner_is_mitered() {
        let line = pl(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let right = line.shift_right(Distance::meters(1.0)).unwrap();
        assert_eq!(
            right.points(),
            &vec![
                Pt2D::new(0.0, -1.0),
                Pt2D::new(11.0, -1.0),
                Pt2D::new(11.0, 10.0)
            ]
        );
    }

    #[test]
    fn dashes() {
        let line = pl(vec![(0.0, 0.0), (30.0, 0.0)]);
        // Dashes start at 0, 12, 24. The one at 24 would end at 27.
        let dashes = line.dashed_lines(
            Distance::meters(0.1),
            Distance::meters(3.0),
            Distance::meters(9.0),
        );
        assert_eq!(dashes.len(), 3);
        for dash in &dashes {
            assert!((dash.area() - 0.3).abs() < 1e-3);
        }
    }

    #[test]
    fn slicing() {
        let line = pl(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let slice = line
            .exact_slice(Distance::meters(5.0), Distance::meters(15.0))
            .unwrap();
        assert_eq!(
            slice.points(),
            &vec![
                Pt2D::new(5.0, 0.0),
                Pt2D::new(10.0, 0.0),
                Pt2D::new(10.0, 5.0)
            ]
        );
        assert!(line
            .exact_slice(Distance::meters(5.0), Distance::meters(25.0))
            .is_err());
        let (pt, angle) = line.dist_along(Distance::meters(15.0)).unwrap();
        assert_eq!(pt, Pt2D::new(10.0, 5.0));
        assert!(angle.approx_eq(Angle::degrees(90.0), 0.001));
    }
}
