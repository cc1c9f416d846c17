use std::fmt;

use anyhow::Result;
use geo::{BooleanOps, ConvexHull};
use serde::{Deserialize, Serialize};

use crate::{Bounds, Circle, Distance, Pt2D, Ring, Triangle, EPSILON_DIST};

/// A polygon with an optional set of holes, pre-tessellated into triangles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// Every ring's points, without the repeated closing point, exterior first. `indices` refers
    /// to these.
    points: Vec<Pt2D>,
    /// Groups of three indices make up the triangles
    indices: Vec<u32>,
    /// The first ring is the exterior and goes counter-clockwise. Any holes go clockwise.
    rings: Vec<Ring>,
}

impl Polygon {
    /// Orients the rings and triangulates. Fails if the triangulation is empty, which happens for
    /// polygons with no area.
    pub fn with_holes(outer: Ring, holes: Vec<Ring>) -> Result<Polygon> {
        let mut rings = Vec::with_capacity(1 + holes.len());
        rings.push(if outer.is_ccw() { outer } else { outer.reversed() });
        for hole in holes {
            rings.push(if hole.is_ccw() { hole.reversed() } else { hole });
        }

        let mut points = Vec::new();
        let mut hole_indices = Vec::new();
        for (idx, ring) in rings.iter().enumerate() {
            if idx > 0 {
                hole_indices.push(points.len());
            }
            let pts = ring.points();
            points.extend_from_slice(&pts[..pts.len() - 1]);
        }

        let mut vertices = Vec::with_capacity(points.len() * 2);
        for pt in &points {
            vertices.push(pt.x());
            vertices.push(pt.y());
        }
        let indices = earcutr::earcut(&vertices, &hole_indices, 2)
            .map_err(|err| anyhow!("Can't triangulate polygon: {:?}", err))?;
        if indices.is_empty() {
            bail!("Polygon has no area");
        }

        Ok(Polygon {
            points,
            indices: downsize(indices)?,
            rings,
        })
    }

    pub fn from_ring(ring: Ring) -> Result<Polygon> {
        Polygon::with_holes(ring, Vec::new())
    }

    /// An axis-aligned rectangle with corners at two points.
    pub fn rectangle_two_corners(pt1: Pt2D, pt2: Pt2D) -> Result<Polygon> {
        Polygon::from_ring(Ring::new(vec![
            Pt2D::new(pt1.x(), pt1.y()),
            Pt2D::new(pt2.x(), pt1.y()),
            Pt2D::new(pt2.x(), pt2.y()),
            Pt2D::new(pt1.x(), pt2.y()),
            Pt2D::new(pt1.x(), pt1.y()),
        ])?)
    }

    /// The smallest convex polygon containing all the points. Fails if the points are collinear.
    pub fn convex_hull(pts: &[Pt2D]) -> Result<Polygon> {
        let mp: geo::MultiPoint = pts.iter().map(|pt| geo::Point::from(*pt)).collect();
        let hull = mp.convex_hull();
        Ring::from_geo(hull.exterior())?.into_polygon()
    }

    /// The vertices used by the triangulation, without repeated closing points.
    pub fn vertices(&self) -> &Vec<Pt2D> {
        &self.points
    }

    pub fn triangle_indices(&self) -> &Vec<u32> {
        &self.indices
    }

    pub fn triangles(&self) -> Vec<Triangle> {
        self.indices
            .chunks_exact(3)
            .map(|slice| Triangle {
                pt1: self.points[slice[0] as usize],
                pt2: self.points[slice[1] as usize],
                pt3: self.points[slice[2] as usize],
            })
            .collect()
    }

    pub fn rings(&self) -> &Vec<Ring> {
        &self.rings
    }

    pub fn exterior(&self) -> &Ring {
        &self.rings[0]
    }

    pub fn holes(&self) -> &[Ring] {
        &self.rings[1..]
    }

    /// The exterior ring's points, including the closing point.
    pub fn points(&self) -> &Vec<Pt2D> {
        self.rings[0].points()
    }

    /// Exterior area minus the holes.
    pub fn area(&self) -> f64 {
        self.rings.iter().map(|ring| ring.signed_area()).sum()
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds::from(&self.points)
    }

    pub fn center(&self) -> Pt2D {
        self.get_bounds().center()
    }

    pub fn contains_pt(&self, pt: Pt2D) -> bool {
        use geo::Contains;
        self.to_geo().contains(&geo::Point::from(pt))
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Polygon {
        Polygon {
            points: self.points.iter().map(|pt| pt.offset(dx, dy)).collect(),
            indices: self.indices.clone(),
            rings: self.rings.iter().map(|r| r.translate(dx, dy)).collect(),
        }
    }

    pub fn to_geo(&self) -> geo::Polygon {
        geo::Polygon::new(
            self.rings[0].to_geo(),
            self.rings[1..].iter().map(|r| r.to_geo()).collect(),
        )
    }

    /// Holes that can't be converted are dropped.
    pub fn from_geo(polygon: &geo::Polygon) -> Result<Polygon> {
        let outer = Ring::from_geo(polygon.exterior())?;
        let holes = polygon
            .interiors()
            .iter()
            .filter_map(|ls| Ring::from_geo(ls).ok())
            .collect();
        Polygon::with_holes(outer, holes)
    }

    /// Merges all of the polygons, returning the disjoint pieces. Pieces that degenerate in the
    /// process are dropped.
    pub fn union_all(polygons: Vec<Polygon>) -> Vec<Polygon> {
        let mut result = geo::MultiPolygon::new(Vec::new());
        for p in polygons {
            result = result.union(&geo::MultiPolygon::new(vec![p.to_geo()]));
        }
        result
            .0
            .iter()
            .filter_map(|p| Polygon::from_geo(p).ok())
            .collect()
    }

    /// Grows the polygon outwards by some distance, rounding the corners. This is the union of
    /// the polygon, a band around every edge, and a circle on every vertex.
    pub fn dilate(&self, distance: Distance) -> Vec<Polygon> {
        if distance <= EPSILON_DIST {
            return vec![self.clone()];
        }

        let mut pieces = vec![self.clone()];
        for ring in &self.rings {
            for line in ring.lines() {
                if let Ok(band) = line.to_polyline().make_polygons(distance * 2.0) {
                    pieces.push(band);
                }
            }
            for pt in ring.points().iter().skip(1) {
                if let Ok(circle) = Circle::new(*pt, distance).to_polygon() {
                    pieces.push(circle);
                }
            }
        }
        Polygon::union_all(pieces)
    }
}

impl fmt::Display for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "Polygon with {} rings and {} triangles",
            self.rings.len(),
            self.indices.len() / 3
        )?;
        for ring in &self.rings {
            writeln!(f, "{}", ring)?;
        }
        Ok(())
    }
}

fn downsize(input: Vec<usize>) -> Result<Vec<u32>> {
    let mut output = Vec::with_capacity(input.len());
    for x in input {
        output.push(u32::try_from(x).map_err(|_| anyhow!("{} can't fit in u32", x))?);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolyLine;

    fn triangle_area_sum(p: &Polygon) -> f64 {
        p.triangles().iter().map(|t| t.area()).sum()
    }

    #[test]
    fn hole_orientation_and_area() {
        let outer = Ring::deduping_new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(0.0, 10.0),
            Pt2D::new(10.0, 10.0),
            Pt2D::new(10.0, 0.0),
        ])
        .unwrap();
        let hole = Ring::deduping_new(vec![
            Pt2D::new(4.0, 4.0),
            Pt2D::new(6.0, 4.0),
            Pt2D::new(6.0, 6.0),
            Pt2D::new(4.0, 6.0),
        ])
        .unwrap();
        let p = Polygon::with_holes(outer, vec![hole]).unwrap();
        assert!(p.exterior().is_ccw());
        assert!(!p.holes()[0].is_ccw());
        assert!((p.area() - 96.0).abs() < 1e-6);
        assert!((triangle_area_sum(&p) - 96.0).abs() < 1e-6);
        assert!(!p.contains_pt(Pt2D::new(5.0, 5.0)));
        assert!(p.contains_pt(Pt2D::new(1.0, 1.0)));
    }

    #[test]
    fn convex_hull() {
        let hull = Polygon::convex_hull(&[
            Pt2D::new(0.0, 0.0),
            Pt2D::new(4.0, 0.0),
            Pt2D::new(2.0, 1.0),
            Pt2D::new(4.0, 4.0),
            Pt2D::new(0.0, 4.0),
        ])
        .unwrap();
        assert!((hull.area() - 16.0).abs() < 1e-6);
        assert!(Polygon::convex_hull(&[
            Pt2D::new(0.0, 0.0),
            Pt2D::new(1.0, 0.0),
            Pt2D::new(2.0, 0.0)
        ])
        .is_err());
    }

    #[test]
    fn dilate_covers_input() {
        let strip = PolyLine::new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(20.0, 0.0),
            Pt2D::new(20.0, 20.0),
        ])
        .unwrap()
        .make_polygons(Distance::meters(3.0))
        .unwrap();
        let dilated = strip.dilate(Distance::meters(2.0));
        assert_eq!(dilated.len(), 1);
        let total: f64 = dilated.iter().map(|p| p.area()).sum();
        assert!(total > strip.area());
        // Triangles tile each piece exactly
        for p in &dilated {
            assert!((triangle_area_sum(p) - p.area()).abs() < 1e-3);
        }
        for pt in strip.points() {
            assert!(dilated.iter().any(|p| p.contains_pt(*pt)));
        }
    }

    #[test]
    fn union_of_disjoint() {
        let a = Polygon::rectangle_two_corners(Pt2D::new(0.0, 0.0), Pt2D::new(1.0, 1.0)).unwrap();
        let b = Polygon::rectangle_two_corners(Pt2D::new(5.0, 5.0), Pt2D::new(6.0, 6.0)).unwrap();
        let c = Polygon::rectangle_two_corners(Pt2D::new(0.5, 0.5), Pt2D::new(2.0, 2.0)).unwrap();
        let result = Polygon::union_all(vec![a, b, c]);
        assert_eq!(result.len(), 2);
        let total: f64 = result.iter().map(|p| p.area()).sum();
        assert!((total - (1.0 + 2.25 - 0.25 + 1.0)).abs() < 1e-6);
    }
}
