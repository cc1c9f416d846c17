use crate::{Bounds, Polygon, Pt2D};

// Deliberately not serializable
/// A tessellated polygon, ready for export to a mesh format.
#[derive(Clone)]
pub struct Tessellation {
    /// It's not generally possible to reconstruct a `Polygon` from these.
    points: Vec<Pt2D>,
    /// Groups of three indices make up the triangles
    indices: Vec<u32>,
}

#[derive(Clone, Debug)]
pub struct Triangle {
    pub pt1: Pt2D,
    pub pt2: Pt2D,
    pub pt3: Pt2D,
}

impl Triangle {
    /// Positive when the points go counter-clockwise.
    pub fn signed_area(&self) -> f64 {
        ((self.pt2.x() - self.pt1.x()) * (self.pt3.y() - self.pt1.y())
            - (self.pt3.x() - self.pt1.x()) * (self.pt2.y() - self.pt1.y()))
            / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }
}

impl From<&Polygon> for Tessellation {
    fn from(polygon: &Polygon) -> Self {
        Tessellation::new(
            polygon.vertices().clone(),
            polygon.triangle_indices().clone(),
        )
    }
}

impl Tessellation {
    /// Every triangle is rewound to be counter-clockwise, so that a mesh built from this faces
    /// up.
    pub fn new(points: Vec<Pt2D>, mut indices: Vec<u32>) -> Self {
        for tri in indices.chunks_exact_mut(3) {
            let t = Triangle {
                pt1: points[tri[0] as usize],
                pt2: points[tri[1] as usize],
                pt3: points[tri[2] as usize],
            };
            if t.signed_area() < 0.0 {
                tri.swap(1, 2);
            }
        }
        Tessellation { points, indices }
    }

    /// Returns (points, indices)
    pub fn consume(self) -> (Vec<Pt2D>, Vec<u32>) {
        (self.points, self.indices)
    }

    pub fn points(&self) -> &Vec<Pt2D> {
        &self.points
    }

    pub fn triangles(&self) -> Vec<Triangle> {
        let mut triangles: Vec<Triangle> = Vec::new();
        for slice in self.indices.chunks_exact(3) {
            triangles.push(Triangle {
                pt1: self.points[slice[0] as usize],
                pt2: self.points[slice[1] as usize],
                pt3: self.points[slice[2] as usize],
            });
        }
        triangles
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds::from(&self.points)
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        for pt in &mut self.points {
            *pt = pt.offset(dx, dy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Ring;

    #[test]
    fn triangles_face_up() {
        let ring = Ring::deduping_new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(0.0, 3.0),
            Pt2D::new(2.0, 5.0),
            Pt2D::new(4.0, 3.0),
            Pt2D::new(4.0, 0.0),
        ])
        .unwrap();
        let polygon = ring.into_polygon().unwrap();
        let tess = Tessellation::from(&polygon);
        let triangles = tess.triangles();
        assert_eq!(triangles.len(), 3);
        for t in &triangles {
            assert!(t.signed_area() > 0.0);
        }
        let total: f64 = triangles.iter().map(|t| t.area()).sum();
        assert!((total - polygon.area()).abs() < 1e-6);
    }
}
