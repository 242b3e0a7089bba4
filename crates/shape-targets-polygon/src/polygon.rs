use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Closed polygon; vertex order is boundary order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<Point2<f32>>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point2<f32>>) -> Self {
        Self { vertices }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex at `i`, wrapping around.
    #[inline]
    pub fn vertex(&self, i: usize) -> Point2<f32> {
        self.vertices[i % self.vertices.len()]
    }

    /// Edges `(v[i], v[i+1])`, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point2<f32>, Point2<f32>)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Shoelace area. Positive when the vertices run clockwise on screen
    /// (image coordinates, y pointing down).
    pub fn signed_area(&self) -> f64 {
        let twice: f64 = self
            .edges()
            .map(|(a, b)| a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64)
            .sum();
        0.5 * twice
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn is_clockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    pub fn perimeter(&self) -> f64 {
        self.edges().map(|(a, b)| (b - a).norm() as f64).sum()
    }

    pub fn centroid(&self) -> Option<Point2<f32>> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vector2::zeros(), |acc, p| acc + p.coords);
        Some(Point2::from(sum / self.vertices.len() as f32))
    }

    /// All turns go the same way. Collinear vertices are tolerated.
    pub fn is_convex(&self) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut sign = 0.0f32;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let c = self.vertices[(i + 2) % n];
            let cross = (b - a).perp(&(c - b));
            if cross.abs() <= f32::EPSILON {
                continue;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        sign != 0.0
    }

    pub fn reversed(&self) -> Self {
        let mut vertices = self.vertices.clone();
        vertices.reverse();
        Self { vertices }
    }
}
