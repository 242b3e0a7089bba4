//! Gradient support of polygon edges.
//!
//! Every edge is scored with the mean gradient magnitude sampled along its
//! interior (the 10% next to each corner is skipped); the polygon score is
//! the weakest edge. Shapes traced out of noise or flat regions score low.

use nalgebra::Point2;
use shape_targets_core::ImageF32;

use crate::polygon::Polygon;

const END_MARGIN: f32 = 0.1;
const MIN_SAMPLES: usize = 3;
const MAX_SAMPLES: usize = 30;
/// Edges shorter than this score zero.
const MIN_EDGE_LEN_PX: f32 = 2.0;

/// Scores polygon edges against a precomputed gradient magnitude image.
#[derive(Clone, Copy, Debug)]
pub struct EdgeScorer<'a> {
    magnitude: &'a ImageF32,
}

impl<'a> EdgeScorer<'a> {
    pub fn new(magnitude: &'a ImageF32) -> Self {
        Self { magnitude }
    }

    /// Mean gradient magnitude along one edge.
    pub fn edge_score(&self, a: Point2<f32>, b: Point2<f32>) -> f32 {
        let d = b - a;
        let len = d.norm();
        if len < MIN_EDGE_LEN_PX {
            return 0.0;
        }
        let samples = (len as usize).clamp(MIN_SAMPLES, MAX_SAMPLES);
        let span = 1.0 - 2.0 * END_MARGIN;
        let sum: f32 = (0..samples)
            .map(|k| {
                let t = END_MARGIN + span * k as f32 / (samples - 1) as f32;
                let p = a + d * t;
                self.magnitude.sample_bilinear(p.x, p.y)
            })
            .sum();
        sum / samples as f32
    }

    /// Per-edge scores, edge `i` running from vertex `i` to `i + 1`.
    pub fn edge_scores(&self, polygon: &Polygon) -> Vec<f32> {
        polygon
            .edges()
            .map(|(a, b)| self.edge_score(a, b))
            .collect()
    }

    /// Weakest edge score; `0` for an empty polygon.
    pub fn score(&self, polygon: &Polygon) -> f32 {
        polygon
            .edges()
            .map(|(a, b)| self.edge_score(a, b))
            .reduce(f32::min)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shape_targets_core::{sobel_gradient, GrayImage};

    fn square() -> Polygon {
        Polygon::new(vec![
            Point2::new(10.0, 10.0),
            Point2::new(29.0, 10.0),
            Point2::new(29.0, 29.0),
            Point2::new(10.0, 29.0),
        ])
    }

    #[test]
    fn dark_square_on_light_background_scores_half_the_step() {
        let mut img = GrayImage::filled(40, 40, 200);
        for y in 10..30 {
            for x in 10..30 {
                img.data[y * 40 + x] = 0;
            }
        }
        let mag = sobel_gradient(&img.view()).unwrap().magnitude();
        let scorer = EdgeScorer::new(&mag);
        let scores = scorer.edge_scores(&square());
        assert_eq!(scores.len(), 4);
        for s in scores {
            assert!((s - 100.0).abs() < 1e-3, "edge score {s}");
        }
        assert!((scorer.score(&square()) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn flat_image_scores_zero() {
        let img = GrayImage::filled(40, 40, 90);
        let mag = sobel_gradient(&img.view()).unwrap().magnitude();
        assert_eq!(EdgeScorer::new(&mag).score(&square()), 0.0);
    }

    #[test]
    fn weakest_edge_wins() {
        let mut mag = ImageF32::new(40, 40);
        for y in 0..40 {
            for x in 0..40 {
                // strong everywhere except the bottom row of the square
                let v = if y == 29 { 5.0 } else { 50.0 };
                mag.set(x, y, v);
            }
        }
        let scorer = EdgeScorer::new(&mag);
        let scores = scorer.edge_scores(&square());
        assert!((scores[0] - 50.0).abs() < 1e-4);
        assert!((scores[2] - 5.0).abs() < 1e-4);
        assert!((scorer.score(&square()) - 5.0).abs() < 1e-4);
    }

    #[test]
    fn tiny_edges_score_zero() {
        let mag = ImageF32 {
            width: 4,
            height: 4,
            data: vec![100.0; 16],
        };
        let scorer = EdgeScorer::new(&mag);
        assert_eq!(
            scorer.edge_score(Point2::new(1.0, 1.0), Point2::new(2.0, 1.0)),
            0.0
        );
        assert_eq!(scorer.score(&Polygon::default()), 0.0);
    }
}
