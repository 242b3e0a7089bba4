//! Subpixel refinement of fitted polygons against the gray image.
//!
//! Two strategies are available, selected through [`Refinement`]: whole-edge
//! line fitting ([`refine_with_lines`]) and corner-local fitting
//! ([`refine_with_corners`]). Both keep the vertex count and order.

mod corners;
mod lines;
mod snap;

use serde::{Deserialize, Serialize};
use shape_targets_core::GrayImageView;

use crate::params::Refinement;
use crate::polygon::Polygon;

pub use corners::refine_with_corners;
pub use lines::refine_with_lines;

/// How a refinement run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefineStatus {
    /// Refinement disabled.
    Skipped,
    Converged,
    /// Iteration budget spent; best iterate returned.
    MaxIterations,
    /// Not enough edge support or degenerate geometry; some or all vertices
    /// were returned unrefined.
    Degenerate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RefineOutcome {
    pub polygon: Polygon,
    pub status: RefineStatus,
}

impl RefineOutcome {
    fn degenerate(polygon: &Polygon) -> Self {
        Self {
            polygon: polygon.clone(),
            status: RefineStatus::Degenerate,
        }
    }
}

/// Apply the configured refinement strategy.
pub fn refine_polygon(
    polygon: &Polygon,
    gray: &GrayImageView<'_>,
    refinement: &Refinement,
) -> RefineOutcome {
    match refinement {
        Refinement::None => RefineOutcome {
            polygon: polygon.clone(),
            status: RefineStatus::Skipped,
        },
        Refinement::Lines(p) => refine_with_lines(polygon, gray, p),
        Refinement::Corners(p) => refine_with_corners(polygon, gray, p),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{RefineCornersParams, RefineLinesParams};
    use nalgebra::Point2;
    use shape_targets_core::GrayImage;

    /// Dark square covering pixels `50..150` on light background; its true
    /// outline runs along 49.5 and 149.5.
    fn square_image() -> GrayImage {
        let mut img = GrayImage::filled(200, 200, 255);
        for y in 50..150 {
            for x in 50..150 {
                img.data[y * 200 + x] = 0;
            }
        }
        img
    }

    fn pixel_square() -> Polygon {
        Polygon::new(vec![
            Point2::new(50.0, 50.0),
            Point2::new(149.0, 50.0),
            Point2::new(149.0, 149.0),
            Point2::new(50.0, 149.0),
        ])
    }

    fn expected() -> [Point2<f32>; 4] {
        [
            Point2::new(49.5, 49.5),
            Point2::new(149.5, 49.5),
            Point2::new(149.5, 149.5),
            Point2::new(49.5, 149.5),
        ]
    }

    #[test]
    fn lines_recover_the_true_outline() {
        let img = square_image();
        let out = refine_with_lines(&pixel_square(), &img.view(), &RefineLinesParams::default());
        assert_eq!(out.status, RefineStatus::Converged);
        for (v, e) in out.polygon.vertices.iter().zip(expected()) {
            assert!((v - e).norm() < 1e-3, "{v:?} vs {e:?}");
        }
        assert!((out.polygon.area() - 10_000.0).abs() < 1.0);
    }

    #[test]
    fn corners_recover_the_true_outline() {
        let img = square_image();
        let out = refine_with_corners(
            &pixel_square(),
            &img.view(),
            &RefineCornersParams::default(),
        );
        assert_eq!(out.status, RefineStatus::Converged);
        for (v, e) in out.polygon.vertices.iter().zip(expected()) {
            assert!((v - e).norm() < 1e-3, "{v:?} vs {e:?}");
        }
    }

    #[test]
    fn flat_image_leaves_polygon_unchanged() {
        let img = GrayImage::filled(200, 200, 128);
        let poly = pixel_square();
        let lines = refine_polygon(
            &poly,
            &img.view(),
            &Refinement::Lines(RefineLinesParams::default()),
        );
        assert_eq!(lines.status, RefineStatus::Degenerate);
        assert_eq!(lines.polygon, poly);
        let corners = refine_polygon(
            &poly,
            &img.view(),
            &Refinement::Corners(RefineCornersParams::default()),
        );
        assert_eq!(corners.status, RefineStatus::Degenerate);
        assert_eq!(corners.polygon, poly);
    }

    #[test]
    fn disabled_refinement_is_skipped() {
        let img = square_image();
        let out = refine_polygon(&pixel_square(), &img.view(), &Refinement::None);
        assert_eq!(out.status, RefineStatus::Skipped);
        assert_eq!(out.polygon, pixel_square());
    }

    #[test]
    fn tiny_polygons_are_degenerate() {
        let img = square_image();
        let seg = Polygon::new(vec![Point2::new(1.0, 1.0), Point2::new(5.0, 1.0)]);
        let out = refine_with_lines(&seg, &img.view(), &RefineLinesParams::default());
        assert_eq!(out.status, RefineStatus::Degenerate);
        assert_eq!(out.polygon, seg);
    }
}
