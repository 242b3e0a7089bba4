use shape_targets_core::{sobel_gradient, BinaryImageView, GrayImageView, ImageF32};

#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::contour::{extract_contours, Contour};
use crate::edge_score::EdgeScorer;
use crate::error::{DetectError, PolygonConfigError};
use crate::orientation::normalize_orientation;
use crate::params::PolygonDetectorParams;
use crate::refine::refine_polygon;
use crate::split_merge::fit_polygon;
use crate::types::{ContourOutcome, DetectedPolygon, PolygonDetectionResult, RejectReason};

/// Polygon detector: contours, split and merge, edge check, subpixel
/// refinement, canonical vertex order.
///
/// The binary mask selects candidate regions; the gray image is only used
/// for edge scoring and refinement. The detector keeps no per-image state,
/// so one instance can be shared across threads.
#[derive(Clone, Debug)]
pub struct PolygonDetector {
    params: PolygonDetectorParams,
}

/// Per-image data shared by all contours.
struct ImagePass<'a> {
    gray: GrayImageView<'a>,
    magnitude: Option<ImageF32>,
}

impl PolygonDetector {
    pub fn new(params: PolygonDetectorParams) -> Result<Self, PolygonConfigError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &PolygonDetectorParams {
        &self.params
    }

    /// Detect polygons in one frame.
    ///
    /// `gray` and `binary` must have the same size. Accepted polygons are
    /// returned in contour extraction order.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, gray, binary), fields(width = gray.width, height = gray.height))
    )]
    pub fn detect(
        &self,
        gray: &GrayImageView<'_>,
        binary: &BinaryImageView<'_>,
    ) -> Result<PolygonDetectionResult, DetectError> {
        gray.validate()?;
        binary.validate()?;
        if gray.width != binary.width || gray.height != binary.height {
            return Err(DetectError::SizeMismatch {
                gray_width: gray.width,
                gray_height: gray.height,
                binary_width: binary.width,
                binary_height: binary.height,
            });
        }

        let contours = extract_contours(binary)?;
        let magnitude = if self.params.minimum_edge_intensity > 0.0 {
            Some(sobel_gradient(gray)?.magnitude())
        } else {
            None
        };
        let pass = ImagePass {
            gray: *gray,
            magnitude,
        };

        #[cfg(feature = "rayon")]
        let fits: Vec<Result<DetectedPolygon, RejectReason>> = contours
            .par_iter()
            .enumerate()
            .map(|(i, c)| self.process_contour(i, c, &pass))
            .collect();

        #[cfg(not(feature = "rayon"))]
        let fits: Vec<Result<DetectedPolygon, RejectReason>> = contours
            .iter()
            .enumerate()
            .map(|(i, c)| self.process_contour(i, c, &pass))
            .collect();

        let result = self.assemble(contours, fits);
        log::debug!(
            "polygon detector: {} polygons accepted",
            result.polygons.len()
        );
        Ok(result)
    }

    fn process_contour(
        &self,
        index: usize,
        contour: &Contour,
        pass: &ImagePass<'_>,
    ) -> Result<DetectedPolygon, RejectReason> {
        let (width, height) = (pass.gray.width, pass.gray.height);
        if self.params.reject_border_contours && contour.touches_border(width, height) {
            return Err(RejectReason::TouchesBorder);
        }

        let polygon = fit_polygon(contour, width, &self.params)?;

        let edge_intensity = match &pass.magnitude {
            Some(mag) => {
                let score = EdgeScorer::new(mag).score(&polygon);
                if score < self.params.minimum_edge_intensity {
                    return Err(RejectReason::WeakEdges { score });
                }
                Some(score)
            }
            None => None,
        };

        let refined = refine_polygon(&polygon, &pass.gray, &self.params.refinement);
        Ok(DetectedPolygon {
            polygon: normalize_orientation(&refined.polygon, self.params.clockwise),
            contour_index: index,
            edge_intensity,
            refinement: refined.status,
        })
    }

    fn assemble(
        &self,
        contours: Vec<Contour>,
        fits: Vec<Result<DetectedPolygon, RejectReason>>,
    ) -> PolygonDetectionResult {
        let mut polygons = Vec::new();
        let mut outcomes = Vec::with_capacity(fits.len());
        let mut rejected = [0usize; 5];

        for fit in fits {
            match fit {
                Ok(p) => {
                    outcomes.push(ContourOutcome::Accepted {
                        polygon: polygons.len(),
                    });
                    polygons.push(p);
                }
                Err(reason) => {
                    rejected[reject_slot(&reason)] += 1;
                    outcomes.push(ContourOutcome::Rejected(reason));
                }
            }
        }
        log::debug!(
            "rejected contours: border={} small={} sides={} concave={} weak={}",
            rejected[0],
            rejected[1],
            rejected[2],
            rejected[3],
            rejected[4]
        );

        if self.params.diagnostics {
            PolygonDetectionResult {
                polygons,
                contours: Some(contours),
                outcomes: Some(outcomes),
            }
        } else {
            PolygonDetectionResult {
                polygons,
                contours: None,
                outcomes: None,
            }
        }
    }
}

fn reject_slot(reason: &RejectReason) -> usize {
    match reason {
        RejectReason::TouchesBorder => 0,
        RejectReason::TooSmall { .. } => 1,
        RejectReason::SideCount { .. } => 2,
        RejectReason::NotConvex => 3,
        RejectReason::WeakEdges { .. } => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Refinement;
    use crate::refine::RefineStatus;
    use nalgebra::Point2;
    use shape_targets_core::{BinaryImage, GrayImage};

    /// Dark square over pixels `[x0, x1)`, mask set where dark.
    fn square_scene(size: usize, x0: usize, x1: usize) -> (GrayImage, BinaryImage) {
        let mut gray = GrayImage::filled(size, size, 230);
        let mut mask = BinaryImage::new(size, size);
        for y in x0..x1 {
            for x in x0..x1 {
                gray.data[y * size + x] = 20;
                mask.set(x, y, true);
            }
        }
        (gray, mask)
    }

    #[test]
    fn invalid_params_are_rejected_up_front() {
        let params = PolygonDetectorParams::new([2]);
        assert_eq!(
            PolygonDetector::new(params).err(),
            Some(PolygonConfigError::InvalidSides(2))
        );
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let det = PolygonDetector::new(PolygonDetectorParams::default()).unwrap();
        let gray = GrayImage::new(10, 10);
        let mask = BinaryImage::new(12, 10);
        assert!(matches!(
            det.detect(&gray.view(), &mask.view()),
            Err(DetectError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn square_is_found_refined_and_normalized() {
        let (gray, mask) = square_scene(200, 50, 150);
        let det = PolygonDetector::new(PolygonDetectorParams::default()).unwrap();
        let res = det.detect(&gray.view(), &mask.view()).unwrap();
        assert_eq!(res.len(), 1);
        let found = &res.polygons[0];
        assert_eq!(found.refinement, RefineStatus::Converged);
        assert_eq!(found.contour_index, 0);
        assert!(found.edge_intensity.unwrap() > 50.0);
        assert!(found.polygon.signed_area() > 0.0);
        assert!((found.polygon.area() - 10_000.0).abs() < 5.0);
        assert!(found
            .polygon
            .vertices
            .iter()
            .any(|v| (v - Point2::new(49.5, 49.5)).norm() < 1e-2));
        assert!(res.contours.is_none() && res.outcomes.is_none());
    }

    #[test]
    fn diagnostics_report_every_contour() {
        let (gray, mut mask) = square_scene(200, 50, 150);
        // speck below the size limit
        for y in 170..173 {
            for x in 170..173 {
                mask.set(x, y, true);
            }
        }
        let params = PolygonDetectorParams {
            diagnostics: true,
            refinement: Refinement::None,
            ..PolygonDetectorParams::default()
        };
        let det = PolygonDetector::new(params).unwrap();
        let res = det.detect(&gray.view(), &mask.view()).unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res.polygons[0].refinement, RefineStatus::Skipped);
        assert_eq!(res.contours.as_ref().map(Vec::len), Some(2));
        assert_eq!(
            res.outcomes,
            Some(vec![
                ContourOutcome::Accepted { polygon: 0 },
                ContourOutcome::Rejected(RejectReason::TooSmall { size: 3 }),
            ])
        );
    }

    #[test]
    fn flat_gray_vetoes_every_shape() {
        let (_, mask) = square_scene(200, 50, 150);
        let flat = GrayImage::filled(200, 200, 128);
        let params = PolygonDetectorParams {
            diagnostics: true,
            ..PolygonDetectorParams::default()
        };
        let det = PolygonDetector::new(params).unwrap();
        let res = det.detect(&flat.view(), &mask.view()).unwrap();
        assert!(res.is_empty());
        assert_eq!(
            res.outcomes,
            Some(vec![ContourOutcome::Rejected(RejectReason::WeakEdges {
                score: 0.0
            })])
        );
    }

    #[test]
    fn border_contours_are_dropped_unless_allowed() {
        let (gray, mask) = square_scene(100, 0, 40);
        // no gradient support along the image border
        let params = PolygonDetectorParams {
            refinement: Refinement::None,
            minimum_edge_intensity: 0.0,
            ..PolygonDetectorParams::default()
        };
        let det = PolygonDetector::new(params.clone()).unwrap();
        assert!(det.detect(&gray.view(), &mask.view()).unwrap().is_empty());

        let keep = PolygonDetector::new(PolygonDetectorParams {
            reject_border_contours: false,
            ..params
        })
        .unwrap();
        assert_eq!(keep.detect(&gray.view(), &mask.view()).unwrap().len(), 1);
    }
}
