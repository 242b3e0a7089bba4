use serde::{Deserialize, Serialize};

use crate::PolygonConfigError;

/// Edge-based subpixel refinement. Assumes straight edges, so it works best
/// once lens distortion has been removed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineLinesParams {
    /// Pixels at both ends of an edge that are not sampled.
    pub corner_offset: f32,
    /// Number of samples taken along each edge.
    pub line_samples: usize,
    /// Probes on each side of the edge, along its normal, in whole pixels.
    pub sample_radius: usize,
    pub max_iterations: usize,
    /// Stop once no edge endpoint moves more than this (pixels).
    pub converge_tol_px: f32,
}

impl Default for RefineLinesParams {
    fn default() -> Self {
        Self {
            corner_offset: 2.0,
            line_samples: 20,
            sample_radius: 1,
            max_iterations: 10,
            converge_tol_px: 1e-3,
        }
    }
}

/// Corner-local subpixel refinement. Only looks at short stretches of the
/// two edges meeting at each corner; tolerates distortion better, fits
/// slightly worse on ideal images.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineCornersParams {
    /// Length of the edge stretch used on each side of the corner (pixels).
    pub end_point_distance: f32,
    /// Pixels next to the corner that are not sampled.
    pub corner_offset: f32,
    pub line_samples: usize,
    pub sample_radius: usize,
    pub max_iterations: usize,
    pub converge_tol_px: f32,
    /// A corner moving further than this is treated as a failed fit.
    pub max_corner_change_px: f32,
}

impl Default for RefineCornersParams {
    fn default() -> Self {
        Self {
            end_point_distance: 6.0,
            corner_offset: 1.0,
            line_samples: 8,
            sample_radius: 1,
            max_iterations: 10,
            converge_tol_px: 1e-3,
            max_corner_change_px: 4.0,
        }
    }
}

/// Subpixel refinement strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Refinement {
    None,
    Lines(RefineLinesParams),
    Corners(RefineCornersParams),
}

impl Default for Refinement {
    fn default() -> Self {
        Self::Lines(RefineLinesParams::default())
    }
}

impl Refinement {
    fn validate(&self) -> Result<(), PolygonConfigError> {
        let bad = |msg| Err(PolygonConfigError::InvalidRefinement(msg));
        match self {
            Refinement::None => Ok(()),
            Refinement::Lines(p) => {
                if p.line_samples < 2 {
                    return bad("line refinement needs at least 2 samples per edge");
                }
                check_common(p.sample_radius, p.max_iterations, p.converge_tol_px)?;
                if !non_negative(p.corner_offset) {
                    return bad("corner_offset must be >= 0");
                }
                Ok(())
            }
            Refinement::Corners(p) => {
                if p.line_samples < 2 {
                    return bad("corner refinement needs at least 2 samples per side");
                }
                check_common(p.sample_radius, p.max_iterations, p.converge_tol_px)?;
                if !non_negative(p.corner_offset)
                    || p.end_point_distance.is_nan()
                    || p.end_point_distance <= p.corner_offset
                {
                    return bad("end_point_distance must exceed corner_offset >= 0");
                }
                if !positive(p.max_corner_change_px) {
                    return bad("max_corner_change_px must be positive");
                }
                Ok(())
            }
        }
    }
}

#[inline]
fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

#[inline]
fn non_negative(v: f32) -> bool {
    v.is_finite() && v >= 0.0
}

fn check_common(
    sample_radius: usize,
    max_iterations: usize,
    converge_tol_px: f32,
) -> Result<(), PolygonConfigError> {
    if sample_radius == 0 {
        return Err(PolygonConfigError::InvalidRefinement(
            "sample_radius must be at least 1",
        ));
    }
    if max_iterations == 0 {
        return Err(PolygonConfigError::InvalidRefinement(
            "max_iterations must be at least 1",
        ));
    }
    if !positive(converge_tol_px) {
        return Err(PolygonConfigError::InvalidRefinement(
            "converge_tol_px must be positive",
        ));
    }
    Ok(())
}

/// Parameters of [`crate::PolygonDetector`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolygonDetectorParams {
    /// Allowed vertex counts.
    pub number_of_sides: Vec<usize>,
    /// Adjacent segments are merged when the angle between them is at most
    /// `split_fraction * PI / 2` radians. Shapes with many sides need a
    /// smaller value.
    pub split_fraction: f32,
    /// Split-and-merge passes.
    pub iterations: usize,
    /// A segment is split when a contour point is more than
    /// `minimum_split_fraction * image_width` pixels away from it.
    pub minimum_split_fraction: f32,
    pub refinement: Refinement,
    /// Minimum edge gradient support; `0` disables the check.
    pub minimum_edge_intensity: f32,
    /// Contours whose bounding size is below this fraction of the image width
    /// are dropped.
    pub min_contour_image_width_fraction: f32,
    /// Emit vertices in clockwise order as seen on screen (y down).
    pub clockwise: bool,
    pub convex_only: bool,
    /// Drop contours touching the image border (truncated shapes).
    pub reject_border_contours: bool,
    /// Keep raw contours and per-contour outcomes in the result.
    pub diagnostics: bool,
}

impl Default for PolygonDetectorParams {
    fn default() -> Self {
        Self {
            number_of_sides: vec![4],
            split_fraction: 0.15,
            iterations: 20,
            minimum_split_fraction: 0.0078125,
            refinement: Refinement::default(),
            minimum_edge_intensity: 3.0,
            min_contour_image_width_fraction: 0.05,
            clockwise: true,
            convex_only: true,
            reject_border_contours: true,
            diagnostics: false,
        }
    }
}

impl PolygonDetectorParams {
    /// Default parameters for the given vertex counts.
    pub fn new(number_of_sides: impl Into<Vec<usize>>) -> Self {
        Self {
            number_of_sides: number_of_sides.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), PolygonConfigError> {
        if self.number_of_sides.is_empty() {
            return Err(PolygonConfigError::EmptySides);
        }
        if let Some(&n) = self.number_of_sides.iter().find(|&&n| n < 3) {
            return Err(PolygonConfigError::InvalidSides(n));
        }
        if !positive(self.split_fraction) || self.split_fraction > 1.0 {
            return Err(PolygonConfigError::SplitFraction(self.split_fraction));
        }
        if self.iterations == 0 {
            return Err(PolygonConfigError::ZeroIterations);
        }
        if !positive(self.minimum_split_fraction) {
            return Err(PolygonConfigError::MinimumSplitFraction(
                self.minimum_split_fraction,
            ));
        }
        if !non_negative(self.minimum_edge_intensity) {
            return Err(PolygonConfigError::NegativeEdgeIntensity(
                self.minimum_edge_intensity,
            ));
        }
        let frac = self.min_contour_image_width_fraction;
        if !non_negative(frac) {
            return Err(PolygonConfigError::ContourFraction(frac));
        }
        self.refinement.validate()
    }

    #[inline]
    pub fn allows_sides(&self, n: usize) -> bool {
        self.number_of_sides.contains(&n)
    }

    pub fn max_sides(&self) -> usize {
        self.number_of_sides.iter().copied().max().unwrap_or(0)
    }

    /// Distance (pixels) above which a segment is split.
    pub fn split_tolerance_px(&self, image_width: usize) -> f32 {
        self.minimum_split_fraction * image_width as f32
    }

    /// Angle (radians) at or below which two segments are merged.
    pub fn merge_tolerance_rad(&self) -> f32 {
        self.split_fraction * std::f32::consts::FRAC_PI_2
    }

    /// Minimum contour bounding size (pixels).
    pub fn min_contour_size_px(&self, image_width: usize) -> f32 {
        self.min_contour_image_width_fraction * image_width as f32
    }
}

/// Flat form of the detector configuration with one boolean per refinement
/// strategy, as found in configuration files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolygonDetectorConfig {
    pub number_of_sides: Vec<usize>,
    pub split_fraction: f32,
    pub iterations: usize,
    pub minimum_split_fraction: f32,
    pub refine_with_lines: bool,
    pub refine_with_corners: bool,
    pub minimum_edge_intensity: f32,
    pub min_contour_image_width_fraction: f32,
    pub clockwise: bool,
    pub convex_only: bool,
    pub reject_border_contours: bool,
    pub diagnostics: bool,
    /// Used only when `refine_with_lines` is set.
    pub refine_lines: RefineLinesParams,
    /// Used only when `refine_with_corners` is set.
    pub refine_corners: RefineCornersParams,
}

impl Default for PolygonDetectorConfig {
    fn default() -> Self {
        Self::from(&PolygonDetectorParams::default())
    }
}

impl PolygonDetectorConfig {
    pub fn new(number_of_sides: impl Into<Vec<usize>>) -> Self {
        Self {
            number_of_sides: number_of_sides.into(),
            ..Self::default()
        }
    }

    /// Fails when both refinement strategies are requested.
    pub fn check_validity(&self) -> Result<(), PolygonConfigError> {
        if self.refine_with_lines && self.refine_with_corners {
            return Err(PolygonConfigError::BothRefinements);
        }
        Ok(())
    }

    pub fn into_params(self) -> Result<PolygonDetectorParams, PolygonConfigError> {
        PolygonDetectorParams::try_from(self)
    }
}

impl TryFrom<PolygonDetectorConfig> for PolygonDetectorParams {
    type Error = PolygonConfigError;

    fn try_from(cfg: PolygonDetectorConfig) -> Result<Self, Self::Error> {
        cfg.check_validity()?;
        let refinement = match (cfg.refine_with_lines, cfg.refine_with_corners) {
            (true, _) => Refinement::Lines(cfg.refine_lines),
            (_, true) => Refinement::Corners(cfg.refine_corners),
            _ => Refinement::None,
        };
        let params = PolygonDetectorParams {
            number_of_sides: cfg.number_of_sides,
            split_fraction: cfg.split_fraction,
            iterations: cfg.iterations,
            minimum_split_fraction: cfg.minimum_split_fraction,
            refinement,
            minimum_edge_intensity: cfg.minimum_edge_intensity,
            min_contour_image_width_fraction: cfg.min_contour_image_width_fraction,
            clockwise: cfg.clockwise,
            convex_only: cfg.convex_only,
            reject_border_contours: cfg.reject_border_contours,
            diagnostics: cfg.diagnostics,
        };
        params.validate()?;
        Ok(params)
    }
}

impl From<&PolygonDetectorParams> for PolygonDetectorConfig {
    fn from(p: &PolygonDetectorParams) -> Self {
        let (refine_with_lines, refine_lines) = match &p.refinement {
            Refinement::Lines(l) => (true, l.clone()),
            _ => (false, RefineLinesParams::default()),
        };
        let (refine_with_corners, refine_corners) = match &p.refinement {
            Refinement::Corners(c) => (true, c.clone()),
            _ => (false, RefineCornersParams::default()),
        };
        Self {
            number_of_sides: p.number_of_sides.clone(),
            split_fraction: p.split_fraction,
            iterations: p.iterations,
            minimum_split_fraction: p.minimum_split_fraction,
            refine_with_lines,
            refine_with_corners,
            minimum_edge_intensity: p.minimum_edge_intensity,
            min_contour_image_width_fraction: p.min_contour_image_width_fraction,
            clockwise: p.clockwise,
            convex_only: p.convex_only,
            reject_border_contours: p.reject_border_contours,
            diagnostics: p.diagnostics,
            refine_lines,
            refine_corners,
        }
    }
}
