use shape_targets_core::ImageError;

/// Invalid detector configuration. Always fatal.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PolygonConfigError {
    #[error("number_of_sides is empty")]
    EmptySides,
    #[error("polygons need at least 3 sides (got {0})")]
    InvalidSides(usize),
    #[error("split_fraction must be in (0, 1] (got {0})")]
    SplitFraction(f32),
    #[error("iterations must be at least 1")]
    ZeroIterations,
    #[error("minimum_split_fraction must be positive (got {0})")]
    MinimumSplitFraction(f32),
    #[error("minimum_edge_intensity must be finite and >= 0 (got {0})")]
    NegativeEdgeIntensity(f32),
    #[error("min_contour_image_width_fraction must be finite and >= 0 (got {0})")]
    ContourFraction(f32),
    #[error("can't refine with both corners and lines")]
    BothRefinements,
    #[error("invalid refinement parameters: {0}")]
    InvalidRefinement(&'static str),
}

/// Errors returned by [`crate::PolygonDetector::detect`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DetectError {
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("gray image ({gray_width}x{gray_height}) and binary mask ({binary_width}x{binary_height}) differ in size")]
    SizeMismatch {
        gray_width: usize,
        gray_height: usize,
        binary_width: usize,
        binary_height: usize,
    },
}
