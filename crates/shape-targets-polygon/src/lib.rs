//! Polygon detection from a binary mask and its gray image.
//!
//! Pipeline, per image:
//! - trace the external boundary of every foreground component ([`extract_contours`]),
//! - approximate each boundary with a polygon by split and merge ([`fit_polygon`]),
//! - reject polygons without gradient support along every edge ([`EdgeScorer`]),
//! - refine the vertices to subpixel accuracy ([`refine_polygon`]),
//! - put the vertices into canonical order ([`normalize_orientation`]).
//!
//! [`PolygonDetector`] runs all of the above. Image coordinates have pixel
//! centers at integers, x to the right, y down; "clockwise" means clockwise
//! as seen on screen.
//!
//! ```no_run
//! use shape_targets_core::{BinaryImageView, GrayImageView};
//! use shape_targets_polygon::{PolygonDetector, PolygonDetectorParams};
//!
//! # fn run(gray: GrayImageView<'_>, mask: BinaryImageView<'_>) -> Result<(), Box<dyn std::error::Error>> {
//! let detector = PolygonDetector::new(PolygonDetectorParams::new([3, 4]))?;
//! for found in detector.detect(&gray, &mask)?.polygons {
//!     println!("{:?}", found.polygon.vertices);
//! }
//! # Ok(())
//! # }
//! ```

mod contour;
mod detector;
mod edge_score;
mod error;
mod orientation;
mod params;
mod polygon;
pub mod refine;
mod split_merge;
mod types;

pub use contour::{extract_contours, Contour, PixelBounds, MIN_CONTOUR_POINTS};
pub use detector::PolygonDetector;
pub use edge_score::EdgeScorer;
pub use error::{DetectError, PolygonConfigError};
pub use orientation::normalize_orientation;
pub use params::{
    PolygonDetectorConfig, PolygonDetectorParams, RefineCornersParams, RefineLinesParams,
    Refinement,
};
pub use polygon::Polygon;
pub use refine::{refine_polygon, RefineOutcome, RefineStatus};
pub use split_merge::{fit_polygon, split_merge, SplitMergeFit};
pub use types::{ContourOutcome, DetectedPolygon, PolygonDetectionResult, RejectReason};
