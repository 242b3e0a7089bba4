//! High-level facade crate for the `shape-targets-*` workspace.
//!
//! This crate provides:
//! - re-exports of the image primitives (`shape-targets-core`) and the
//!   polygon detector (`shape-targets-polygon`)
//! - (feature-gated) end-to-end helpers that binarize an `image::GrayImage`
//!   and run the polygon detector on it
//! - (feature `cli`) the `shape-targets` command line tool.
//!
//! ## Quickstart
//!
//! ```no_run
//! use shape_targets::detect;
//! use shape_targets::{PolygonDetectorParams, ThresholdConfig};
//! use image::ImageReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = ImageReader::open("squares.png")?.decode()?.to_luma8();
//! let params = PolygonDetectorParams::new([4]);
//!
//! let result = detect::detect_polygons(&img, &ThresholdConfig::default(), params)?;
//! println!("detected: {}", result.polygons.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `shape_targets::core`: image views, convolution, gradients, thresholding, logging.
//! - `shape_targets::polygon`: contour tracing, polygon fitting, refinement, detector.
//! - `shape_targets::detect` (feature `image`): helpers over `image::GrayImage`.
//!
//! ## Features
//! - `rayon`: fit contours in parallel. Output order does not change.
//! - `tracing`: spans on the detection stages and `init_tracing`.

pub use shape_targets_core as core;
pub use shape_targets_polygon as polygon;

pub use nalgebra::Point2;

pub use shape_targets_core::{
    binarize, init_from_env, init_with_level, BinaryImage, BinaryImageView, BorderMode,
    GrayImageView, ImageError, ThresholdConfig,
};
pub use shape_targets_polygon::{
    DetectedPolygon, Polygon, PolygonDetectionResult, PolygonDetector, PolygonDetectorConfig,
    PolygonDetectorParams, RefineStatus, Refinement, RejectReason,
};

#[cfg(feature = "image")]
pub mod detect;

/// Route `log` records into `tracing` and install a subscriber filtered by
/// `RUST_LOG`, or by `default_level` when it is unset. Repeated calls are
/// no-ops.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, default_level: log::LevelFilter) {
    let _ = tracing_log::LogTracer::init();
    shape_targets_core::init_tracing(json, default_level);
}
