//! Core image utilities for polygon shape detection.
//!
//! This crate holds everything the detector needs from the pixel side:
//! borrowed/owned image buffers, bilinear sampling, binary masks, kernel
//! convolution with explicit border handling, the Sobel gradient and a few
//! thresholding helpers. It has no knowledge of contours or polygons.

pub mod convolve;
mod error;
mod gradient;
mod image;
mod logger;
mod threshold;

pub use convolve::{convolve, BorderMode, ConvolveFilter, Kernel, Kernel1D, Kernel2D, PixelSource};
pub use error::ImageError;
pub use gradient::{sobel_gradient, Gradient};
pub use image::{
    sample_bilinear, sample_bilinear_u8, BinaryImage, BinaryImageView, GrayImage, GrayImageView,
    ImageF32,
};
pub use threshold::{binarize, otsu_threshold, ThresholdConfig};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, LOG_ENV_VAR};
