use crate::{core, polygon};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidGrayBuffer { expected: usize, got: usize },

    #[error("invalid grayscale image dimensions (width={width}, height={height})")]
    InvalidGrayDimensions { width: u32, height: u32 },

    #[error(transparent)]
    Image(#[from] core::ImageError),

    #[error(transparent)]
    Config(#[from] polygon::PolygonConfigError),

    #[error(transparent)]
    Detect(#[from] polygon::DetectError),
}

/// Convert an `image::GrayImage` into the lightweight `shape-targets-core` view type.
pub fn gray_view(img: &::image::GrayImage) -> core::GrayImageView<'_> {
    core::GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Binarize `img` and run the polygon detector on the result.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(img, threshold, params),
        fields(width = img.width(), height = img.height())
    )
)]
pub fn detect_polygons(
    img: &::image::GrayImage,
    threshold: &core::ThresholdConfig,
    params: polygon::PolygonDetectorParams,
) -> Result<polygon::PolygonDetectionResult, DetectError> {
    let detector = polygon::PolygonDetector::new(params)?;
    detect_with(&detector, img, threshold)
}

/// Same as [`detect_polygons`] with an already built detector, for running
/// one configuration over many frames.
pub fn detect_with(
    detector: &polygon::PolygonDetector,
    img: &::image::GrayImage,
    threshold: &core::ThresholdConfig,
) -> Result<polygon::PolygonDetectionResult, DetectError> {
    let gray = gray_view(img);
    let mask = core::binarize(&gray, threshold)?;
    log::debug!(
        "binarized {}x{}: {} foreground pixels",
        mask.width,
        mask.height,
        mask.count_set()
    );
    Ok(detector.detect(&gray, &mask.view())?)
}

/// Build an `image::GrayImage` from a raw grayscale buffer.
pub fn gray_image_from_slice(
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<::image::GrayImage, DetectError> {
    let w = usize::try_from(width).ok();
    let h = usize::try_from(height).ok();
    let Some((w, h)) = w.zip(h) else {
        return Err(DetectError::InvalidGrayDimensions { width, height });
    };
    let Some(expected) = w.checked_mul(h) else {
        return Err(DetectError::InvalidGrayDimensions { width, height });
    };
    if expected == 0 {
        return Err(DetectError::InvalidGrayDimensions { width, height });
    }
    if pixels.len() != expected {
        return Err(DetectError::InvalidGrayBuffer {
            expected,
            got: pixels.len(),
        });
    }
    ::image::GrayImage::from_raw(width, height, pixels.to_vec())
        .ok_or(DetectError::InvalidGrayDimensions { width, height })
}

/// [`detect_polygons`] over a raw row-major grayscale buffer.
pub fn detect_polygons_from_gray_u8(
    width: u32,
    height: u32,
    pixels: &[u8],
    threshold: &core::ThresholdConfig,
    params: polygon::PolygonDetectorParams,
) -> Result<polygon::PolygonDetectionResult, DetectError> {
    let img = gray_image_from_slice(width, height, pixels)?;
    detect_polygons(&img, threshold, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{GrayImage, Luma};

    fn squares_image() -> GrayImage {
        let mut img = GrayImage::from_pixel(240, 160, Luma([235u8]));
        for (x0, y0) in [(30u32, 40u32), (140, 50)] {
            for y in y0..y0 + 60 {
                for x in x0..x0 + 60 {
                    img.put_pixel(x, y, Luma([25]));
                }
            }
        }
        img
    }

    #[test]
    fn finds_both_squares_with_otsu() {
        let img = squares_image();
        let res = detect_polygons(
            &img,
            &core::ThresholdConfig::default(),
            polygon::PolygonDetectorParams::default(),
        )
        .unwrap();
        assert_eq!(res.polygons.len(), 2);
        // raster order: the left square starts higher
        let first = res.polygons[0].polygon.centroid().unwrap();
        assert!(first.x < 120.0);
        for p in res.polygons() {
            assert!((p.area() - 3600.0).abs() < 40.0, "area {}", p.area());
        }
    }

    #[test]
    fn light_threshold_finds_nothing_on_dark_shapes() {
        // only the background would be foreground, and it touches the border
        let img = squares_image();
        let res = detect_polygons(
            &img,
            &core::ThresholdConfig::Otsu { down: false },
            polygon::PolygonDetectorParams::default(),
        )
        .unwrap();
        assert!(res.polygons.is_empty());
    }

    #[test]
    fn invalid_config_is_reported() {
        let img = squares_image();
        let err = detect_polygons(
            &img,
            &core::ThresholdConfig::default(),
            polygon::PolygonDetectorParams::new(Vec::<usize>::new()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DetectError::Config(polygon::PolygonConfigError::EmptySides)
        ));
    }

    #[test]
    fn raw_buffers_are_checked() {
        let err = gray_image_from_slice(4, 4, &[0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            DetectError::InvalidGrayBuffer {
                expected: 16,
                got: 10
            }
        ));
        assert!(matches!(
            gray_image_from_slice(0, 4, &[]),
            Err(DetectError::InvalidGrayDimensions { .. })
        ));
        let img = squares_image();
        let res = detect_polygons_from_gray_u8(
            img.width(),
            img.height(),
            img.as_raw(),
            &core::ThresholdConfig::Fixed {
                threshold: 128,
                down: true,
            },
            polygon::PolygonDetectorParams::default(),
        )
        .unwrap();
        assert_eq!(res.polygons.len(), 2);
    }
}
