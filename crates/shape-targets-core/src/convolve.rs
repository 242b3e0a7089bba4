//! Kernel convolution with explicit border handling.
//!
//! A filter is a kernel plus a [`BorderMode`]. The border mode is a closed
//! enum and every variant has its own loop; the source pixel type is
//! abstracted by [`PixelSource`] so the same filter runs on `u8` and `f32`
//! images without dynamic dispatch.
//!
//! Kernels are applied as correlations: `dst(x) = sum_i k[i] * src(x + i - offset)`.

use serde::{Deserialize, Serialize};

use crate::{GrayImage, GrayImageView, ImageError, ImageF32};

/// Read access to a single-channel image as `f32`.
pub trait PixelSource {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn value(&self, x: usize, y: usize) -> f32;
}

impl PixelSource for GrayImageView<'_> {
    fn width(&self) -> usize {
        self.width
    }
    fn height(&self) -> usize {
        self.height
    }
    #[inline]
    fn value(&self, x: usize, y: usize) -> f32 {
        self.get(x, y) as f32
    }
}

impl PixelSource for GrayImage {
    fn width(&self) -> usize {
        self.width
    }
    fn height(&self) -> usize {
        self.height
    }
    #[inline]
    fn value(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x] as f32
    }
}

impl PixelSource for ImageF32 {
    fn width(&self) -> usize {
        self.width
    }
    fn height(&self) -> usize {
        self.height
    }
    #[inline]
    fn value(&self, x: usize, y: usize) -> f32 {
        self.get(x, y)
    }
}

/// How pixels near the image border are handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderMode {
    /// Border pixels whose kernel footprint leaves the image are not written.
    Skip,
    /// Coordinates outside the image are clamped to the nearest border pixel.
    #[default]
    Extended,
    /// Only in-image taps are used; the sum is rescaled by the fraction of
    /// kernel weight that was used. Zero-sum kernels are not rescaled.
    Normalized,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Kernel1D {
    pub data: Vec<f32>,
    /// Index of the tap aligned with the output pixel.
    pub offset: usize,
}

impl Kernel1D {
    pub fn new(data: Vec<f32>, offset: usize) -> Result<Self, ImageError> {
        if data.is_empty() || offset >= data.len() {
            return Err(ImageError::InvalidKernel {
                width: data.len(),
                offset,
            });
        }
        Ok(Self { data, offset })
    }

    /// Kernel with an odd number of taps, centered on the middle one.
    pub fn centered(data: Vec<f32>) -> Result<Self, ImageError> {
        let offset = data.len() / 2;
        Self::new(data, offset)
    }

    pub fn width(&self) -> usize {
        self.data.len()
    }
}

/// Square 2D kernel stored row-major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Kernel2D {
    pub width: usize,
    pub data: Vec<f32>,
    pub offset: usize,
}

impl Kernel2D {
    pub fn new(width: usize, data: Vec<f32>, offset: usize) -> Result<Self, ImageError> {
        if width == 0 || data.len() != width * width || offset >= width {
            return Err(ImageError::InvalidKernel { width, offset });
        }
        Ok(Self {
            width,
            data,
            offset,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kernel {
    Horizontal(Kernel1D),
    Vertical(Kernel1D),
    Square(Kernel2D),
}

#[derive(Clone, Copy, Debug)]
struct Tap {
    dx: isize,
    dy: isize,
    w: f32,
}

impl Kernel {
    fn taps(&self) -> Vec<Tap> {
        match self {
            Kernel::Horizontal(k) => k
                .data
                .iter()
                .enumerate()
                .map(|(i, &w)| Tap {
                    dx: i as isize - k.offset as isize,
                    dy: 0,
                    w,
                })
                .collect(),
            Kernel::Vertical(k) => k
                .data
                .iter()
                .enumerate()
                .map(|(i, &w)| Tap {
                    dx: 0,
                    dy: i as isize - k.offset as isize,
                    w,
                })
                .collect(),
            Kernel::Square(k) => k
                .data
                .iter()
                .enumerate()
                .map(|(i, &w)| Tap {
                    dx: (i % k.width) as isize - k.offset as isize,
                    dy: (i / k.width) as isize - k.offset as isize,
                    w,
                })
                .collect(),
        }
    }
}

/// A kernel bound to a border policy.
#[derive(Clone, Debug)]
pub struct ConvolveFilter {
    kernel: Kernel,
    border: BorderMode,
    taps: Vec<Tap>,
}

impl ConvolveFilter {
    pub fn new(kernel: Kernel, border: BorderMode) -> Self {
        let taps = kernel.taps();
        Self {
            kernel,
            border,
            taps,
        }
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn border(&self) -> BorderMode {
        self.border
    }

    /// Convolve `src` into `dst`; both must have the same size.
    pub fn apply<S: PixelSource + ?Sized>(
        &self,
        src: &S,
        dst: &mut ImageF32,
    ) -> Result<(), ImageError> {
        let (w, h) = (src.width(), src.height());
        if w == 0 || h == 0 {
            return Err(ImageError::ZeroSize {
                width: w,
                height: h,
            });
        }
        if dst.width != w || dst.height != h {
            return Err(ImageError::SizeMismatch {
                a_width: w,
                a_height: h,
                b_width: dst.width,
                b_height: dst.height,
            });
        }
        match self.border {
            BorderMode::Skip => convolve_skip(&self.taps, src, dst),
            BorderMode::Extended => convolve_extended(&self.taps, src, dst),
            BorderMode::Normalized => convolve_normalized(&self.taps, src, dst),
        }
        Ok(())
    }

    /// Convolve into a freshly allocated image.
    pub fn process<S: PixelSource + ?Sized>(&self, src: &S) -> Result<ImageF32, ImageError> {
        let mut dst = ImageF32::new(src.width(), src.height());
        self.apply(src, &mut dst)?;
        Ok(dst)
    }
}

/// One-shot convolution.
pub fn convolve<S: PixelSource + ?Sized>(
    kernel: &Kernel,
    src: &S,
    border: BorderMode,
) -> Result<ImageF32, ImageError> {
    ConvolveFilter::new(kernel.clone(), border).process(src)
}

fn convolve_skip<S: PixelSource + ?Sized>(taps: &[Tap], src: &S, dst: &mut ImageF32) {
    let (w, h) = (src.width() as isize, src.height() as isize);
    let min_dx = taps.iter().map(|t| t.dx).min().unwrap_or(0);
    let max_dx = taps.iter().map(|t| t.dx).max().unwrap_or(0);
    let min_dy = taps.iter().map(|t| t.dy).min().unwrap_or(0);
    let max_dy = taps.iter().map(|t| t.dy).max().unwrap_or(0);

    let x0 = (-min_dx).max(0);
    let x1 = w - max_dx.max(0);
    let y0 = (-min_dy).max(0);
    let y1 = h - max_dy.max(0);

    for y in y0..y1 {
        for x in x0..x1 {
            let mut acc = 0.0f32;
            for t in taps {
                acc += t.w * src.value((x + t.dx) as usize, (y + t.dy) as usize);
            }
            dst.set(x as usize, y as usize, acc);
        }
    }
}

fn convolve_extended<S: PixelSource + ?Sized>(taps: &[Tap], src: &S, dst: &mut ImageF32) {
    let (w, h) = (src.width() as isize, src.height() as isize);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for t in taps {
                let sx = (x + t.dx).clamp(0, w - 1) as usize;
                let sy = (y + t.dy).clamp(0, h - 1) as usize;
                acc += t.w * src.value(sx, sy);
            }
            dst.set(x as usize, y as usize, acc);
        }
    }
}

fn convolve_normalized<S: PixelSource + ?Sized>(taps: &[Tap], src: &S, dst: &mut ImageF32) {
    const EPS: f32 = 1e-6;
    let (w, h) = (src.width() as isize, src.height() as isize);
    let total: f32 = taps.iter().map(|t| t.w).sum();
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            let mut used = 0.0f32;
            for t in taps {
                let sx = x + t.dx;
                let sy = y + t.dy;
                if sx < 0 || sy < 0 || sx >= w || sy >= h {
                    continue;
                }
                acc += t.w * src.value(sx as usize, sy as usize);
                used += t.w;
            }
            let v = if total.abs() > EPS && used.abs() > EPS {
                acc * total / used
            } else {
                acc
            };
            dst.set(x as usize, y as usize, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(width: usize, height: usize) -> ImageF32 {
        let mut img = ImageF32::new(width, height);
        for y in 0..height {
            for x in 0..width {
                img.set(x, y, (x + 10 * y) as f32);
            }
        }
        img
    }

    fn box3() -> Kernel {
        Kernel::Horizontal(Kernel1D::centered(vec![1.0, 1.0, 1.0]).unwrap())
    }

    #[test]
    fn invalid_kernels_are_rejected() {
        assert!(Kernel1D::new(vec![], 0).is_err());
        assert!(Kernel1D::new(vec![1.0, 2.0], 2).is_err());
        assert!(Kernel2D::new(2, vec![1.0; 3], 0).is_err());
        assert!(Kernel2D::new(3, vec![1.0; 9], 1).is_ok());
    }

    #[test]
    fn skip_leaves_border_untouched() {
        let src = ramp(5, 2);
        let mut dst = ImageF32::new(5, 2);
        dst.data.iter_mut().for_each(|v| *v = -1.0);
        ConvolveFilter::new(box3(), BorderMode::Skip)
            .apply(&src, &mut dst)
            .unwrap();
        assert_relative_eq!(dst.get(0, 0), -1.0);
        assert_relative_eq!(dst.get(4, 1), -1.0);
        assert_relative_eq!(dst.get(1, 0), 0.0 + 1.0 + 2.0);
        assert_relative_eq!(dst.get(3, 1), 12.0 + 13.0 + 14.0);
    }

    #[test]
    fn extended_clamps_coordinates() {
        let src = ramp(4, 1);
        let out = convolve(&box3(), &src, BorderMode::Extended).unwrap();
        assert_relative_eq!(out.get(0, 0), 0.0 + 0.0 + 1.0);
        assert_relative_eq!(out.get(3, 0), 2.0 + 3.0 + 3.0);
    }

    #[test]
    fn normalized_rescales_missing_weight() {
        let mut src = ImageF32::new(4, 1);
        src.data.iter_mut().for_each(|v| *v = 6.0);
        let out = convolve(&box3(), &src, BorderMode::Normalized).unwrap();
        for x in 0..4 {
            assert_relative_eq!(out.get(x, 0), 18.0);
        }
    }

    #[test]
    fn vertical_and_square_kernels_agree_with_separable_result() {
        let src = ramp(6, 6);
        let k = Kernel1D::centered(vec![1.0, 2.0, 1.0]).unwrap();
        let h = convolve(&Kernel::Horizontal(k.clone()), &src, BorderMode::Extended).unwrap();
        let hv = convolve(&Kernel::Vertical(k), &h, BorderMode::Extended).unwrap();

        let square = Kernel2D::new(
            3,
            vec![1.0, 2.0, 1.0, 2.0, 4.0, 2.0, 1.0, 2.0, 1.0],
            1,
        )
        .unwrap();
        let direct = convolve(&Kernel::Square(square), &src, BorderMode::Extended).unwrap();
        for (a, b) in hv.data.iter().zip(&direct.data) {
            assert_relative_eq!(*a, *b, epsilon = 1e-4);
        }
    }

    #[test]
    fn u8_and_f32_sources_give_the_same_result() {
        let bytes: Vec<u8> = (0..12).map(|v| v * 10).collect();
        let view = GrayImageView::new(4, 3, &bytes).unwrap();
        let floats = ImageF32 {
            width: 4,
            height: 3,
            data: bytes.iter().map(|&v| v as f32).collect(),
        };
        let filter = ConvolveFilter::new(box3(), BorderMode::Normalized);
        assert_eq!(
            filter.process(&view).unwrap(),
            filter.process(&floats).unwrap()
        );
    }

    #[test]
    fn apply_checks_destination_size() {
        let src = ramp(4, 4);
        let mut dst = ImageF32::new(3, 4);
        let err = ConvolveFilter::new(box3(), BorderMode::Extended)
            .apply(&src, &mut dst)
            .unwrap_err();
        assert!(matches!(err, ImageError::SizeMismatch { .. }));
    }
}
