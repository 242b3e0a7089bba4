use crate::convolve::{BorderMode, ConvolveFilter, Kernel, Kernel1D, PixelSource};
use crate::{ImageError, ImageF32};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Image derivatives along x and y.
#[derive(Clone, Debug)]
pub struct Gradient {
    pub dx: ImageF32,
    pub dy: ImageF32,
}

impl Gradient {
    pub fn width(&self) -> usize {
        self.dx.width
    }

    pub fn height(&self) -> usize {
        self.dx.height
    }

    /// Per-pixel Euclidean gradient norm.
    pub fn magnitude(&self) -> ImageF32 {
        let data = self
            .dx
            .data
            .iter()
            .zip(&self.dy.data)
            .map(|(gx, gy)| gx.hypot(*gy))
            .collect();
        ImageF32 {
            width: self.dx.width,
            height: self.dx.height,
            data,
        }
    }
}

fn sobel_kernels() -> Result<(Kernel1D, Kernel1D), ImageError> {
    // Scaled so an ideal step of height `d` peaks at `d / 2`.
    let derivative = Kernel1D::centered(vec![-0.5, 0.0, 0.5])?;
    let smoothing = Kernel1D::centered(vec![0.25, 0.5, 0.25])?;
    Ok((derivative, smoothing))
}

/// Separable Sobel gradient with extended borders.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src), fields(width = src.width(), height = src.height()))
)]
pub fn sobel_gradient<S: PixelSource + ?Sized>(src: &S) -> Result<Gradient, ImageError> {
    let (derivative, smoothing) = sobel_kernels()?;
    let border = BorderMode::Extended;

    let d_h = ConvolveFilter::new(Kernel::Horizontal(derivative.clone()), border);
    let s_v = ConvolveFilter::new(Kernel::Vertical(smoothing.clone()), border);
    let dx = s_v.process(&d_h.process(src)?)?;

    let s_h = ConvolveFilter::new(Kernel::Horizontal(smoothing), border);
    let d_v = ConvolveFilter::new(Kernel::Vertical(derivative), border);
    let dy = d_v.process(&s_h.process(src)?)?;

    Ok(Gradient { dx, dy })
}
