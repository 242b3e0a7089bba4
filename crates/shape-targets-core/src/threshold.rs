//! Grayscale to binary conversion.
//!
//! The polygon detector only consumes masks; these helpers exist so callers
//! (and the CLI) can produce one without another dependency.

use serde::{Deserialize, Serialize};

use crate::{BinaryImage, GrayImageView, ImageError};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Thresholding policy. With `down = true`, pixels darker than the threshold
/// become foreground (dark shapes on a light background).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThresholdConfig {
    Fixed { threshold: u8, down: bool },
    Otsu { down: bool },
    /// Mean of a `(2r+1)^2` window, shifted by `bias`.
    LocalMean { radius: usize, bias: f32, down: bool },
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self::Otsu { down: true }
    }
}

/// Binarize `src` according to `cfg`. Fails only when the view's size and
/// buffer disagree.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src), fields(width = src.width, height = src.height))
)]
pub fn binarize(
    src: &GrayImageView<'_>,
    cfg: &ThresholdConfig,
) -> Result<BinaryImage, ImageError> {
    src.validate()?;
    let mask = match *cfg {
        ThresholdConfig::Fixed { threshold, down } => global(src, threshold as f32, down),
        ThresholdConfig::Otsu { down } => {
            let t = otsu_threshold(src.data);
            log::debug!("otsu threshold = {t}");
            global(src, t as f32 + 0.5, down)
        }
        ThresholdConfig::LocalMean { radius, bias, down } => local_mean(src, radius, bias, down),
    };
    Ok(mask)
}

fn global(src: &GrayImageView<'_>, threshold: f32, down: bool) -> BinaryImage {
    let mut out = BinaryImage::new(src.width, src.height);
    for (dst, &v) in out.data.iter_mut().zip(src.data) {
        *dst = is_foreground(v as f32, threshold, down) as u8;
    }
    out
}

#[inline]
fn is_foreground(v: f32, threshold: f32, down: bool) -> bool {
    if down {
        v < threshold
    } else {
        v > threshold
    }
}

fn local_mean(src: &GrayImageView<'_>, radius: usize, bias: f32, down: bool) -> BinaryImage {
    let (w, h) = (src.width, src.height);
    // Summed-area table with a zero row/column in front.
    let stride = w + 1;
    let mut sat = vec![0u64; stride * (h + 1)];
    for y in 0..h {
        let mut row = 0u64;
        for x in 0..w {
            row += src.get(x, y) as u64;
            sat[(y + 1) * stride + x + 1] = sat[y * stride + x + 1] + row;
        }
    }

    let mut out = BinaryImage::new(w, h);
    for y in 0..h {
        let y0 = y.saturating_sub(radius);
        let y1 = y.saturating_add(radius).saturating_add(1).min(h);
        for x in 0..w {
            let x0 = x.saturating_sub(radius);
            let x1 = x.saturating_add(radius).saturating_add(1).min(w);
            let sum = sat[y1 * stride + x1] + sat[y0 * stride + x0]
                - sat[y0 * stride + x1]
                - sat[y1 * stride + x0];
            let n = ((x1 - x0) * (y1 - y0)) as f32;
            let threshold = sum as f32 / n - if down { bias } else { -bias };
            out.set(x, y, is_foreground(src.get(x, y) as f32, threshold, down));
        }
    }
    out
}

/// Otsu threshold over a set of intensities.
pub fn otsu_threshold(samples: &[u8]) -> u8 {
    if samples.is_empty() {
        return 127;
    }

    let (min_v, max_v) = samples
        .iter()
        .fold((255u8, 0u8), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if min_v == max_v {
        return min_v;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return ((min_v as u16 + max_v as u16) / 2) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}
