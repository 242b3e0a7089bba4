//! Snapping a straight segment onto the nearby intensity edge.
//!
//! Probes are placed on a grid along the segment (samples) and across it
//! (whole-pixel offsets along the normal). Each probe is weighted by the
//! absolute intensity difference half a pixel to either side, and a weighted
//! least-squares line `offset = a + b * along` is fitted to the probes.

use nalgebra::{Matrix2, Point2, Vector2};
use shape_targets_core::{sample_bilinear, GrayImageView};

/// Below this total weight the fit is considered unsupported.
const MIN_TOTAL_WEIGHT: f64 = 1e-3;
/// Fitted lines turning further than ~45 degrees from the input are rejected.
const MIN_DIRECTION_AGREEMENT: f32 = std::f32::consts::FRAC_1_SQRT_2;
/// Parallel test on unit directions (sine of the angle).
const MIN_INTERSECTION_SINE: f32 = 1e-3;

/// Infinite line through `point` with unit direction `dir`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Line {
    pub point: Point2<f32>,
    pub dir: Vector2<f32>,
}

impl Line {
    #[inline]
    pub fn project(&self, p: Point2<f32>) -> Point2<f32> {
        self.point + self.dir * (p - self.point).dot(&self.dir)
    }

    pub fn intersect(&self, other: &Line) -> Option<Point2<f32>> {
        let denom = self.dir.perp(&other.dir);
        if denom.abs() < MIN_INTERSECTION_SINE {
            return None;
        }
        let lambda = (other.point - self.point).perp(&other.dir) / denom;
        Some(self.point + self.dir * lambda)
    }
}

/// Probe layout for [`snap_segment`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct SnapProbes {
    /// Unsampled length at the start of the segment.
    pub skip_start: f32,
    /// Unsampled length at the end of the segment.
    pub skip_end: f32,
    pub samples: usize,
    pub radius: usize,
}

/// Fit a line to the intensity edge near the segment `a -> b`.
///
/// Returns `None` when the sampled stretch is shorter than a pixel, when
/// there is no gradient support, or when the fit leaves the neighbourhood of
/// the input direction.
pub(crate) fn snap_segment(
    gray: &GrayImageView<'_>,
    a: Point2<f32>,
    b: Point2<f32>,
    probes: SnapProbes,
) -> Option<Line> {
    let d = b - a;
    let len = d.norm();
    let usable = len - probes.skip_start - probes.skip_end;
    if usable.is_nan() || usable < 1.0 || probes.samples < 2 {
        return None;
    }
    let t = d / len;
    let n = Vector2::new(-t.y, t.x);
    let r = probes.radius as i32;

    // normal equations of the weighted fit, in f64
    let (mut sw, mut ss, mut sss, mut so, mut sso) = (0.0f64, 0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for i in 0..probes.samples {
        let s = probes.skip_start + usable * i as f32 / (probes.samples - 1) as f32;
        let p = a + t * s;
        for k in -r..=r {
            let q = p + n * k as f32;
            let hi = sample_bilinear(gray, q.x + 0.5 * n.x, q.y + 0.5 * n.y);
            let lo = sample_bilinear(gray, q.x - 0.5 * n.x, q.y - 0.5 * n.y);
            let w = (hi - lo).abs() as f64;
            if w == 0.0 {
                continue;
            }
            let (s, o) = (s as f64, k as f64);
            sw += w;
            ss += w * s;
            sss += w * s * s;
            so += w * o;
            sso += w * s * o;
        }
    }
    if sw < MIN_TOTAL_WEIGHT {
        return None;
    }

    let lhs = Matrix2::new(sw, ss, ss, sss);
    let rhs = Vector2::new(so, sso);
    let coef = lhs.try_inverse()? * rhs;
    let (offset, slope) = (coef.x as f32, coef.y as f32);
    if !offset.is_finite() || !slope.is_finite() {
        return None;
    }

    let dir = (t + n * slope).normalize();
    if dir.dot(&t) < MIN_DIRECTION_AGREEMENT {
        return None;
    }
    let mid = probes.skip_start + 0.5 * usable;
    let point = a + t * mid + n * (offset + slope * mid);
    Some(Line { point, dir })
}
