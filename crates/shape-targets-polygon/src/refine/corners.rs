use nalgebra::{Point2, Vector2};
use shape_targets_core::GrayImageView;

use super::snap::{snap_segment, Line, SnapProbes};
use super::{RefineOutcome, RefineStatus};
use crate::params::RefineCornersParams;
use crate::polygon::Polygon;

enum CornerFit {
    Converged(Point2<f32>),
    MaxIterations(Point2<f32>),
    Failed,
}

/// Refine each corner from short stretches of its two incident edges.
///
/// Corners are independent: one that cannot be fitted, or that would move
/// further than `max_corner_change_px`, keeps its input position and marks
/// the outcome [`RefineStatus::Degenerate`]. The others are still refined.
pub fn refine_with_corners(
    polygon: &Polygon,
    gray: &GrayImageView<'_>,
    params: &RefineCornersParams,
) -> RefineOutcome {
    let n = polygon.len();
    if n < 3 {
        return RefineOutcome::degenerate(polygon);
    }

    let mut vertices = Vec::with_capacity(n);
    let mut failed = 0usize;
    let mut all_converged = true;
    for i in 0..n {
        let corner = polygon.vertex(i);
        let prev = polygon.vertex(i + n - 1);
        let next = polygon.vertex(i + 1);
        match fit_corner(gray, prev, corner, next, params) {
            CornerFit::Converged(c) => vertices.push(c),
            CornerFit::MaxIterations(c) => {
                all_converged = false;
                vertices.push(c);
            }
            CornerFit::Failed => {
                failed += 1;
                vertices.push(corner);
            }
        }
    }

    let status = if failed > 0 {
        log::trace!("corner refinement: {failed} of {n} corners kept unrefined");
        RefineStatus::Degenerate
    } else if all_converged {
        RefineStatus::Converged
    } else {
        RefineStatus::MaxIterations
    };
    RefineOutcome {
        polygon: Polygon::new(vertices),
        status,
    }
}

fn fit_corner(
    gray: &GrayImageView<'_>,
    prev: Point2<f32>,
    corner: Point2<f32>,
    next: Point2<f32>,
    params: &RefineCornersParams,
) -> CornerFit {
    let (Some(mut to_prev), Some(mut to_next)) = (
        (prev - corner).try_normalize(f32::EPSILON),
        (next - corner).try_normalize(f32::EPSILON),
    ) else {
        return CornerFit::Failed;
    };
    // stay within the first half of each edge
    let reach_prev = params.end_point_distance.min(0.5 * (prev - corner).norm());
    let reach_next = params.end_point_distance.min(0.5 * (next - corner).norm());
    let probes = SnapProbes {
        skip_start: params.corner_offset,
        skip_end: 0.0,
        samples: params.line_samples,
        radius: params.sample_radius,
    };

    let mut current = corner;
    for _ in 0..params.max_iterations {
        let side_prev = snap_segment(gray, current, current + to_prev * reach_prev, probes);
        let side_next = snap_segment(gray, current, current + to_next * reach_next, probes);
        let (Some(lp), Some(ln)) = (side_prev, side_next) else {
            return CornerFit::Failed;
        };
        let Some(refined) = lp.intersect(&ln) else {
            return CornerFit::Failed;
        };
        if (refined - corner).norm() > params.max_corner_change_px {
            return CornerFit::Failed;
        }
        to_prev = oriented(&lp, prev - refined);
        to_next = oriented(&ln, next - refined);
        let moved = (refined - current).norm();
        current = refined;
        if moved < params.converge_tol_px {
            return CornerFit::Converged(current);
        }
    }
    CornerFit::MaxIterations(current)
}

/// Line direction flipped to point along `toward`.
#[inline]
fn oriented(line: &Line, toward: Vector2<f32>) -> Vector2<f32> {
    if line.dir.dot(&toward) < 0.0 {
        -line.dir
    } else {
        line.dir
    }
}
