use nalgebra::Point2;
use shape_targets_core::GrayImageView;

use super::snap::{snap_segment, Line, SnapProbes};
use super::{RefineOutcome, RefineStatus};
use crate::params::RefineLinesParams;
use crate::polygon::Polygon;

/// Snap every edge onto the image and rebuild the vertices as intersections
/// of adjacent edge lines.
///
/// Each edge is fitted independently: snap, project its endpoints onto the
/// fitted line, repeat until the endpoints settle. Any edge without support,
/// or two adjacent edges that are parallel, leave the polygon unchanged.
pub fn refine_with_lines(
    polygon: &Polygon,
    gray: &GrayImageView<'_>,
    params: &RefineLinesParams,
) -> RefineOutcome {
    let n = polygon.len();
    if n < 3 {
        return RefineOutcome::degenerate(polygon);
    }
    let probes = SnapProbes {
        skip_start: params.corner_offset,
        skip_end: params.corner_offset,
        samples: params.line_samples,
        radius: params.sample_radius,
    };

    let mut lines = Vec::with_capacity(n);
    let mut all_converged = true;
    for (a, b) in polygon.edges() {
        let Some((line, converged)) = fit_edge(gray, a, b, probes, params) else {
            log::trace!("line refinement: no edge support near {a:?} -> {b:?}");
            return RefineOutcome::degenerate(polygon);
        };
        all_converged &= converged;
        lines.push(line);
    }

    let mut vertices = Vec::with_capacity(n);
    for i in 0..n {
        let prev = &lines[(i + n - 1) % n];
        match prev.intersect(&lines[i]) {
            Some(v) => vertices.push(v),
            None => return RefineOutcome::degenerate(polygon),
        }
    }

    RefineOutcome {
        polygon: Polygon::new(vertices),
        status: if all_converged {
            RefineStatus::Converged
        } else {
            RefineStatus::MaxIterations
        },
    }
}

/// Iterated snap of one edge. Keeps the last successful fit if a later
/// iteration loses support.
fn fit_edge(
    gray: &GrayImageView<'_>,
    mut a: Point2<f32>,
    mut b: Point2<f32>,
    probes: SnapProbes,
    params: &RefineLinesParams,
) -> Option<(Line, bool)> {
    let mut best = None;
    for _ in 0..params.max_iterations {
        let Some(line) = snap_segment(gray, a, b, probes) else {
            break;
        };
        let (a2, b2) = (line.project(a), line.project(b));
        let moved = (a2 - a).norm().max((b2 - b).norm());
        a = a2;
        b = b2;
        best = Some(line);
        if moved < params.converge_tol_px {
            return best.map(|l| (l, true));
        }
    }
    best.map(|l| (l, false))
}
