//! Polygon approximation of a pixel contour by iterative split and merge.
//!
//! A pass first splits every segment whose farthest contour point lies
//! beyond the split tolerance, then drops vertices cheapest first: a vertex
//! goes when the boundary barely turns there or when the chord joining its
//! neighbours stays within the split tolerance of the contour it replaces.
//! Passes repeat until one changes nothing or the pass budget is spent.

use nalgebra::{Point2, Vector2};

use crate::contour::Contour;
use crate::params::PolygonDetectorParams;
use crate::polygon::Polygon;
use crate::types::RejectReason;

/// Vertex selection produced by [`split_merge`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitMergeFit {
    /// Indices into the contour, in boundary order.
    pub vertices: Vec<usize>,
    pub passes: usize,
    /// `false` when the pass budget ran out while still changing.
    pub converged: bool,
}

/// Run split and merge on a closed point loop.
///
/// `split_tol_px` is the point-to-segment distance above which a segment is
/// split, and below which a vertex may be merged away; `merge_tol_rad` the
/// turn angle at or below which a vertex is removed. Never merges below
/// three vertices.
pub fn split_merge(
    points: &[Point2<i32>],
    split_tol_px: f32,
    merge_tol_rad: f32,
    max_passes: usize,
) -> SplitMergeFit {
    let mut vertices = initial_vertices(points);
    let mut passes = 0;
    let mut converged = false;

    while passes < max_passes {
        passes += 1;
        let mut changed = false;
        if let Some(split) = split_pass(points, &vertices, split_tol_px) {
            vertices = split;
            changed = true;
        }
        changed |= merge_pass(points, &mut vertices, split_tol_px, merge_tol_rad);
        if !changed {
            converged = true;
            break;
        }
    }

    SplitMergeFit {
        vertices,
        passes,
        converged,
    }
}

/// Fit a polygon to `contour` and apply the size, side-count and convexity
/// gates.
pub fn fit_polygon(
    contour: &Contour,
    image_width: usize,
    params: &PolygonDetectorParams,
) -> Result<Polygon, RejectReason> {
    let size = contour.bounding_size();
    if (size as f32) < params.min_contour_size_px(image_width) {
        return Err(RejectReason::TooSmall { size });
    }

    let fit = split_merge(
        &contour.points,
        params.split_tolerance_px(image_width),
        params.merge_tolerance_rad(),
        params.iterations,
    );
    if !fit.converged {
        log::trace!(
            "split/merge stopped after {} passes with {} vertices",
            fit.passes,
            fit.vertices.len()
        );
    }

    let sides = fit.vertices.len();
    if !params.allows_sides(sides) {
        return Err(RejectReason::SideCount { sides });
    }

    let polygon = Polygon::new(
        fit.vertices
            .iter()
            .map(|&i| {
                let p = contour.points[i];
                Point2::new(p.x as f32, p.y as f32)
            })
            .collect(),
    );
    if params.convex_only && !polygon.is_convex() {
        return Err(RejectReason::NotConvex);
    }
    Ok(polygon)
}

/// Extreme points of the contour (first one found on ties), in boundary
/// order. Falls back to the start plus the farthest point from it.
fn initial_vertices(points: &[Point2<i32>]) -> Vec<usize> {
    if points.is_empty() {
        return Vec::new();
    }
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (0, 0, 0, 0);
    for (i, p) in points.iter().enumerate() {
        if p.x < points[min_x].x {
            min_x = i;
        }
        if p.x > points[max_x].x {
            max_x = i;
        }
        if p.y < points[min_y].y {
            min_y = i;
        }
        if p.y > points[max_y].y {
            max_y = i;
        }
    }
    let mut idx = vec![min_x, max_x, min_y, max_y];
    idx.sort_unstable();
    idx.dedup();
    if idx.len() >= 3 {
        return idx;
    }

    let origin = to_f32(points[0]);
    let mut far = 0;
    let mut best = 0.0f32;
    for (i, p) in points.iter().enumerate() {
        let d = (to_f32(*p) - origin).norm_squared();
        if d > best {
            best = d;
            far = i;
        }
    }
    if far == 0 {
        vec![0]
    } else {
        vec![0, far]
    }
}

fn split_pass(points: &[Point2<i32>], vertices: &[usize], tol: f32) -> Option<Vec<usize>> {
    let m = vertices.len();
    let mut out = Vec::with_capacity(2 * m);
    let mut changed = false;
    for k in 0..m {
        let a = vertices[k];
        let b = vertices[(k + 1) % m];
        out.push(a);
        if let Some((idx, dist)) = farthest_between(points, a, b) {
            if dist > tol {
                out.push(idx);
                changed = true;
            }
        }
    }
    changed.then_some(out)
}

/// Farthest contour point strictly between `a` and `b`, walking forward.
fn farthest_between(points: &[Point2<i32>], a: usize, b: usize) -> Option<(usize, f32)> {
    let n = points.len();
    let span = match (b + n - a) % n {
        0 => n,
        s => s,
    };
    if span < 2 {
        return None;
    }
    let pa = to_f32(points[a]);
    let pb = to_f32(points[b]);
    let mut best: Option<(usize, f32)> = None;
    for s in 1..span {
        let i = (a + s) % n;
        let d = distance_to_segment_line(to_f32(points[i]), pa, pb);
        if best.is_none_or(|(_, bd)| d > bd) {
            best = Some((i, d));
        }
    }
    best
}

/// Removes one vertex at a time, always the one whose neighbour chord
/// deviates least from the contour. A split landing a few pixels off a
/// corner leaves a short stub that turns sharply at both ends; the chord
/// test is what clears it.
fn merge_pass(
    points: &[Point2<i32>],
    vertices: &mut Vec<usize>,
    split_tol: f32,
    merge_tol: f32,
) -> bool {
    let mut changed = false;
    while vertices.len() > 3 {
        let m = vertices.len();
        let mut best: Option<(usize, f32)> = None;
        for k in 0..m {
            let prev = vertices[(k + m - 1) % m];
            let cur = vertices[k];
            let next = vertices[(k + 1) % m];
            let deviation = farthest_between(points, prev, next).map_or(0.0, |(_, d)| d);
            let (a, b, c) = (to_f32(points[prev]), to_f32(points[cur]), to_f32(points[next]));
            let mergeable = deviation <= split_tol || turn_angle(b - a, c - b) <= merge_tol;
            if mergeable && best.is_none_or(|(_, bd)| deviation < bd) {
                best = Some((k, deviation));
            }
        }
        let Some((k, _)) = best else {
            break;
        };
        vertices.remove(k);
        changed = true;
    }
    changed
}

/// Unsigned angle between consecutive segment directions, in `[0, PI]`.
#[inline]
fn turn_angle(u: Vector2<f32>, v: Vector2<f32>) -> f32 {
    if u.norm_squared() == 0.0 || v.norm_squared() == 0.0 {
        return 0.0;
    }
    u.perp(&v).abs().atan2(u.dot(&v))
}

/// Distance from `p` to the line through `a` and `b`; plain point distance
/// when `a == b`.
#[inline]
fn distance_to_segment_line(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let ab = b - a;
    let len = ab.norm();
    if len == 0.0 {
        return (p - a).norm();
    }
    ab.perp(&(p - a)).abs() / len
}

#[inline]
fn to_f32(p: Point2<i32>) -> Point2<f32> {
    Point2::new(p.x as f32, p.y as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pixel loop around the rectangle `[x0, x1] x [y0, y1]`, clockwise on
    /// screen from the top-left corner.
    fn rect_loop(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Point2<i32>> {
        let mut pts = Vec::new();
        for x in x0..x1 {
            pts.push(Point2::new(x, y0));
        }
        for y in y0..y1 {
            pts.push(Point2::new(x1, y));
        }
        for x in (x0 + 1..=x1).rev() {
            pts.push(Point2::new(x, y1));
        }
        for y in (y0 + 1..=y1).rev() {
            pts.push(Point2::new(x0, y));
        }
        pts
    }

    #[test]
    fn rectangle_fits_to_its_corners() {
        let pts = rect_loop(10, 20, 60, 50);
        let fit = split_merge(&pts, 1.5, 0.2, 20);
        assert!(fit.converged);
        let mut corners: Vec<_> = fit.vertices.iter().map(|&i| pts[i]).collect();
        corners.sort_by_key(|p| (p.y, p.x));
        assert_eq!(
            corners,
            vec![
                Point2::new(10, 20),
                Point2::new(60, 20),
                Point2::new(10, 50),
                Point2::new(60, 50)
            ]
        );
        // boundary order is kept
        assert!(fit.vertices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn collinear_vertices_are_merged() {
        let pts = rect_loop(0, 0, 40, 40);
        let mut vertices = vec![0, 20, 40, 80, 120];
        assert!(merge_pass(&pts, &mut vertices, 1.0, 0.1));
        assert_eq!(vertices, vec![0, 40, 80, 120]);
        // no further merge below three vertices
        let mut tri = vec![0, 40, 80];
        assert!(!merge_pass(&pts, &mut tri, 100.0, 4.0));
        assert_eq!(tri.len(), 3);
    }

    #[test]
    fn stub_next_to_a_corner_is_merged() {
        // (4, 0) and (0, 2) cut the top-left corner; both turn sharply
        let pts = rect_loop(0, 0, 40, 40);
        assert_eq!(pts[4], Point2::new(4, 0));
        assert_eq!(pts[158], Point2::new(0, 2));
        let mut vertices = vec![4, 40, 80, 120, 158];
        assert!(merge_pass(&pts, &mut vertices, 2.5, 0.2));
        assert_eq!(vertices, vec![40, 80, 120, 158]);

        // the chord test is what removes it
        let mut angle_only = vec![4, 40, 80, 120, 158];
        assert!(!merge_pass(&pts, &mut angle_only, 0.5, 0.2));
        assert_eq!(angle_only.len(), 5);
    }

    #[test]
    fn cheapest_vertex_goes_first() {
        let pts = rect_loop(0, 0, 40, 40);
        // 20 sits on the top edge, 60 on the right edge: both are free to drop
        let mut vertices = vec![0, 20, 40, 60, 80, 120];
        assert!(merge_pass(&pts, &mut vertices, 1.0, 0.1));
        assert_eq!(vertices, vec![0, 40, 80, 120]);
    }

    #[test]
    fn split_picks_first_farthest_point() {
        let pts = vec![
            Point2::new(0, 0),
            Point2::new(1, 2),
            Point2::new(2, 2),
            Point2::new(3, 0),
            Point2::new(2, -1),
        ];
        assert_eq!(farthest_between(&pts, 0, 3), Some((1, 2.0)));
        assert_eq!(farthest_between(&pts, 3, 0), Some((4, 1.0)));
        assert_eq!(farthest_between(&pts, 0, 1), None);
    }

    #[test]
    fn fit_polygon_applies_gates() {
        let contour = Contour {
            points: rect_loop(10, 10, 90, 90),
        };
        let params = PolygonDetectorParams::new([4]);
        let poly = fit_polygon(&contour, 200, &params).unwrap();
        assert_eq!(poly.len(), 4);
        assert!(poly.is_convex());

        let tri_only = PolygonDetectorParams::new([3]);
        assert_eq!(
            fit_polygon(&contour, 200, &tri_only),
            Err(RejectReason::SideCount { sides: 4 })
        );

        let small = Contour {
            points: rect_loop(10, 10, 13, 13),
        };
        assert_eq!(
            fit_polygon(&small, 200, &params),
            Err(RejectReason::TooSmall { size: 4 })
        );
    }

    #[test]
    fn turn_angle_is_unsigned() {
        let a = turn_angle(Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0));
        let b = turn_angle(Vector2::new(1.0, 0.0), Vector2::new(0.0, -1.0));
        assert!((a - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!((a - b).abs() < 1e-6);
        assert_eq!(turn_angle(Vector2::zeros(), Vector2::new(1.0, 0.0)), 0.0);
    }
}
