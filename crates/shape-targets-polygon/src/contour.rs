//! External boundary tracing of 8-connected foreground regions.
//!
//! Components are visited in raster order of their first pixel (the
//! top-most, left-most one). Each boundary is followed with Moore-neighbour
//! tracing and stops once the start pixel is left again in the same
//! direction as the first step, so thin and self-touching outlines are
//! walked completely. Holes are not traced.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use shape_targets_core::{BinaryImageView, ImageError};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Boundaries with fewer points are skipped (single pixels, specks).
pub const MIN_CONTOUR_POINTS: usize = 4;

/// Moore neighbourhood, clockwise on screen starting east.
const DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const WEST: usize = 4;

/// Closed loop of boundary pixels, clockwise on screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour {
    pub points: Vec<Point2<i32>>,
}

/// Inclusive pixel bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl PixelBounds {
    pub fn width(&self) -> i32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y + 1
    }
}

impl Contour {
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn bounds(&self) -> Option<PixelBounds> {
        let first = self.points.first()?;
        let init = PixelBounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        Some(self.points.iter().fold(init, |b, p| PixelBounds {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
        }))
    }

    /// Larger side of the bounding box, in pixels.
    pub fn bounding_size(&self) -> usize {
        self.bounds()
            .map(|b| b.width().max(b.height()) as usize)
            .unwrap_or(0)
    }

    pub fn touches_border(&self, width: usize, height: usize) -> bool {
        let (w, h) = (width as i32, height as i32);
        self.points
            .iter()
            .any(|p| p.x <= 0 || p.y <= 0 || p.x >= w - 1 || p.y >= h - 1)
    }
}

/// Trace the external boundary of every foreground component.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(binary), fields(width = binary.width, height = binary.height))
)]
pub fn extract_contours(binary: &BinaryImageView<'_>) -> Result<Vec<Contour>, ImageError> {
    binary.validate()?;
    let (w, h) = (binary.width, binary.height);

    let mut visited = vec![false; w * h];
    let mut stack = Vec::new();
    let mut contours = Vec::new();
    let mut skipped = 0usize;

    for y in 0..h {
        for x in 0..w {
            if visited[y * w + x] || !binary.is_set(x, y) {
                continue;
            }
            let points = trace_boundary(binary, Point2::new(x as i32, y as i32));
            mark_component(binary, x, y, &mut visited, &mut stack);
            if points.len() < MIN_CONTOUR_POINTS {
                skipped += 1;
                continue;
            }
            contours.push(Contour { points });
        }
    }

    log::debug!(
        "extracted {} contours ({} degenerate components skipped)",
        contours.len(),
        skipped
    );
    Ok(contours)
}

fn trace_boundary(binary: &BinaryImageView<'_>, start: Point2<i32>) -> Vec<Point2<i32>> {
    let mut points = vec![start];
    let mut p = start;
    // raster order guarantees the west neighbour of the first pixel is background
    let mut backtrack = WEST;
    let mut first_step: Option<Point2<i32>> = None;
    let max_steps = 4 * binary.width * binary.height + 8;

    for _ in 0..max_steps {
        let Some((dir, next)) = next_boundary_pixel(binary, p, backtrack) else {
            break; // isolated pixel
        };
        if p == start {
            match first_step {
                None => first_step = Some(next),
                Some(f) if f == next => {
                    points.pop();
                    break;
                }
                Some(_) => {}
            }
        }
        // the last background pixel examined, seen from `next`
        backtrack = (dir + 6 - dir % 2) % 8;
        p = next;
        points.push(next);
    }
    points
}

#[inline]
fn next_boundary_pixel(
    binary: &BinaryImageView<'_>,
    p: Point2<i32>,
    backtrack: usize,
) -> Option<(usize, Point2<i32>)> {
    (1..=8).find_map(|i| {
        let dir = (backtrack + i) % 8;
        let (dx, dy) = DIRS[dir];
        let q = Point2::new(p.x + dx, p.y + dy);
        binary.is_set_i32(q.x, q.y).then_some((dir, q))
    })
}

fn mark_component(
    binary: &BinaryImageView<'_>,
    x: usize,
    y: usize,
    visited: &mut [bool],
    stack: &mut Vec<(usize, usize)>,
) {
    let w = binary.width;
    visited[y * w + x] = true;
    stack.clear();
    stack.push((x, y));
    while let Some((cx, cy)) = stack.pop() {
        for (dx, dy) in DIRS {
            let nx = cx as i32 + dx;
            let ny = cy as i32 + dy;
            if !binary.is_set_i32(nx, ny) {
                continue;
            }
            let idx = ny as usize * w + nx as usize;
            if !visited[idx] {
                visited[idx] = true;
                stack.push((nx as usize, ny as usize));
            }
        }
    }
}
