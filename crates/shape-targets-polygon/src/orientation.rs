use crate::polygon::Polygon;

/// Put `polygon` into canonical vertex order.
///
/// The winding is set to clockwise on screen (positive shoelace area with y
/// pointing down) when `clockwise` is true, counter-clockwise otherwise. The
/// sequence is then rotated so it starts at the top-most vertex, left-most
/// among ties. Normalizing twice gives the same result as normalizing once.
pub fn normalize_orientation(polygon: &Polygon, clockwise: bool) -> Polygon {
    let mut vertices = polygon.vertices.clone();
    if vertices.len() < 3 {
        return Polygon::new(vertices);
    }
    let area = polygon.signed_area();
    if area != 0.0 && (area > 0.0) != clockwise {
        vertices.reverse();
    }
    let start = vertices
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    vertices.rotate_left(start);
    Polygon::new(vertices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    fn diamond_ccw() -> Polygon {
        // counter-clockwise on screen, starting at the right corner
        Polygon::new(vec![
            Point2::new(20.0, 10.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 10.0),
            Point2::new(10.0, 20.0),
        ])
    }

    #[test]
    fn clockwise_starts_at_top() {
        let p = normalize_orientation(&diamond_ccw(), true);
        assert!(p.signed_area() > 0.0);
        assert_eq!(
            p.vertices,
            vec![
                Point2::new(10.0, 0.0),
                Point2::new(20.0, 10.0),
                Point2::new(10.0, 20.0),
                Point2::new(0.0, 10.0),
            ]
        );
    }

    #[test]
    fn both_windings_share_the_start_vertex() {
        let cw = normalize_orientation(&diamond_ccw(), true);
        let ccw = normalize_orientation(&diamond_ccw(), false);
        assert!(ccw.signed_area() < 0.0);
        assert_eq!(cw.vertices[0], ccw.vertices[0]);
        let mut tail: Vec<_> = cw.vertices[1..].to_vec();
        tail.reverse();
        assert_eq!(&ccw.vertices[1..], tail.as_slice());
    }

    #[test]
    fn top_edge_ties_break_to_the_left() {
        let sq = Polygon::new(vec![
            Point2::new(5.0, 5.0),
            Point2::new(5.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 5.0),
        ]);
        let p = normalize_orientation(&sq, true);
        assert_eq!(p.vertices[0], Point2::new(1.0, 1.0));
        assert_eq!(p.vertices[1], Point2::new(5.0, 1.0));
    }

    #[test]
    fn normalization_is_idempotent() {
        for clockwise in [true, false] {
            let once = normalize_orientation(&diamond_ccw(), clockwise);
            assert_eq!(normalize_orientation(&once, clockwise), once);
        }
    }
}
