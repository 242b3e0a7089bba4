//! Detect polygons in an image and print their vertices.
//!
//! Usage: `cargo run --example detect_polygons -- <image> [sides...]`

use std::env;

use shape_targets::detect::detect_polygons;
use shape_targets::{PolygonDetectorParams, ThresholdConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = shape_targets::init_from_env(log::LevelFilter::Info);

    let mut args = env::args().skip(1);
    let path = args
        .next()
        .ok_or("usage: detect_polygons <image> [sides...]")?;
    let mut sides: Vec<usize> = args.map(|s| s.parse()).collect::<Result<_, _>>()?;
    if sides.is_empty() {
        sides.push(4);
    }

    let img = image::open(&path)?.to_luma8();
    let result = detect_polygons(
        &img,
        &ThresholdConfig::default(),
        PolygonDetectorParams::new(sides),
    )?;

    for found in &result.polygons {
        let vertices: Vec<String> = found
            .polygon
            .vertices
            .iter()
            .map(|v| format!("({:.2}, {:.2})", v.x, v.y))
            .collect();
        println!(
            "contour {:>3}: {} sides, edge {:?}, {:?}: {}",
            found.contour_index,
            found.polygon.len(),
            found.edge_intensity,
            found.refinement,
            vertices.join(" ")
        );
    }
    Ok(())
}
