//! Example: Clip an elevation window from a directory of HGT tiles.
//!
//! Usage: cargo run --example clip_window -- <lat1> <lon1> <lat2> <lon2> [hgt_dir]

use ecuterra_common::{BoundingBox, GeoPoint};
use ecuterra_dem::{ElevationSource, HeightfieldClipper};
use std::env;
use std::sync::Arc;
use std::time::Instant;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 5 {
        eprintln!("Usage: {} <lat1> <lon1> <lat2> <lon2> [hgt_dir]", args[0]);
        eprintln!("Example: {} -0.1 -78.6 -0.3 -78.4 ./hgt_files", args[0]);
        std::process::exit(1);
    }

    let coord = |i: usize| -> f64 { args[i].parse().expect("Invalid coordinate") };
    let p1 = GeoPoint::new(coord(1), coord(2)).expect("Invalid first corner");
    let p2 = GeoPoint::new(coord(3), coord(4)).expect("Invalid second corner");
    let hgt_dir = args.get(5).map(|s| s.as_str()).unwrap_or("hgt_files");

    println!("Merging HGT tiles from {}...", hgt_dir);
    let start = Instant::now();
    let source = ElevationSource::from_hgt_directory(hgt_dir).expect("Failed to merge HGT directory");
    let bounds = source.bounds();
    println!(
        "Merged in {:.2}s, coverage: lat {:.2}° to {:.2}°, lon {:.2}° to {:.2}°",
        start.elapsed().as_secs_f64(),
        bounds.min_lat,
        bounds.max_lat,
        bounds.min_lon,
        bounds.max_lon
    );

    let bbox = BoundingBox::from_corners(p1, p2);
    println!("\nClipping {} ({:.1} km²)...", bbox, bbox.area_km2());

    let clipper = HeightfieldClipper::new(Arc::new(source));
    match clipper.clip(&bbox) {
        Ok(grid) => {
            println!("Grid: {} rows x {} cols, {} valid samples", grid.rows(), grid.cols(), grid.valid_count());
            if let Some((lo, hi)) = grid.min_max() {
                println!("Elevation: {:.0} m to {:.0} m", lo, hi);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
