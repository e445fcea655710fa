//! Integration tests for HGT merging and clipping across tile seams.
//!
//! Tiles are written to a temporary directory as real SRTM3-sized files.

use ecuterra_common::{BoundingBox, GeoPoint};
use ecuterra_dem::{
    DemError, ElevationSource, HeightfieldClipper, Raster, TileIndex, TileKey, SRTM3_SAMPLES, SRTM_VOID,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ecuterra-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write an SRTM3 tile with a constant elevation.
fn write_tile(dir: &Path, key: TileKey, elevation: i16) {
    let bytes: Vec<u8> = std::iter::repeat(elevation.to_be_bytes())
        .take(SRTM3_SAMPLES * SRTM3_SAMPLES)
        .flatten()
        .collect();
    std::fs::write(dir.join(key.filename()), bytes).unwrap();
}

#[test]
fn test_window_straddles_four_tiles() {
    let dir = temp_dir("four-tiles");
    // Quadrants around 0°N 79°W with distinct elevations
    write_tile(&dir, TileKey { lat: 0, lon: -80 }, 100);
    write_tile(&dir, TileKey { lat: 0, lon: -79 }, 200);
    write_tile(&dir, TileKey { lat: -1, lon: -80 }, 300);
    write_tile(&dir, TileKey { lat: -1, lon: -79 }, 400);

    let source = ElevationSource::from_hgt_directory(&dir).unwrap();
    let bounds = source.bounds();
    assert_eq!(source.raster().width(), 2 * (SRTM3_SAMPLES - 1) + 1);
    assert!((bounds.min_lat + 1.0).abs() < 1e-9);
    assert!((bounds.max_lon + 78.0).abs() < 1e-9);

    let clipper = HeightfieldClipper::new(Arc::new(source));
    let bbox = BoundingBox::from_corners(
        GeoPoint { lat: 0.05, lon: -79.05 },
        GeoPoint { lat: -0.05, lon: -78.95 },
    );
    let grid = clipper.clip(&bbox).unwrap();

    assert_eq!(grid.valid_count(), grid.cell_count());
    let last_row = grid.rows() - 1;
    let last_col = grid.cols() - 1;
    assert_eq!(grid.get(0, 0), Some(100.0));
    assert_eq!(grid.get(0, last_col), Some(200.0));
    assert_eq!(grid.get(last_row, 0), Some(300.0));
    assert_eq!(grid.get(last_row, last_col), Some(400.0));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_tile_reads_as_nodata() {
    let dir = temp_dir("missing-tile");
    write_tile(&dir, TileKey { lat: 0, lon: -80 }, 50);
    write_tile(&dir, TileKey { lat: -1, lon: -79 }, 60);

    let source = ElevationSource::from_hgt_directory(&dir).unwrap();

    // Entirely inside the absent north-east tile
    let bbox = BoundingBox::from_corners(
        GeoPoint { lat: 0.6, lon: -78.6 },
        GeoPoint { lat: 0.4, lon: -78.4 },
    );
    let err = source.read_window(&bbox);
    assert!(matches!(err, Err(DemError::NoElevationData { .. })));

    // A window on the seam keeps nodata but still succeeds
    let bbox = BoundingBox::from_corners(
        GeoPoint { lat: 0.1, lon: -79.1 },
        GeoPoint { lat: -0.1, lon: -78.9 },
    );
    let grid = source.read_window(&bbox).unwrap();
    assert!(grid.valid_count() > 0);
    assert!(grid.valid_count() < grid.cell_count());
    assert_eq!(grid.nodata(), SRTM_VOID);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_merged_mosaic_survives_geotiff() {
    let dir = temp_dir("mosaic-tiff");
    write_tile(&dir, TileKey { lat: -1, lon: -79 }, 2850);

    let source = ElevationSource::from_hgt_directory(&dir).unwrap();
    let tiff_path = dir.join("mosaic.tif");
    source.raster().write_geotiff(&tiff_path).unwrap();

    let reloaded = ElevationSource::from_geotiff(&tiff_path).unwrap();
    assert_eq!(reloaded.raster().width(), SRTM3_SAMPLES);
    let quito = GeoPoint { lat: -0.18, lon: -78.47 };
    assert_eq!(reloaded.sample(quito), Some(2850.0));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_same_tile_in_two_cases_counted_once() {
    let dir = temp_dir("dup-case");
    let key = TileKey { lat: -1, lon: -79 };
    write_tile(&dir, key, 100);
    std::fs::copy(dir.join("S01W079.hgt"), dir.join("s01w079.HGT")).unwrap();

    let mut index = TileIndex::new();
    assert_eq!(index.add_directory(&dir).unwrap(), 1);
    assert_eq!(index.tile_count(), 1);
    assert_eq!(index.merge().unwrap().width(), SRTM3_SAMPLES);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_bad_tile_size_rejected() {
    let dir = temp_dir("bad-size");
    std::fs::write(dir.join("S01W079.hgt"), vec![0u8; 1000]).unwrap();

    let err = ElevationSource::from_hgt_directory(&dir);
    assert!(matches!(err, Err(DemError::InvalidTileSize { .. })));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_masking_to_region() {
    let transform = ecuterra_dem::GeoTransform {
        origin_lon: -79.0,
        origin_lat: 0.0,
        dx: 0.5,
        dy: 0.5,
    };
    let mut raster = Raster::new(vec![1000.0; 9], 3, 3, transform, SRTM_VOID).unwrap();
    // Keep the western column only
    let masked = raster.mask_outside(|_lat, lon| lon < -78.75);
    assert_eq!(masked, 6);
    let source = ElevationSource::from_raster(raster);
    assert_eq!(source.sample(GeoPoint { lat: -0.5, lon: -79.0 }), Some(1000.0));
    assert_eq!(source.sample(GeoPoint { lat: -0.5, lon: -78.5 }), None);
}
