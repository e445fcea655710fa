//! # ecuterra-dem
//!
//! Elevation data for terrain extraction: SRTM `.hgt` tiles, GeoTIFF
//! mosaics and the per-request heightfield clipper.
//!
//! ## Overview
//!
//! SRTM tiles cover 1x1 degree cells named after their south-west corner
//! (`S01W079.hgt` covers latitude -1 to 0 and longitude -79 to -78). They
//! come in two resolutions:
//! - SRTM1, 1 arc-second (~30 meters), 3601 x 3601 samples
//! - SRTM3, 3 arc-second (~90 meters), 1201 x 1201 samples
//!
//! All tiles in a directory are merged into a single continuous [`Raster`]
//! so selections that straddle tile seams read like any other window. The
//! merge can be written out once as a GeoTIFF and loaded at startup
//! instead.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ecuterra_common::{BoundingBox, GeoPoint};
//! use ecuterra_dem::{ClipOptions, ElevationSource, HeightfieldClipper};
//!
//! let source = Arc::new(ElevationSource::from_hgt_directory("hgt_files")?);
//! let clipper = HeightfieldClipper::with_options(source, ClipOptions::default());
//!
//! let bbox = BoundingBox::from_corners(GeoPoint { lat: 0.0, lon: -78.5 }, GeoPoint { lat: -0.1, lon: -78.4 });
//! let grid = clipper.clip(&bbox)?;
//! println!("{} x {} samples", grid.rows(), grid.cols());
//! # Ok::<(), ecuterra_dem::DemError>(())
//! ```

mod clip;
mod error;
mod grid;
mod hgt;
mod mosaic;
mod raster;
mod source;

pub use clip::{ClipOptions, HeightfieldClipper, DEFAULT_MAX_CELLS};
pub use error::DemError;
pub use grid::ElevationGrid;
pub use hgt::{HgtTile, TileKey, SRTM1_SAMPLES, SRTM3_SAMPLES};
pub use mosaic::{merge_tiles, TileIndex};
pub use raster::{GeoTransform, Raster, SRTM_VOID};
pub use source::ElevationSource;

/// Result type for DEM operations.
pub type Result<T> = std::result::Result<T, DemError>;
