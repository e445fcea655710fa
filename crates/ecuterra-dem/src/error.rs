//! Error types for the DEM crate.

use ecuterra_common::BoundingBox;
use thiserror::Error;

/// Errors that can occur when working with DEM data.
#[derive(Debug, Error)]
pub enum DemError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - missing required tags.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// Unsupported data type in the TIFF file.
    #[error("Unsupported TIFF data type: {0}")]
    UnsupportedDataType(String),

    /// The requested window is not covered by the source, or holds only nodata.
    #[error("No elevation data for {bbox}: {reason}")]
    NoElevationData {
        /// Requested window.
        bbox: BoundingBox,
        /// Why the window could not be served.
        reason: String,
    },

    /// No HGT tiles were found where some were expected.
    #[error("No .hgt files found in {0}")]
    NoTilesFound(String),

    /// Invalid tile filename - cannot parse coordinates.
    #[error("Invalid tile filename: {0}")]
    InvalidFilename(String),

    /// HGT file size matches neither SRTM1 nor SRTM3, or tiles mix resolutions.
    #[error("Invalid tile size for {name}: {detail}")]
    InvalidTileSize {
        /// Tile file name.
        name: String,
        /// What was wrong.
        detail: String,
    },

    /// Raster dimensions do not match the supplied sample buffer.
    #[error("Raster of {width}x{height} needs {expected} samples, got {got}")]
    DimensionMismatch {
        /// Raster width.
        width: usize,
        /// Raster height.
        height: usize,
        /// Expected sample count.
        expected: usize,
        /// Provided sample count.
        got: usize,
    },
}

impl DemError {
    pub(crate) fn no_data(bbox: &BoundingBox, reason: impl Into<String>) -> Self {
        DemError::NoElevationData {
            bbox: *bbox,
            reason: reason.into(),
        }
    }
}
