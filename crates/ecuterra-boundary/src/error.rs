//! Error types for boundary loading and selection validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading boundary geometry.
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// I/O error reading the boundary file.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid GeoJSON.
    #[error("GeoJSON parse error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The GeoJSON held no polygon or multipolygon geometry.
    #[error("Boundary contains no polygons")]
    NoPolygons,

    /// A polygon ring had fewer than four positions or a position lacked coordinates.
    #[error("Malformed polygon ring: {0}")]
    MalformedRing(String),
}

/// Reasons a selection is rejected before any elevation is read.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SelectionError {
    /// Both points are identical, or the box has no extent on one axis.
    #[error("Degenerate selection: the two points must differ in latitude and longitude")]
    DegenerateSelection,

    /// Some part of the selection lies outside the country boundary.
    #[error("Selection is outside the boundary")]
    OutOfBounds,

    /// The selection is larger than the configured cap.
    #[error("Area too large: {area_km2:.1} km² (max {max_km2} km²)")]
    AreaTooLarge {
        /// Computed area of the selection.
        area_km2: f64,
        /// Configured maximum.
        max_km2: f64,
    },
}

impl SelectionError {
    /// Short machine-readable reason, used as a metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            SelectionError::DegenerateSelection => "degenerate",
            SelectionError::OutOfBounds => "out_of_bounds",
            SelectionError::AreaTooLarge { .. } => "area_too_large",
        }
    }
}
