//! # ecuterra-common
//!
//! Geographic primitives shared by every stage of the terrain pipeline:
//! [`GeoPoint`], [`BoundingBox`] and the flat-earth conversions used to turn
//! degrees into meters over the small areas the pipeline works with.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Meters spanned by one degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Errors produced when constructing geographic values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeoError {
    /// Latitude or longitude outside the valid range, or not finite.
    #[error("Invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate {
        /// Requested latitude.
        lat: f64,
        /// Requested longitude.
        lon: f64,
    },
}

/// A geographic position in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (positive = north).
    pub lat: f64,
    /// Longitude in degrees (negative = west).
    pub lon: f64,
}

impl GeoPoint {
    /// Create a point, checking that it lies on the globe.
    pub fn new(lat: f64, lon: f64) -> Result<Self, GeoError> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        if !valid {
            return Err(GeoError::InvalidCoordinate { lat, lon });
        }
        Ok(Self { lat, lon })
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

impl std::str::FromStr for GeoPoint {
    type Err = String;

    /// Parse `"lat,lon"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected LAT,LON but got '{}'", s))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;
        GeoPoint::new(lat, lon).map_err(|e| e.to_string())
    }
}

/// An axis-aligned geographic rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// South edge.
    pub min_lat: f64,
    /// West edge.
    pub min_lon: f64,
    /// North edge.
    pub max_lat: f64,
    /// East edge.
    pub max_lon: f64,
}

impl BoundingBox {
    /// Build the box spanned by two corner points, in any order.
    pub fn from_corners(a: GeoPoint, b: GeoPoint) -> Self {
        Self {
            min_lat: a.lat.min(b.lat),
            min_lon: a.lon.min(b.lon),
            max_lat: a.lat.max(b.lat),
            max_lon: a.lon.max(b.lon),
        }
    }

    /// Latitude extent in degrees.
    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Longitude extent in degrees.
    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// True if the box has zero extent along either axis.
    pub fn is_degenerate(&self) -> bool {
        self.lat_span() <= 0.0 || self.lon_span() <= 0.0
    }

    /// Center of the box.
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: (self.min_lat + self.max_lat) / 2.0,
            lon: (self.min_lon + self.max_lon) / 2.0,
        }
    }

    /// The four corners, counter-clockwise from south-west.
    pub fn corners(&self) -> [GeoPoint; 4] {
        [
            GeoPoint { lat: self.min_lat, lon: self.min_lon },
            GeoPoint { lat: self.min_lat, lon: self.max_lon },
            GeoPoint { lat: self.max_lat, lon: self.max_lon },
            GeoPoint { lat: self.max_lat, lon: self.min_lon },
        ]
    }

    /// True if `other` lies entirely inside this box (edges inclusive).
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        other.min_lat >= self.min_lat
            && other.max_lat <= self.max_lat
            && other.min_lon >= self.min_lon
            && other.max_lon <= self.max_lon
    }

    /// North-south extent in kilometers.
    pub fn height_km(&self) -> f64 {
        self.lat_span() * METERS_PER_DEGREE / 1000.0
    }

    /// East-west extent in kilometers, measured at the box's mean latitude.
    pub fn width_km(&self) -> f64 {
        self.lon_span() * meters_per_degree_lon(self.center().lat) / 1000.0
    }

    /// Approximate area in square kilometers.
    ///
    /// Accurate to well under a percent for the box sizes the pipeline
    /// accepts (a few thousand km²).
    pub fn area_km2(&self) -> f64 {
        self.height_km() * self.width_km()
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}] - [{:.6}, {:.6}]",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}

/// Meters spanned by one degree of longitude at the given latitude.
pub fn meters_per_degree_lon(lat: f64) -> f64 {
    METERS_PER_DEGREE * lat.to_radians().cos()
}
