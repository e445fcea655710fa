//! SRTM `.hgt` tile reading.
//!
//! HGT files are headerless grids of big-endian `i16` elevations covering a
//! 1x1 degree cell, named after the cell's south-west corner (`N00W079.hgt`
//! covers latitude 0 to 1 and longitude -79 to -78). Rows run north to
//! south and the outermost rows and columns duplicate the neighbouring
//! tiles' edges.

use crate::raster::SRTM_VOID;
use crate::{DemError, Result};
use std::path::Path;

/// Samples per side of a 1 arc-second tile.
pub const SRTM1_SAMPLES: usize = 3601;
/// Samples per side of a 3 arc-second tile.
pub const SRTM3_SAMPLES: usize = 1201;

/// Tile key based on the south-west corner of the tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    /// Latitude of the south edge (negative for south).
    pub lat: i32,
    /// Longitude of the west edge (negative for west).
    pub lon: i32,
}

impl TileKey {
    /// The tile containing a coordinate.
    pub fn from_coord(lat: f64, lon: f64) -> Self {
        TileKey {
            lat: lat.floor() as i32,
            lon: lon.floor() as i32,
        }
    }

    /// Parse a filename like `N00W079.hgt` or `s01e010.hgt`.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let stem = filename.split('.').next()?;
        let mut chars = stem.chars().peekable();

        let ns = chars.next()?.to_ascii_uppercase();
        let mut lat_str = String::new();
        while let Some(d) = chars.next_if(|c| c.is_ascii_digit()) {
            lat_str.push(d);
        }
        let ew = chars.next()?.to_ascii_uppercase();
        let lon_str: String = chars.by_ref().take_while(|c| c.is_ascii_digit()).collect();

        if lat_str.is_empty() || lon_str.is_empty() {
            return None;
        }
        let lat: i32 = lat_str.parse().ok()?;
        let lon: i32 = lon_str.parse().ok()?;

        let lat = match ns {
            'N' => lat,
            'S' => -lat,
            _ => return None,
        };
        let lon = match ew {
            'E' => lon,
            'W' => -lon,
            _ => return None,
        };
        Some(TileKey { lat, lon })
    }

    /// Canonical filename for this tile.
    pub fn filename(&self) -> String {
        format!(
            "{}{:02}{}{:03}.hgt",
            if self.lat >= 0 { 'N' } else { 'S' },
            self.lat.unsigned_abs(),
            if self.lon >= 0 { 'E' } else { 'W' },
            self.lon.unsigned_abs()
        )
    }
}

/// A decoded HGT tile.
#[derive(Debug, Clone)]
pub struct HgtTile {
    key: TileKey,
    samples: usize,
    data: Vec<f32>,
}

impl HgtTile {
    /// Read a tile from disk; the resolution is inferred from the file size.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DemError::InvalidFilename(path.display().to_string()))?;
        let key =
            TileKey::from_filename(name).ok_or_else(|| DemError::InvalidFilename(name.to_string()))?;
        let bytes = std::fs::read(path)?;
        Self::from_bytes(key, &bytes, name)
    }

    /// Decode raw HGT bytes for a known tile.
    pub fn from_bytes(key: TileKey, bytes: &[u8], name: &str) -> Result<Self> {
        let samples = match bytes.len() {
            n if n == SRTM1_SAMPLES * SRTM1_SAMPLES * 2 => SRTM1_SAMPLES,
            n if n == SRTM3_SAMPLES * SRTM3_SAMPLES * 2 => SRTM3_SAMPLES,
            n => {
                return Err(DemError::InvalidTileSize {
                    name: name.to_string(),
                    detail: format!("{} bytes is neither SRTM1 nor SRTM3", n),
                })
            }
        };
        let data = bytes
            .chunks_exact(2)
            .map(|b| i16::from_be_bytes([b[0], b[1]]) as f32)
            .collect();
        Ok(Self { key, samples, data })
    }

    /// Build a tile from already-decoded samples (row-major, north to south).
    pub fn from_samples(key: TileKey, samples: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != samples * samples || samples < 2 {
            return Err(DemError::InvalidTileSize {
                name: key.filename(),
                detail: format!("{} samples for a {}x{} tile", data.len(), samples, samples),
            });
        }
        Ok(Self { key, samples, data })
    }

    /// Tile key.
    pub fn key(&self) -> TileKey {
        self.key
    }

    /// Samples per side.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Row-major samples; voids are [`SRTM_VOID`].
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Nearest-sample elevation, `None` for voids or coordinates outside the tile.
    pub fn get_elevation_nearest(&self, lat: f64, lon: f64) -> Option<f32> {
        let n = (self.samples - 1) as f64;
        let fx = (lon - self.key.lon as f64) * n;
        let fy = (self.key.lat as f64 + 1.0 - lat) * n;
        if !(0.0..=n).contains(&fx) || !(0.0..=n).contains(&fy) {
            return None;
        }
        let v = self.data[fy.round() as usize * self.samples + fx.round() as usize];
        (v != SRTM_VOID).then_some(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_key_from_filename() {
        let key = TileKey::from_filename("N00W079.hgt").unwrap();
        assert_eq!(key, TileKey { lat: 0, lon: -79 });

        let key = TileKey::from_filename("s02w080.HGT").unwrap();
        assert_eq!(key, TileKey { lat: -2, lon: -80 });

        let key = TileKey::from_filename("N35E138.hgt").unwrap();
        assert_eq!(key, TileKey { lat: 35, lon: 138 });

        assert!(TileKey::from_filename("mosaic.tif").is_none());
        assert!(TileKey::from_filename("X00W079.hgt").is_none());
    }

    #[test]
    fn test_tile_key_from_coord() {
        // Quito sits in S01W079
        assert_eq!(TileKey::from_coord(-0.18, -78.47), TileKey { lat: -1, lon: -79 });
        assert_eq!(TileKey::from_coord(0.5, -78.5), TileKey { lat: 0, lon: -79 });
        assert_eq!(TileKey::from_coord(-1.0, -79.0), TileKey { lat: -1, lon: -79 });
    }

    #[test]
    fn test_filename_roundtrip() {
        for key in [TileKey { lat: -1, lon: -79 }, TileKey { lat: 0, lon: -80 }, TileKey { lat: 5, lon: 7 }] {
            assert_eq!(TileKey::from_filename(&key.filename()), Some(key));
        }
        assert_eq!(TileKey { lat: -1, lon: -79 }.filename(), "S01W079.hgt");
    }

    #[test]
    fn test_decode_srtm3_bytes() {
        let mut bytes = vec![0u8; SRTM3_SAMPLES * SRTM3_SAMPLES * 2];
        // North-west corner sample = 2850 m
        bytes[0..2].copy_from_slice(&2850i16.to_be_bytes());
        // Second sample is void
        bytes[2..4].copy_from_slice(&(-32768i16).to_be_bytes());

        let tile = HgtTile::from_bytes(TileKey { lat: -1, lon: -79 }, &bytes, "S01W079.hgt").unwrap();
        assert_eq!(tile.samples(), SRTM3_SAMPLES);
        assert_eq!(tile.get_elevation_nearest(0.0, -79.0), Some(2850.0));
        assert_eq!(tile.get_elevation_nearest(0.0, -79.0 + 1.0 / 1200.0), None);
        assert_eq!(tile.get_elevation_nearest(-0.5, -78.5), Some(0.0));
        assert_eq!(tile.get_elevation_nearest(1.5, -78.5), None);
    }

    #[test]
    fn test_reject_wrong_size() {
        let err = HgtTile::from_bytes(TileKey { lat: 0, lon: 0 }, &[0u8; 100], "N00E000.hgt");
        assert!(matches!(err, Err(DemError::InvalidTileSize { .. })));
    }
}
