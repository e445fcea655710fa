//! Merging a directory of HGT tiles into one continuous raster.

use crate::hgt::{HgtTile, TileKey};
use crate::raster::{GeoTransform, Raster, SRTM_VOID};
use crate::{DemError, Result};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Index of HGT tiles available on disk.
///
/// Indexing only parses filenames; tile data is read by [`TileIndex::merge`].
#[derive(Debug, Default, Clone)]
pub struct TileIndex {
    tile_paths: BTreeMap<TileKey, PathBuf>,
}

impl TileIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add all `.hgt` files from a directory to the index.
    ///
    /// Files whose names do not follow the SRTM convention are skipped with
    /// a warning. Returns the number of tiles indexed.
    pub fn add_directory<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize> {
        let dir = dir.as_ref();
        let mut count = 0;

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("hgt"))
            {
                paths.push(path);
            }
        }
        // Directory order is platform dependent; the first name in sort order wins
        paths.sort();

        for path in paths {
            let Some(filename) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(key) = TileKey::from_filename(filename) else {
                warn!(file = filename, "Skipping HGT file with unrecognized name");
                continue;
            };
            match self.tile_paths.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(path.clone());
                    count += 1;
                }
                Entry::Occupied(existing) => warn!(
                    file = filename,
                    kept = %existing.get().display(),
                    "Skipping duplicate HGT tile"
                ),
            }
        }

        debug!(dir = %dir.display(), count, "Indexed HGT tiles");
        Ok(count)
    }

    /// Add a single tile file.
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DemError::InvalidFilename(path.display().to_string()))?;
        let key = TileKey::from_filename(filename)
            .ok_or_else(|| DemError::InvalidFilename(filename.to_string()))?;
        self.tile_paths.insert(key, path.to_path_buf());
        Ok(())
    }

    /// Number of indexed tiles.
    pub fn tile_count(&self) -> usize {
        self.tile_paths.len()
    }

    /// True if a tile covering the coordinate is indexed.
    pub fn has_tile(&self, lat: f64, lon: f64) -> bool {
        self.tile_paths.contains_key(&TileKey::from_coord(lat, lon))
    }

    /// Read every indexed tile and merge them into one raster.
    pub fn merge(&self) -> Result<Raster> {
        if self.tile_paths.is_empty() {
            return Err(DemError::NoTilesFound("tile index".into()));
        }
        let tiles = self
            .tile_paths
            .values()
            .map(HgtTile::from_file)
            .collect::<Result<Vec<_>>>()?;
        merge_tiles(&tiles)
    }
}

/// Merge HGT tiles into a single raster spanning their combined extent.
///
/// Tiles must share one resolution. Cells not covered by any tile are
/// nodata. Shared edge rows and columns are taken from whichever tile has
/// a valid sample there.
pub fn merge_tiles(tiles: &[HgtTile]) -> Result<Raster> {
    let first = tiles
        .first()
        .ok_or_else(|| DemError::NoTilesFound("empty tile list".into()))?;
    let samples = first.samples();
    if let Some(odd) = tiles.iter().find(|t| t.samples() != samples) {
        return Err(DemError::InvalidTileSize {
            name: odd.key().filename(),
            detail: format!(
                "{} samples per side, expected {} like {}",
                odd.samples(),
                samples,
                first.key().filename()
            ),
        });
    }

    let min_lat = tiles.iter().map(|t| t.key().lat).min().unwrap_or(0);
    let max_lat = tiles.iter().map(|t| t.key().lat).max().unwrap_or(0) + 1;
    let min_lon = tiles.iter().map(|t| t.key().lon).min().unwrap_or(0);
    let max_lon = tiles.iter().map(|t| t.key().lon).max().unwrap_or(0) + 1;

    // Samples per degree; neighbouring tiles overlap by one row/column
    let step = samples - 1;
    let width = (max_lon - min_lon) as usize * step + 1;
    let height = (max_lat - min_lat) as usize * step + 1;
    let mut data = vec![SRTM_VOID; width * height];

    for tile in tiles {
        let key = tile.key();
        let row_off = (max_lat - (key.lat + 1)) as usize * step;
        let col_off = (key.lon - min_lon) as usize * step;
        for (r, src_row) in tile.data().chunks_exact(samples).enumerate() {
            let dst = &mut data[(row_off + r) * width + col_off..][..samples];
            for (d, &s) in dst.iter_mut().zip(src_row) {
                if s != SRTM_VOID {
                    *d = s;
                }
            }
        }
    }

    let transform = GeoTransform {
        origin_lon: min_lon as f64,
        origin_lat: max_lat as f64,
        dx: 1.0 / step as f64,
        dy: 1.0 / step as f64,
    };

    info!(
        tiles = tiles.len(),
        width,
        height,
        lat = ?(min_lat, max_lat),
        lon = ?(min_lon, max_lon),
        "Merged HGT tiles"
    );

    Raster::new(data, width, height, transform, SRTM_VOID)
}
