//! Long-lived elevation source shared by all requests.

use crate::grid::ElevationGrid;
use crate::mosaic::TileIndex;
use crate::raster::Raster;
use crate::{DemError, Result};
use ecuterra_common::{BoundingBox, GeoPoint};
use std::path::Path;
use tracing::{debug, info};

/// Tolerance, in samples, for boxes whose edges fall on sample centers.
const WINDOW_EPS: f64 = 1e-6;

/// One continuous elevation raster that requests read windows from.
///
/// Built once at startup and shared through an `Arc`; it is never mutated
/// after construction, so concurrent reads need no locking.
#[derive(Debug, Clone)]
pub struct ElevationSource {
    raster: Raster,
}

impl ElevationSource {
    /// Wrap an in-memory raster.
    pub fn from_raster(raster: Raster) -> Self {
        Self { raster }
    }

    /// Load a pre-merged GeoTIFF mosaic.
    pub fn from_geotiff<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_raster(Raster::from_geotiff(path)?))
    }

    /// Merge every `.hgt` tile in a directory.
    pub fn from_hgt_directory<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut index = TileIndex::new();
        if index.add_directory(dir)? == 0 {
            return Err(DemError::NoTilesFound(dir.display().to_string()));
        }
        info!(dir = %dir.display(), tiles = index.tile_count(), "Merging HGT directory");
        Ok(Self::from_raster(index.merge()?))
    }

    /// The underlying raster.
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// Extent of the source's sample centers.
    pub fn bounds(&self) -> BoundingBox {
        self.raster.bounds()
    }

    /// Nearest-sample elevation at a point, `None` outside the source or on nodata.
    pub fn sample(&self, point: GeoPoint) -> Option<f32> {
        let t = self.raster.transform();
        let row = t.row_f(point.lat).round();
        let col = t.col_f(point.lon).round();
        if row < 0.0 || col < 0.0 {
            return None;
        }
        self.raster.get(row as usize, col as usize)
    }

    /// Read the smallest sample-aligned window covering `bbox`.
    ///
    /// The box must lie inside the source extent. Nodata samples are kept
    /// as the sentinel, but a window holding nothing else is an error.
    pub fn read_window(&self, bbox: &BoundingBox) -> Result<ElevationGrid> {
        let extent = self.bounds();
        if !extent.contains_box(bbox) {
            return Err(DemError::no_data(
                bbox,
                format!("outside elevation coverage {}", extent),
            ));
        }

        let t = self.raster.transform();
        let row0 = (t.row_f(bbox.max_lat) + WINDOW_EPS).floor().max(0.0) as usize;
        let col0 = (t.col_f(bbox.min_lon) + WINDOW_EPS).floor().max(0.0) as usize;
        let row1 = ((t.row_f(bbox.min_lat) - WINDOW_EPS).ceil() as usize)
            .min(self.raster.height() - 1);
        let col1 = ((t.col_f(bbox.max_lon) - WINDOW_EPS).ceil() as usize)
            .min(self.raster.width() - 1);

        let rows = row1.saturating_sub(row0) + 1;
        let cols = col1.saturating_sub(col0) + 1;
        let width = self.raster.width();
        let src = self.raster.data();

        let mut data = Vec::with_capacity(rows * cols);
        for r in row0..row0 + rows {
            data.extend_from_slice(&src[r * width + col0..r * width + col0 + cols]);
        }

        let grid = ElevationGrid::new(
            data,
            rows,
            cols,
            t.offset(row0, col0),
            self.raster.nodata(),
        )?;

        if grid.valid_count() == 0 {
            return Err(DemError::no_data(bbox, "window holds only nodata"));
        }

        debug!(
            %bbox,
            row0,
            col0,
            rows,
            cols,
            "Read elevation window"
        );
        Ok(grid)
    }
}
