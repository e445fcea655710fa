//! Heightfield clipping for a validated selection.

use crate::grid::ElevationGrid;
use crate::source::ElevationSource;
use crate::Result;
use ecuterra_common::BoundingBox;
use std::sync::Arc;
use tracing::info;

/// Default cap on clipped grid size (1200 x 1200 samples).
pub const DEFAULT_MAX_CELLS: usize = 1200 * 1200;

/// Post-processing applied to a clipped window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipOptions {
    /// Windows larger than this are block-averaged down to fit.
    pub max_cells: usize,
    /// Gaussian smoothing sigma in samples; 0 disables smoothing.
    pub gaussian_sigma: f64,
}

impl Default for ClipOptions {
    fn default() -> Self {
        Self {
            max_cells: DEFAULT_MAX_CELLS,
            gaussian_sigma: 0.0,
        }
    }
}

/// Extracts the elevation grid for a bounding box from a shared source.
#[derive(Debug, Clone)]
pub struct HeightfieldClipper {
    source: Arc<ElevationSource>,
    options: ClipOptions,
}

impl HeightfieldClipper {
    /// Clipper with default options.
    pub fn new(source: Arc<ElevationSource>) -> Self {
        Self::with_options(source, ClipOptions::default())
    }

    /// Clipper with explicit options.
    pub fn with_options(source: Arc<ElevationSource>, options: ClipOptions) -> Self {
        Self { source, options }
    }

    /// Options in effect.
    pub fn options(&self) -> ClipOptions {
        self.options
    }

    /// The shared elevation source.
    pub fn source(&self) -> &Arc<ElevationSource> {
        &self.source
    }

    /// Clip, downsample and optionally smooth the elevation under `bbox`.
    pub fn clip(&self, bbox: &BoundingBox) -> Result<ElevationGrid> {
        let window = self.source.read_window(bbox)?;
        let (rows, cols) = (window.rows(), window.cols());

        let grid = window
            .downsample_to(self.options.max_cells)
            .gaussian_smooth(self.options.gaussian_sigma);

        info!(
            %bbox,
            window = ?(rows, cols),
            rows = grid.rows(),
            cols = grid.cols(),
            valid = grid.valid_count(),
            "Clipped heightfield"
        );
        Ok(grid)
    }
}
