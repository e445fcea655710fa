//! Per-request elevation grid plus the resampling and smoothing filters
//! applied before meshing.

use crate::raster::GeoTransform;
use crate::{DemError, Result};
use ecuterra_common::BoundingBox;
use rayon::prelude::*;
use tracing::debug;

/// Elevation samples clipped to a selection.
///
/// Row-major, north to south. Owned by a single request and consumed by
/// the mesh builder.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrid {
    data: Vec<f32>,
    rows: usize,
    cols: usize,
    transform: GeoTransform,
    nodata: f32,
}

impl ElevationGrid {
    /// Create a grid, checking that the sample count matches the shape.
    pub fn new(
        data: Vec<f32>,
        rows: usize,
        cols: usize,
        transform: GeoTransform,
        nodata: f32,
    ) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(DemError::DimensionMismatch {
                width: cols,
                height: rows,
                expected: rows * cols,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            rows,
            cols,
            transform,
            nodata,
        })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of samples.
    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Raw samples, nodata included.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Nodata sentinel.
    pub fn nodata(&self) -> f32 {
        self.nodata
    }

    /// Geotransform of the grid.
    pub fn transform(&self) -> GeoTransform {
        self.transform
    }

    /// Extent covered by sample centers.
    pub fn bounds(&self) -> BoundingBox {
        self.transform.extent(self.rows, self.cols)
    }

    /// True if `v` is nodata (the sentinel or NaN).
    pub fn is_nodata(&self, v: f32) -> bool {
        v.is_nan() || v == self.nodata
    }

    /// Elevation at (`row`, `col`), `None` for nodata or out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let v = self.data[row * self.cols + col];
        (!self.is_nodata(v)).then_some(v)
    }

    /// Number of valid samples.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !self.is_nodata(**v)).count()
    }

    /// Minimum and maximum valid elevation.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|v| !self.is_nodata(*v))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Median of the valid samples.
    pub fn median(&self) -> Option<f32> {
        let mut valid: Vec<f32> = self
            .data
            .iter()
            .copied()
            .filter(|v| !self.is_nodata(*v))
            .collect();
        if valid.is_empty() {
            return None;
        }
        valid.sort_by(f32::total_cmp);
        let mid = valid.len() / 2;
        Some(if valid.len() % 2 == 0 {
            (valid[mid - 1] + valid[mid]) / 2.0
        } else {
            valid[mid]
        })
    }

    /// Reduce the grid to at most `max_cells` samples by block averaging.
    ///
    /// Blocks average their valid samples; a block without any stays
    /// nodata. Both axes shrink by the same factor and never below 2; when
    /// one axis hits that floor the other takes up the remaining budget.
    /// Grids already within the limit are returned unchanged.
    pub fn downsample_to(self, max_cells: usize) -> Self {
        let cells = self.cell_count();
        if max_cells == 0 || cells <= max_cells {
            return self;
        }

        let factor = (cells as f64 / max_cells as f64).sqrt();
        let mut new_rows = ((self.rows as f64 / factor) as usize).max(2);
        let mut new_cols = ((self.cols as f64 / factor) as usize).max(2);
        if new_rows * new_cols > max_cells {
            let rest = (max_cells / 2).max(2);
            if new_rows == 2 {
                new_cols = rest.min(self.cols);
            } else {
                new_rows = rest.min(self.rows);
            }
        }

        // Block edges split the source as evenly as integers allow
        let row_edges: Vec<usize> = (0..=new_rows).map(|i| i * self.rows / new_rows).collect();
        let col_edges: Vec<usize> = (0..=new_cols).map(|j| j * self.cols / new_cols).collect();

        let mut out = vec![self.nodata; new_rows * new_cols];
        out.par_chunks_mut(new_cols).enumerate().for_each(|(i, out_row)| {
            for (j, cell) in out_row.iter_mut().enumerate() {
                let mut sum = 0.0f64;
                let mut n = 0usize;
                for r in row_edges[i]..row_edges[i + 1] {
                    let src = &self.data[r * self.cols..(r + 1) * self.cols];
                    for &v in &src[col_edges[j]..col_edges[j + 1]] {
                        if !self.is_nodata(v) {
                            sum += v as f64;
                            n += 1;
                        }
                    }
                }
                if n > 0 {
                    *cell = (sum / n as f64) as f32;
                }
            }
        });

        let transform = self.transform.scaled(
            self.rows as f64 / new_rows as f64,
            self.cols as f64 / new_cols as f64,
        );

        debug!(
            from = ?(self.rows, self.cols),
            to = ?(new_rows, new_cols),
            factor,
            "Downsampled elevation grid"
        );

        Self {
            data: out,
            rows: new_rows,
            cols: new_cols,
            transform,
            nodata: self.nodata,
        }
    }

    /// Gaussian blur that leaves nodata where it was.
    ///
    /// Nodata is filled with the median valid elevation before filtering and
    /// masked again afterwards. The kernel is separable with radius
    /// `ceil(3 * sigma)`; edges reflect. A non-positive sigma is a no-op.
    pub fn gaussian_smooth(self, sigma: f64) -> Self {
        if !(sigma > 0.0) {
            return self;
        }
        let Some(fill) = self.median() else {
            return self;
        };

        let mask: Vec<bool> = self.data.iter().map(|v| self.is_nodata(*v)).collect();
        let filled: Vec<f32> = self
            .data
            .iter()
            .zip(&mask)
            .map(|(&v, &void)| if void { fill } else { v })
            .collect();

        let kernel = gaussian_kernel(sigma);
        let horizontal = convolve_rows(&filled, self.rows, self.cols, &kernel);
        let transposed = transpose(&horizontal, self.rows, self.cols);
        let vertical = convolve_rows(&transposed, self.cols, self.rows, &kernel);
        let mut data = transpose(&vertical, self.cols, self.rows);

        for (v, void) in data.iter_mut().zip(mask) {
            if void {
                *v = self.nodata;
            }
        }

        debug!(sigma, radius = kernel.len() / 2, "Smoothed elevation grid");

        Self { data, ..self }
    }
}

/// Normalized 1-D Gaussian kernel of radius `ceil(3 * sigma)`.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (3.0 * sigma).ceil() as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|i| (-((i * i) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Reflect an index into `0..n` (`d c b a | a b c d | d c b a`).
fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let m = i.rem_euclid(period);
    (if m < n { m } else { period - 1 - m }) as usize
}

fn convolve_rows(data: &[f32], rows: usize, cols: usize, kernel: &[f64]) -> Vec<f32> {
    let radius = (kernel.len() / 2) as isize;
    let mut out = vec![0.0f32; rows * cols];
    out.par_chunks_mut(cols)
        .zip(data.par_chunks(cols))
        .for_each(|(dst, src)| {
            for (c, d) in dst.iter_mut().enumerate() {
                let acc: f64 = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| {
                        let idx = reflect(c as isize + k as isize - radius, cols);
                        w * src[idx] as f64
                    })
                    .sum();
                *d = acc as f32;
            }
        });
    debug_assert_eq!(out.len(), rows * cols);
    out
}

fn transpose(data: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            out[c * rows + r] = data[r * cols + c];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::SRTM_VOID;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn transform() -> GeoTransform {
        GeoTransform {
            origin_lon: -78.6,
            origin_lat: 0.0,
            dx: 0.01,
            dy: 0.01,
        }
    }

    fn grid(rows: usize, cols: usize, data: Vec<f32>) -> ElevationGrid {
        ElevationGrid::new(data, rows, cols, transform(), SRTM_VOID).unwrap()
    }

    #[test]
    fn test_statistics_skip_nodata() {
        let g = grid(2, 3, vec![3000.0, SRTM_VOID, 2800.0, 3100.0, 2900.0, f32::NAN]);
        assert_eq!(g.valid_count(), 4);
        assert_eq!(g.min_max(), Some((2800.0, 3100.0)));
        assert_eq!(g.median(), Some(2950.0));
        assert_eq!(g.get(0, 1), None);
        assert_eq!(g.get(1, 0), Some(3100.0));
    }

    #[test]
    fn test_shape_mismatch() {
        let err = ElevationGrid::new(vec![0.0; 5], 2, 3, transform(), SRTM_VOID);
        assert!(matches!(err, Err(DemError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_downsample_block_mean() {
        // 4x4 with quadrant values, one void in the top-left block
        #[rustfmt::skip]
        let data = vec![
            10.0, SRTM_VOID, 20.0, 20.0,
            10.0, 10.0,      20.0, 20.0,
            30.0, 30.0,      40.0, 40.0,
            30.0, 30.0,      40.0, 40.0,
        ];
        let g = grid(4, 4, data).downsample_to(4);
        assert_eq!((g.rows(), g.cols()), (2, 2));
        assert_eq!(g.data(), &[10.0, 20.0, 30.0, 40.0]);
        assert_relative_eq!(g.transform().dx, 0.02);
        // First block center sits between the first two source samples
        assert_relative_eq!(g.transform().origin_lon, -78.595, epsilon = 1e-12);
    }

    #[test]
    fn test_downsample_void_block_stays_void() {
        let mut data = vec![5.0; 16];
        for idx in [0, 1, 4, 5] {
            data[idx] = SRTM_VOID;
        }
        let g = grid(4, 4, data).downsample_to(4);
        assert_eq!(g.get(0, 0), None);
        assert_eq!(g.get(1, 1), Some(5.0));
    }

    #[test]
    fn test_downsample_respects_cap() {
        let g = grid(300, 500, vec![1.0; 150_000]).downsample_to(10_000);
        assert!(g.cell_count() <= 10_000);
        assert!(g.rows() >= 2 && g.cols() >= 2);
        let aspect = g.cols() as f64 / g.rows() as f64;
        assert_relative_eq!(aspect, 5.0 / 3.0, epsilon = 0.05);
    }

    #[test]
    fn test_downsample_thin_strip_respects_cap() {
        let g = grid(2, 10_000, vec![100.0; 20_000]).downsample_to(100);
        assert_eq!((g.rows(), g.cols()), (2, 50));
        assert!(g.cell_count() <= 100);
        assert!(g.data().iter().all(|&v| v == 100.0));

        let g = grid(10_000, 2, vec![100.0; 20_000]).downsample_to(100);
        assert_eq!((g.rows(), g.cols()), (50, 2));
    }

    #[test]
    fn test_downsample_noop_under_cap() {
        let g = grid(3, 3, vec![1.0; 9]);
        assert_eq!(g.clone().downsample_to(9), g);
    }

    #[test]
    fn test_gaussian_preserves_constant_and_mask() {
        let mut data = vec![2500.0; 100];
        data[55] = SRTM_VOID;
        let g = grid(10, 10, data).gaussian_smooth(1.5);
        assert_eq!(g.get(5, 5), None);
        for r in 0..10 {
            for c in 0..10 {
                if (r, c) != (5, 5) {
                    assert_relative_eq!(g.get(r, c).unwrap(), 2500.0, epsilon = 1e-2);
                }
            }
        }
    }

    #[test]
    fn test_gaussian_reduces_noise() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let data: Vec<f32> = (0..400).map(|_| 3000.0 + rng.gen_range(-50.0..50.0)).collect();
        let g = grid(20, 20, data);

        let spread = |g: &ElevationGrid| {
            let (lo, hi) = g.min_max().unwrap();
            hi - lo
        };
        let before = spread(&g);
        let after = spread(&g.clone().gaussian_smooth(1.5));
        assert!(after < before / 2.0, "spread {} -> {}", before, after);
    }

    #[test]
    fn test_gaussian_zero_sigma_is_noop() {
        let g = grid(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(g.clone().gaussian_smooth(0.0), g);
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        assert_eq!(reflect(2, 4), 2);
    }
}
