//! In-memory elevation raster and GeoTIFF reading/writing.

use crate::{DemError, Result};
use ecuterra_common::BoundingBox;
use std::io::BufWriter;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tracing::{debug, info};

/// Sentinel used by SRTM for void samples.
pub const SRTM_VOID: f32 = -32768.0;

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

/// North-up affine mapping from sample indices to geographic coordinates.
///
/// `origin_*` is the center of sample (0, 0), the north-west corner sample.
/// Rows advance southward by `dy` degrees, columns eastward by `dx` degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// Longitude of the center of column 0.
    pub origin_lon: f64,
    /// Latitude of the center of row 0.
    pub origin_lat: f64,
    /// Degrees of longitude per column.
    pub dx: f64,
    /// Degrees of latitude per row.
    pub dy: f64,
}

impl GeoTransform {
    /// Longitude of a column's sample centers.
    pub fn lon(&self, col: usize) -> f64 {
        self.origin_lon + col as f64 * self.dx
    }

    /// Latitude of a row's sample centers.
    pub fn lat(&self, row: usize) -> f64 {
        self.origin_lat - row as f64 * self.dy
    }

    /// Fractional column for a longitude.
    pub fn col_f(&self, lon: f64) -> f64 {
        (lon - self.origin_lon) / self.dx
    }

    /// Fractional row for a latitude.
    pub fn row_f(&self, lat: f64) -> f64 {
        (self.origin_lat - lat) / self.dy
    }

    /// Transform of a sub-window starting at (`row`, `col`).
    pub fn offset(&self, row: usize, col: usize) -> Self {
        Self {
            origin_lon: self.lon(col),
            origin_lat: self.lat(row),
            ..*self
        }
    }

    /// Transform after aggregating `factor_rows` x `factor_cols` samples into one.
    ///
    /// The new origin is the center of the first block.
    pub fn scaled(&self, factor_rows: f64, factor_cols: f64) -> Self {
        Self {
            origin_lon: self.origin_lon + (factor_cols - 1.0) * self.dx / 2.0,
            origin_lat: self.origin_lat - (factor_rows - 1.0) * self.dy / 2.0,
            dx: self.dx * factor_cols,
            dy: self.dy * factor_rows,
        }
    }

    /// Bounds of the sample centers of a `rows` x `cols` grid.
    pub fn extent(&self, rows: usize, cols: usize) -> BoundingBox {
        BoundingBox {
            min_lat: self.lat(rows.saturating_sub(1)),
            min_lon: self.origin_lon,
            max_lat: self.origin_lat,
            max_lon: self.lon(cols.saturating_sub(1)),
        }
    }
}

/// A single-band elevation raster held in memory.
///
/// Samples are row-major, north to south, west to east.
#[derive(Debug, Clone)]
pub struct Raster {
    data: Vec<f32>,
    width: usize,
    height: usize,
    transform: GeoTransform,
    nodata: f32,
}

impl Raster {
    /// Create a raster from raw samples.
    pub fn new(
        data: Vec<f32>,
        width: usize,
        height: usize,
        transform: GeoTransform,
        nodata: f32,
    ) -> Result<Self> {
        let expected = width * height;
        if data.len() != expected || width == 0 || height == 0 {
            return Err(DemError::DimensionMismatch {
                width,
                height,
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            transform,
            nodata,
        })
    }

    /// Load a single-band GeoTIFF.
    ///
    /// The geotransform comes from the ModelTiepoint and ModelPixelScale tags
    /// (pixel-is-area: the tie point is the outer corner of pixel (0, 0)),
    /// and the nodata value from GDAL_NODATA, defaulting to the SRTM void.
    pub fn from_geotiff<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mut decoder = Decoder::new(std::io::BufReader::new(file))?;

        // A merged national SRTM3 mosaic is several hundred MB of f32 samples
        let mut limits = Limits::default();
        limits.decoding_buffer_size = 1024 * 1024 * 1024; // 1 GB
        limits.intermediate_buffer_size = 1024 * 1024 * 1024; // 1 GB
        limits.ifd_value_size = 1024 * 1024 * 1024;
        decoder = decoder.with_limits(limits);

        let (width, height) = decoder.dimensions()?;
        let transform = Self::read_geotransform(&mut decoder)?;
        let data = Self::decode_elevation_data(&mut decoder)?;
        let nodata = Self::read_nodata_value(&mut decoder);

        info!(
            path = %path.display(),
            width,
            height,
            "Loaded GeoTIFF raster"
        );

        Self::new(data, width as usize, height as usize, transform, nodata)
    }

    fn read_geotransform<R: std::io::Read + std::io::Seek>(
        decoder: &mut Decoder<R>,
    ) -> Result<GeoTransform> {
        let tiepoint = decoder
            .get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT))
            .map_err(|_| DemError::InvalidGeoTiff("missing ModelTiepoint tag".into()))?;
        let scale = decoder
            .get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE))
            .map_err(|_| DemError::InvalidGeoTiff("missing ModelPixelScale tag".into()))?;

        if tiepoint.len() < 6 || scale.len() < 2 {
            return Err(DemError::InvalidGeoTiff(format!(
                "tiepoint has {} values and pixel scale {}",
                tiepoint.len(),
                scale.len()
            )));
        }
        if scale[0] <= 0.0 || scale[1] <= 0.0 {
            return Err(DemError::InvalidGeoTiff("non-positive pixel scale".into()));
        }

        // Tiepoint format: [i, j, k, x, y, z] where (i, j) is the raster position of (x, y)
        let (i, j) = (tiepoint[0], tiepoint[1]);
        let corner_lon = tiepoint[3] - i * scale[0];
        let corner_lat = tiepoint[4] + j * scale[1];

        Ok(GeoTransform {
            origin_lon: corner_lon + scale[0] / 2.0,
            origin_lat: corner_lat - scale[1] / 2.0,
            dx: scale[0],
            dy: scale[1],
        })
    }

    fn decode_elevation_data<R: std::io::Read + std::io::Seek>(
        decoder: &mut Decoder<R>,
    ) -> Result<Vec<f32>> {
        let result = decoder.read_image()?;

        match result {
            DecodingResult::F32(data) => Ok(data),
            DecodingResult::F64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U8(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I8(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U64(_) | DecodingResult::I64(_) => Err(DemError::UnsupportedDataType(
                "64-bit integer samples".into(),
            )),
        }
    }

    fn read_nodata_value<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> f32 {
        decoder
            .get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GDAL_NODATA))
            .ok()
            .and_then(|s| s.trim_matches(char::from(0)).trim().parse().ok())
            .unwrap_or(SRTM_VOID)
    }

    /// Write the raster as a float32 GeoTIFF readable by [`Raster::from_geotiff`].
    pub fn write_geotiff<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)?;
        let mut tiff = TiffEncoder::new(BufWriter::new(file))?;
        let mut image =
            tiff.new_image::<colortype::Gray32Float>(self.width as u32, self.height as u32)?;

        let t = &self.transform;
        let scale = [t.dx, t.dy, 0.0];
        let tiepoint = [
            0.0,
            0.0,
            0.0,
            t.origin_lon - t.dx / 2.0,
            t.origin_lat + t.dy / 2.0,
            0.0,
        ];
        // GTModelType = geographic, GTRasterType = pixel-is-area, GeographicType = WGS84
        let geo_keys: [u16; 16] = [1, 1, 0, 3, 1024, 0, 1, 2, 1025, 0, 1, 1, 2048, 0, 1, 4326];
        let nodata = format!("{}", self.nodata);

        let dir = image.encoder();
        dir.write_tag(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE), &scale[..])?;
        dir.write_tag(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT), &tiepoint[..])?;
        dir.write_tag(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY), &geo_keys[..])?;
        dir.write_tag(Tag::from_u16_exhaustive(TAG_GDAL_NODATA), nodata.as_str())?;
        image.write_data(&self.data)?;

        debug!(path = %path.display(), width = self.width, height = self.height, "Wrote GeoTIFF");
        Ok(())
    }

    /// Set every sample whose center fails `keep(lat, lon)` to nodata.
    ///
    /// Used to cut a rectangular mosaic down to a country outline.
    pub fn mask_outside<F>(&mut self, keep: F) -> usize
    where
        F: Fn(f64, f64) -> bool,
    {
        let mut masked = 0;
        for row in 0..self.height {
            let lat = self.transform.lat(row);
            for col in 0..self.width {
                let idx = row * self.width + col;
                if self.data[idx] != self.nodata && !keep(lat, self.transform.lon(col)) {
                    self.data[idx] = self.nodata;
                    masked += 1;
                }
            }
        }
        debug!(masked, "Masked samples outside region");
        masked
    }

    /// Sample value at (`row`, `col`), or `None` for nodata.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        let v = self.data[row * self.width + col];
        (!self.is_nodata(v)).then_some(v)
    }

    /// True if `v` is the nodata sentinel (or NaN).
    pub fn is_nodata(&self, v: f32) -> bool {
        v.is_nan() || v == self.nodata
    }

    /// Raw samples.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Width in samples.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in samples.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The geotransform.
    pub fn transform(&self) -> GeoTransform {
        self.transform
    }

    /// Nodata sentinel.
    pub fn nodata(&self) -> f32 {
        self.nodata
    }

    /// Extent covered by sample centers.
    pub fn bounds(&self) -> BoundingBox {
        self.transform.extent(self.height, self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn transform() -> GeoTransform {
        GeoTransform {
            origin_lon: -79.0,
            origin_lat: 1.0,
            dx: 0.25,
            dy: 0.25,
        }
    }

    #[test]
    fn test_transform_roundtrip() {
        let t = transform();
        assert_relative_eq!(t.lon(4), -78.0);
        assert_relative_eq!(t.lat(4), 0.0);
        assert_relative_eq!(t.col_f(-78.5), 2.0);
        assert_relative_eq!(t.row_f(0.5), 2.0);
    }

    #[test]
    fn test_scaled_transform_centers_blocks() {
        let t = transform().scaled(2.0, 2.0);
        assert_relative_eq!(t.origin_lon, -78.875);
        assert_relative_eq!(t.origin_lat, 0.875);
        assert_relative_eq!(t.dx, 0.5);
    }

    #[test]
    fn test_dimension_mismatch() {
        let r = Raster::new(vec![0.0; 5], 2, 3, transform(), SRTM_VOID);
        assert!(matches!(r, Err(DemError::DimensionMismatch { expected: 6, got: 5, .. })));
    }

    #[test]
    fn test_bounds_and_get() {
        let mut data = vec![100.0; 25];
        data[7] = SRTM_VOID;
        let r = Raster::new(data, 5, 5, transform(), SRTM_VOID).unwrap();
        let b = r.bounds();
        assert_relative_eq!(b.min_lat, 0.0);
        assert_relative_eq!(b.max_lat, 1.0);
        assert_relative_eq!(b.min_lon, -79.0);
        assert_relative_eq!(b.max_lon, -78.0);
        assert_eq!(r.get(0, 0), Some(100.0));
        assert_eq!(r.get(1, 2), None);
        assert_eq!(r.get(5, 0), None);
    }

    #[test]
    fn test_mask_outside() {
        let mut r = Raster::new(vec![10.0; 25], 5, 5, transform(), SRTM_VOID).unwrap();
        let masked = r.mask_outside(|lat, _lon| lat >= 0.5);
        // Rows 3 and 4 lie south of 0.5
        assert_eq!(masked, 10);
        assert_eq!(r.get(2, 0), Some(10.0));
        assert_eq!(r.get(3, 0), None);
    }

    #[test]
    fn test_geotiff_roundtrip() {
        let dir = std::env::temp_dir().join(format!("ecuterra-dem-tiff-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("mosaic.tif");

        let data: Vec<f32> = (0..20).map(|i| i as f32 * 10.0).collect();
        let mut data = data;
        data[3] = SRTM_VOID;
        let r = Raster::new(data, 5, 4, transform(), SRTM_VOID).unwrap();
        r.write_geotiff(&path).unwrap();

        let back = Raster::from_geotiff(&path).unwrap();
        assert_eq!(back.width(), 5);
        assert_eq!(back.height(), 4);
        assert_eq!(back.nodata(), SRTM_VOID);
        assert_eq!(back.data(), r.data());
        assert_relative_eq!(back.transform().origin_lon, -79.0, epsilon = 1e-9);
        assert_relative_eq!(back.transform().origin_lat, 1.0, epsilon = 1e-9);
        assert_relative_eq!(back.transform().dx, 0.25, epsilon = 1e-12);

        std::fs::remove_dir_all(&dir).ok();
    }
}
