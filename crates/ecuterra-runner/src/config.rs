//! Pipeline configuration loaded from YAML.
//!
//! Every field has a default, so an empty document is a valid
//! configuration:
//!
//! ```yaml
//! boundary_path: data/ecuador_simplified.geojson
//! elevation:
//!   hgt_dir: hgt_files
//! output_dir: outputs
//! max_area_km2: 2000.0
//! smoothing:
//!   iterations: 2
//!   decimate_ratio: 0.5
//! ```

use ecuterra_dem::{ClipOptions, DEFAULT_MAX_CELLS};
use ecuterra_mesh::{BuildOptions, SmoothParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Where elevation data comes from. Exactly one field must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElevationConfig {
    /// Pre-merged GeoTIFF mosaic.
    #[serde(default)]
    pub mosaic_path: Option<PathBuf>,
    /// Directory of SRTM `.hgt` tiles, merged at startup.
    #[serde(default)]
    pub hgt_dir: Option<PathBuf>,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            mosaic_path: None,
            hgt_dir: Some(PathBuf::from("hgt_files")),
        }
    }
}

/// Resolved elevation input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevationInput<'a> {
    Mosaic(&'a Path),
    HgtDirectory(&'a Path),
}

impl ElevationConfig {
    /// The configured input, or `None` unless exactly one is set.
    pub fn input(&self) -> Option<ElevationInput<'_>> {
        match (&self.mosaic_path, &self.hgt_dir) {
            (Some(path), None) => Some(ElevationInput::Mosaic(path)),
            (None, Some(dir)) => Some(ElevationInput::HgtDirectory(dir)),
            _ => None,
        }
    }
}

/// Heightfield clipping settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClipConfig {
    pub max_cells: usize,
    pub gaussian_sigma: f64,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            max_cells: DEFAULT_MAX_CELLS,
            gaussian_sigma: 0.0,
        }
    }
}

/// Mesh construction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeshConfig {
    pub horizontal_scale: f64,
    pub vertical_scale: f64,
    pub add_base: bool,
    pub base_height: Option<f64>,
    pub vertex_colors: bool,
}

impl Default for MeshConfig {
    fn default() -> Self {
        let opts = BuildOptions::default();
        Self {
            horizontal_scale: opts.horizontal_scale,
            vertical_scale: opts.vertical_scale,
            add_base: opts.add_base,
            base_height: opts.base_height,
            vertex_colors: opts.vertex_colors,
        }
    }
}

/// Smoothing and decimation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmoothingConfig {
    pub iterations: usize,
    pub decimate_ratio: f64,
    pub lambda: f64,
    pub feature_angle_deg: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        let params = SmoothParams::default();
        Self {
            iterations: 2,
            decimate_ratio: 1.0,
            lambda: params.lambda,
            feature_angle_deg: params.feature_angle_deg,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// GeoJSON country outline.
    pub boundary_path: PathBuf,
    pub elevation: ElevationConfig,
    /// Root directory for export jobs.
    pub output_dir: PathBuf,
    /// Largest selection accepted, in km².
    pub max_area_km2: f64,
    pub clip: ClipConfig,
    pub mesh: MeshConfig,
    pub smoothing: SmoothingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            boundary_path: PathBuf::from("data/ecuador_simplified.geojson"),
            elevation: ElevationConfig::default(),
            output_dir: PathBuf::from("outputs"),
            max_area_km2: 2000.0,
            clip: ClipConfig::default(),
            mesh: MeshConfig::default(),
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Read and validate a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        // serde_yaml rejects an empty document
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and that exactly one elevation input is set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_area_km2", self.max_area_km2),
            ("mesh.horizontal_scale", self.mesh.horizontal_scale),
            ("mesh.vertical_scale", self.mesh.vertical_scale),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{} must be positive, got {}", name, value)));
            }
        }

        let ratio = self.smoothing.decimate_ratio;
        if !(ratio.is_finite() && ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "smoothing.decimate_ratio must be in (0, 1], got {}",
                ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing.lambda) {
            return Err(ConfigError::Invalid(format!(
                "smoothing.lambda must be in [0, 1], got {}",
                self.smoothing.lambda
            )));
        }
        if self.clip.max_cells < 4 {
            return Err(ConfigError::Invalid("clip.max_cells must be at least 4".into()));
        }
        if !(self.clip.gaussian_sigma.is_finite() && self.clip.gaussian_sigma >= 0.0) {
            return Err(ConfigError::Invalid("clip.gaussian_sigma must be non-negative".into()));
        }
        if self.elevation.input().is_none() {
            return Err(ConfigError::Invalid(
                "elevation needs exactly one of mosaic_path or hgt_dir".into(),
            ));
        }
        Ok(())
    }

    pub fn clip_options(&self) -> ClipOptions {
        ClipOptions {
            max_cells: self.clip.max_cells,
            gaussian_sigma: self.clip.gaussian_sigma,
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            horizontal_scale: self.mesh.horizontal_scale,
            vertical_scale: self.mesh.vertical_scale,
            add_base: self.mesh.add_base,
            base_height: self.mesh.base_height,
            vertex_colors: self.mesh.vertex_colors,
        }
    }

    pub fn smooth_params(&self) -> SmoothParams {
        SmoothParams {
            lambda: self.smoothing.lambda,
            feature_angle_deg: self.smoothing.feature_angle_deg,
            ..SmoothParams::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = PipelineConfig::from_yaml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(
            config.elevation.input(),
            Some(ElevationInput::HgtDirectory(Path::new("hgt_files")))
        );
    }

    #[test]
    fn test_partial_document() {
        let yaml = r#"
elevation:
  mosaic_path: data/mosaic.tif
max_area_km2: 50
smoothing:
  decimate_ratio: 0.25
"#;
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.max_area_km2, 50.0);
        assert_eq!(config.smoothing.decimate_ratio, 0.25);
        assert_eq!(config.smoothing.iterations, 2);
        assert_eq!(
            config.elevation.input(),
            Some(ElevationInput::Mosaic(Path::new("data/mosaic.tif")))
        );
        assert_eq!(config.build_options(), BuildOptions::default());
    }

    #[test]
    fn test_rejects_invalid_values() {
        for yaml in [
            "max_area_km2: 0",
            "smoothing:\n  decimate_ratio: 1.5",
            "smoothing:\n  decimate_ratio: 0",
            "mesh:\n  vertical_scale: -1",
            "elevation:\n  mosaic_path: a.tif\n  hgt_dir: hgt",
            "elevation: {}",
        ] {
            let err = PipelineConfig::from_yaml_str(yaml);
            assert!(matches!(err, Err(ConfigError::Invalid(_))), "accepted {:?}", yaml);
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = PipelineConfig::from_yaml_str("max_area: 10");
        assert!(matches!(err, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/ecuterra.yaml");
        assert_eq!(PipelineConfig::load(path).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut config = PipelineConfig::default();
        config.mesh.base_height = Some(-100.0);
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert_eq!(PipelineConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
