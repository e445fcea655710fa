//! Pipeline error type.

use crate::config::ConfigError;
use ecuterra_boundary::{BoundaryError, SelectionError};
use ecuterra_common::GeoError;
use ecuterra_dem::DemError;
use ecuterra_export::ExportError;
use ecuterra_mesh::MeshError;
use thiserror::Error;

/// Any failure while running the terrain pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration could not be loaded or is out of range.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A corner is not a valid latitude/longitude.
    #[error(transparent)]
    Coordinate(#[from] GeoError),

    /// The country outline could not be loaded.
    #[error("Boundary error: {0}")]
    Boundary(#[from] BoundaryError),

    /// The selection was refused; nothing was read or written.
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Elevation data could not be loaded or clipped.
    #[error("Elevation error: {0}")]
    Dem(#[from] DemError),

    /// Mesh construction or smoothing failed.
    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),

    /// Encoding the mesh failed.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Reading or writing job files failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Mesh settings could not be serialized into a job id.
    #[error("Failed to hash job settings: {0}")]
    JobId(#[from] serde_json::Error),
}

impl PipelineError {
    /// Stage name used as a metric label.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "config",
            PipelineError::Coordinate(_) | PipelineError::Selection(_) => "validate",
            PipelineError::Boundary(_) => "boundary",
            PipelineError::Dem(_) => "clip",
            PipelineError::Mesh(_) => "mesh",
            PipelineError::Export(_) => "export",
            PipelineError::Io(_) => "io",
            PipelineError::JobId(_) => "store",
        }
    }

    /// True for errors caused by the request rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Coordinate(_)
                | PipelineError::Selection(_)
                | PipelineError::Dem(DemError::NoElevationData { .. })
                | PipelineError::Export(ExportError::UnsupportedFormat(_))
        )
    }
}
