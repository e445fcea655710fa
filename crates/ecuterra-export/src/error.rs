//! Error types for model export.

use thiserror::Error;

/// Errors that can occur when exporting or reading back a model.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The mesh has no faces to export.
    #[error("Mesh has no faces")]
    EmptyMesh,

    /// Format name not recognized.
    #[error("Unsupported export format: {0} (expected glb, stl or stl-ascii)")]
    UnsupportedFormat(String),

    /// The mesh failed validation.
    #[error("Invalid mesh: {0}")]
    Mesh(#[from] ecuterra_mesh::MeshError),

    /// I/O error writing an artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// STL data could not be parsed.
    #[error("Invalid STL: {0}")]
    InvalidStl(String),

    /// GLB container could not be parsed.
    #[error("Invalid GLB: {0}")]
    InvalidGlb(String),

    /// glTF JSON serialization or parsing failed.
    #[error("glTF JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
