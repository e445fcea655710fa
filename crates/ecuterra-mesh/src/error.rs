//! Error types for mesh construction and processing.

use thiserror::Error;

/// Errors that can occur when building or processing a mesh.
#[derive(Debug, Error)]
pub enum MeshError {
    /// The elevation grid cannot produce a surface.
    #[error("Empty grid: {0}")]
    EmptyGrid(String),

    /// Decimation ratio outside (0, 1].
    #[error("Invalid decimation ratio: {0} (must be in (0, 1])")]
    InvalidRatio(f64),

    /// Mesh violates a structural invariant.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MeshError::InvalidRatio(1.5);
        assert!(err.to_string().contains("1.5"));

        let err = MeshError::EmptyGrid("no valid samples".into());
        assert_eq!(err.to_string(), "Empty grid: no valid samples");
    }
}
