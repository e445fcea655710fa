//! Format dispatch and export artifacts.

use crate::format::ExportFormat;
use crate::{glb, stl, ExportError, Result};
use ecuterra_mesh::Mesh;
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Serialized model bytes tagged with their format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    format: ExportFormat,
    bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Format of the bytes.
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Serialized model.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the artifact, returning the bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if no bytes were produced.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the bytes to `path`, creating parent directories.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &self.bytes)?;
        debug!(path = %path.display(), bytes = self.bytes.len(), "Wrote artifact");
        Ok(())
    }
}

/// Serializes meshes to GLB or STL.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelExporter;

impl ModelExporter {
    /// Exporter with default settings.
    pub fn new() -> Self {
        Self
    }

    /// Serialize `mesh` in `format`.
    ///
    /// Output is deterministic: the same mesh always yields the same bytes.
    /// GLB needs vertex normals; they are computed on a copy when the mesh
    /// has none.
    pub fn export(&self, mesh: &Mesh, format: ExportFormat) -> Result<ExportArtifact> {
        if mesh.is_empty() {
            return Err(ExportError::EmptyMesh);
        }
        mesh.validate()?;

        let bytes = match format {
            ExportFormat::Glb => {
                let with_normals = match mesh.normals {
                    Some(ref n) if n.len() == mesh.vertex_count() => Cow::Borrowed(mesh),
                    _ => {
                        let mut owned = mesh.clone();
                        owned.compute_normals();
                        Cow::Owned(owned)
                    }
                };
                let normals = with_normals.normals.as_deref().unwrap_or_default();
                glb::write_glb(&with_normals, normals)?
            }
            ExportFormat::Stl => stl::write_binary(mesh),
            ExportFormat::StlAscii => stl::write_ascii(mesh),
        };

        info!(
            format = %format,
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            bytes = bytes.len(),
            "Exported model"
        );
        Ok(ExportArtifact { format, bytes })
    }
}
