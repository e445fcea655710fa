//! # ecuterra-export
//!
//! Serializes terrain meshes for viewing and printing.
//!
//! - GLB (binary glTF 2.0) with normals and vertex colors, converted to
//!   glTF's Y-up frame
//! - Binary STL and ASCII STL for slicers
//!
//! Exports are deterministic, so an artifact can be cached or compared by
//! its bytes. [`read_stl`] and [`read_glb`] parse artifacts back for
//! checks.
//!
//! ```no_run
//! # use ecuterra_mesh::Mesh;
//! # fn mesh() -> Mesh { unimplemented!() }
//! use ecuterra_export::{ExportFormat, ModelExporter};
//!
//! let format: ExportFormat = "glb".parse()?;
//! let artifact = ModelExporter::new().export(&mesh(), format)?;
//! artifact.write_to("outputs/terrain.glb")?;
//! # Ok::<(), ecuterra_export::ExportError>(())
//! ```

mod error;
mod exporter;
mod format;
mod glb;
mod stl;

pub use error::ExportError;
pub use exporter::{ExportArtifact, ModelExporter};
pub use format::ExportFormat;
pub use glb::{read_glb, GlbChunks, GENERATOR};
pub use stl::read_stl;

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;
