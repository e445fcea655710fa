//! # ecuterra-mesh
//!
//! Turns clipped elevation grids into triangle meshes ready for export.
//!
//! [`MeshBuilder`] triangulates a grid (two triangles per cell) and can close
//! it into a printable solid with a flat base and perimeter walls.
//! [`MeshSmoother`] then relaxes the surface with Laplacian smoothing and
//! reduces it with quadric-error edge collapse.
//!
//! ```no_run
//! # use ecuterra_dem::ElevationGrid;
//! # fn grid() -> ElevationGrid { unimplemented!() }
//! use ecuterra_mesh::{BuildOptions, MeshBuilder, MeshSmoother, SmoothParams};
//!
//! let mesh = MeshBuilder::new(BuildOptions::default()).build(grid())?;
//! let mesh = MeshSmoother::new(SmoothParams::default()).smooth(mesh, 2, 0.5)?;
//! assert!(mesh.is_watertight());
//! # Ok::<(), ecuterra_mesh::MeshError>(())
//! ```

mod builder;
pub mod colormap;
mod decimate;
mod error;
mod mesh;
mod quadric;
mod smooth;

pub use builder::{BuildOptions, MeshBuilder};
pub use decimate::{decimate, DecimationStats};
pub use error::MeshError;
pub use mesh::Mesh;
pub use quadric::Quadric;
pub use smooth::{MeshSmoother, SmoothParams};

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
