//! # ecuterra-runner
//!
//! Runs the terrain pipeline end to end: a rectangular selection of
//! Ecuadorian territory in, a watertight terrain model out.
//!
//! ```text
//! SelectionValidator -> HeightfieldClipper -> MeshBuilder -> MeshSmoother -> ModelExporter
//! ```
//!
//! [`Pipeline::preview`] returns the mesh and its GLB encoding without
//! touching disk. [`Pipeline::export`] writes the artifact into a job
//! directory keyed by a stable id, which [`Pipeline::status`] can poll.
//!
//! ```no_run
//! use ecuterra_common::GeoPoint;
//! use ecuterra_export::ExportFormat;
//! use ecuterra_runner::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::load("config/ecuterra.yaml")?;
//! let pipeline = Pipeline::new(config)?;
//! let job = pipeline.export(
//!     GeoPoint::new(0.0, -78.5)?,
//!     GeoPoint::new(-0.1, -78.4)?,
//!     ExportFormat::Stl,
//! )?;
//! println!("{} -> {}", job.job_id, job.path.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
mod error;
pub mod job;
mod pipeline;

pub use config::{ConfigError, PipelineConfig};
pub use error::PipelineError;
pub use job::{JobStatus, JobStore};
pub use pipeline::{ExportJob, Pipeline, PreviewOutput};
