//! Selection to artifact orchestration.

use crate::config::{ClipConfig, ConfigError, ElevationInput, MeshConfig, PipelineConfig, SmoothingConfig};
use crate::job::{job_id, JobStatus, JobStore};
use crate::PipelineError;
use chrono::Local;
use ecuterra_boundary::{BoundaryStore, SelectionValidator};
use ecuterra_common::{BoundingBox, GeoPoint};
use ecuterra_dem::{ElevationSource, HeightfieldClipper};
use ecuterra_export::{ExportArtifact, ExportFormat, ModelExporter};
use ecuterra_mesh::{Mesh, MeshBuilder, MeshSmoother};
use ecuterra_metrics::{metric_defs, StageTimer};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of [`Pipeline::preview`]. Nothing is written to disk.
#[derive(Debug, Clone)]
pub struct PreviewOutput {
    /// Normalized selection.
    pub bbox: BoundingBox,
    /// Smoothed and decimated terrain mesh.
    pub mesh: Mesh,
    /// The mesh as GLB, ready to hand to a viewer.
    pub glb: ExportArtifact,
}

/// Result of [`Pipeline::export`].
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Stable id derived from the box, format and mesh settings.
    pub job_id: String,
    /// Normalized selection.
    pub bbox: BoundingBox,
    /// Final artifact path inside the job directory.
    pub path: PathBuf,
    /// Bytes that were written to `path`.
    pub artifact: ExportArtifact,
}

/// Settings that change the generated mesh, hashed into job ids.
#[derive(Serialize)]
struct MeshSettings<'a> {
    clip: &'a ClipConfig,
    mesh: &'a MeshConfig,
    smoothing: &'a SmoothingConfig,
}

/// The terrain pipeline: validate, clip, build, smooth, export.
///
/// Boundary and elevation data are loaded once and shared read-only, so a
/// `Pipeline` can serve requests from several threads.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    validator: SelectionValidator,
    clipper: HeightfieldClipper,
    builder: MeshBuilder,
    smoother: MeshSmoother,
    exporter: ModelExporter,
    jobs: JobStore,
}

impl Pipeline {
    /// Load the boundary and elevation data named by `config`.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let boundary = {
            let _timer = StageTimer::start("load_boundary");
            Arc::new(BoundaryStore::from_path(&config.boundary_path)?)
        };
        let source = {
            let _timer = StageTimer::start("load_elevation");
            let input = config.elevation.input().ok_or_else(|| {
                ConfigError::Invalid("elevation needs exactly one of mosaic_path or hgt_dir".into())
            })?;
            match input {
                ElevationInput::Mosaic(path) => ElevationSource::from_geotiff(path)?,
                ElevationInput::HgtDirectory(dir) => ElevationSource::from_hgt_directory(dir)?,
            }
        };
        Ok(Self::from_parts(config, boundary, Arc::new(source)))
    }

    /// Assemble a pipeline from already loaded data.
    pub fn from_parts(
        config: PipelineConfig,
        boundary: Arc<BoundaryStore>,
        source: Arc<ElevationSource>,
    ) -> Self {
        let bounds = source.bounds();
        info!(
            %bounds,
            width = source.raster().width(),
            height = source.raster().height(),
            "Elevation source ready"
        );
        let samples = source.raster().width() * source.raster().height();
        metrics::gauge!(metric_defs::SOURCE_SAMPLES.name).set(samples as f64);

        Self {
            validator: SelectionValidator::new(boundary),
            clipper: HeightfieldClipper::with_options(source, config.clip_options()),
            builder: MeshBuilder::new(config.build_options()),
            smoother: MeshSmoother::new(config.smooth_params()),
            exporter: ModelExporter::new(),
            jobs: JobStore::new(config.output_dir.clone()),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    /// Generate a mesh for the box spanned by `p1` and `p2` and return it
    /// with its GLB encoding.
    pub fn preview(&self, p1: GeoPoint, p2: GeoPoint) -> Result<PreviewOutput, PipelineError> {
        metrics::counter!(metric_defs::REQUESTS.name, "mode" => "preview").increment(1);
        let result = self.validate(p1, p2).and_then(|bbox| {
            let mesh = self.generate(&bbox)?;
            let glb = self.encode(&mesh, ExportFormat::Glb)?;
            Ok(PreviewOutput { bbox, mesh, glb })
        });
        record_failure("preview", &result);
        result
    }

    /// Generate a mesh and write it as `format` into its job directory.
    pub fn export(
        &self,
        p1: GeoPoint,
        p2: GeoPoint,
        format: ExportFormat,
    ) -> Result<ExportJob, PipelineError> {
        metrics::counter!(metric_defs::REQUESTS.name, "mode" => "export").increment(1);
        let result = self.validate(p1, p2).and_then(|bbox| {
            let job_id = self.job_id(&bbox, format)?;
            let mesh = self.generate(&bbox)?;
            let artifact = self.encode(&mesh, format)?;
            let path = {
                let _timer = StageTimer::start("store");
                self.jobs.store(&job_id, &artifact, Local::now().naive_local())?
            };
            info!(job_id = %job_id, path = %path.display(), bytes = artifact.len(), "Export complete");
            Ok(ExportJob {
                job_id,
                bbox,
                path,
                artifact,
            })
        });
        record_failure("export", &result);
        result
    }

    /// Look up an export job.
    pub fn status(&self, job_id: &str) -> Result<JobStatus, PipelineError> {
        Ok(self.jobs.status(job_id)?)
    }

    /// Id an export of `bbox` as `format` would get with the current settings.
    pub fn job_id(&self, bbox: &BoundingBox, format: ExportFormat) -> Result<String, PipelineError> {
        let settings = MeshSettings {
            clip: &self.config.clip,
            mesh: &self.config.mesh,
            smoothing: &self.config.smoothing,
        };
        Ok(job_id(bbox, format, &settings)?)
    }

    fn validate(&self, p1: GeoPoint, p2: GeoPoint) -> Result<BoundingBox, PipelineError> {
        let _timer = StageTimer::start("validate");
        self.validator
            .validate(p1, p2, self.config.max_area_km2)
            .map_err(|e| {
                warn!(%p1, %p2, reason = e.reason(), "Selection rejected");
                metrics::counter!(metric_defs::SELECTIONS_REJECTED.name, "reason" => e.reason())
                    .increment(1);
                PipelineError::from(e)
            })
    }

    fn generate(&self, bbox: &BoundingBox) -> Result<Mesh, PipelineError> {
        let grid = {
            let _timer = StageTimer::start("clip");
            self.clipper.clip(bbox)?
        };
        metrics::histogram!(metric_defs::GRID_CELLS.name).record(grid.cell_count() as f64);

        let mesh = {
            let _timer = StageTimer::start("mesh");
            self.builder.build(grid)?
        };

        let mesh = {
            let _timer = StageTimer::start("smooth");
            let smoothing = &self.config.smoothing;
            self.smoother
                .smooth(mesh, smoothing.iterations, smoothing.decimate_ratio)?
        };
        metrics::histogram!(metric_defs::MESH_FACES.name).record(mesh.face_count() as f64);
        Ok(mesh)
    }

    fn encode(&self, mesh: &Mesh, format: ExportFormat) -> Result<ExportArtifact, PipelineError> {
        let _timer = StageTimer::start("export");
        let artifact = self.exporter.export(mesh, format)?;
        metrics::histogram!(metric_defs::EXPORT_BYTES.name, "format" => format.name())
            .record(artifact.len() as f64);
        Ok(artifact)
    }
}

fn record_failure<T>(mode: &'static str, result: &Result<T, PipelineError>) {
    if let Err(e) = result {
        if !matches!(e, PipelineError::Selection(_)) {
            warn!(mode, stage = e.stage(), error = %e, "Request failed");
            metrics::counter!(metric_defs::REQUESTS_FAILED.name, "mode" => mode, "stage" => e.stage())
                .increment(1);
        }
    }
}
