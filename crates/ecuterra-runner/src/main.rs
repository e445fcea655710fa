//! `ecuterra` command-line interface.

use clap::{Parser, Subcommand};
use ecuterra_boundary::BoundaryStore;
use ecuterra_common::GeoPoint;
use ecuterra_dem::TileIndex;
use ecuterra_export::ExportFormat;
use ecuterra_runner::{JobStatus, Pipeline, PipelineConfig, PipelineError};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

#[derive(Parser)]
#[command(name = "ecuterra")]
#[command(about = "Generate 3D terrain models of Ecuador from SRTM elevation data", long_about = None)]
#[command(version)]
struct Cli {
    /// Pipeline configuration file (YAML). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a mesh and print its summary without writing a job
    Preview {
        /// First corner as LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        from: GeoPoint,

        /// Opposite corner as LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        to: GeoPoint,

        /// Also write the preview GLB here
        #[arg(long)]
        glb: Option<PathBuf>,
    },

    /// Generate a mesh and write it into a job directory
    Export {
        /// First corner as LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        from: GeoPoint,

        /// Opposite corner as LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        to: GeoPoint,

        /// Output format: glb, stl or stl-ascii
        #[arg(short, long, default_value = "glb")]
        format: ExportFormat,
    },

    /// Report the state of an export job
    Status {
        /// Job id printed by `export`
        job_id: String,
    },

    /// Merge a directory of HGT tiles into one GeoTIFF
    Mosaic {
        /// Directory containing .hgt tiles
        #[arg(long)]
        hgt_dir: PathBuf,

        /// GeoTIFF to write
        #[arg(short, long)]
        output: PathBuf,

        /// Set samples outside the configured boundary to nodata
        #[arg(long)]
        mask_boundary: bool,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, PipelineError> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            Ok(PipelineConfig::load(path)?)
        }
        None => {
            let config = PipelineConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: failed to format output: {}", e),
    }
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    let config = load_config(cli.config.as_deref())?;
    ecuterra_metrics::describe_metrics();

    match cli.command {
        Commands::Preview { from, to, glb } => {
            let pipeline = Pipeline::new(config)?;
            let preview = pipeline.preview(from, to)?;
            if let Some(path) = &glb {
                preview.glb.write_to(path)?;
            }
            let (lo, hi) = preview.mesh.bounds().unwrap_or(([0.0; 3], [0.0; 3]));
            print_json(&json!({
                "status": "ok",
                "bbox": preview.bbox,
                "area_km2": preview.bbox.area_km2(),
                "vertices": preview.mesh.vertex_count(),
                "faces": preview.mesh.face_count(),
                "watertight": preview.mesh.is_watertight(),
                "extent_m": [hi[0] - lo[0], hi[1] - lo[1], hi[2] - lo[2]],
                "glb_bytes": preview.glb.len(),
                "glb_path": glb,
            }));
        }
        Commands::Export { from, to, format } => {
            let pipeline = Pipeline::new(config)?;
            let job = pipeline.export(from, to, format)?;
            print_json(&json!({
                "status": "ok",
                "job_id": job.job_id,
                "format": format,
                "path": job.path,
                "bytes": job.artifact.len(),
                "mime_type": format.mime_type(),
            }));
        }
        Commands::Status { job_id } => {
            // Status only needs the output directory, not the data sets
            let jobs = ecuterra_runner::JobStore::new(&config.output_dir);
            let status = jobs.status(&job_id)?;
            let path = match &status {
                JobStatus::Done(path) => Some(path.clone()),
                _ => None,
            };
            print_json(&json!({
                "job_id": job_id,
                "status": status.as_str(),
                "path": path,
            }));
        }
        Commands::Mosaic {
            hgt_dir,
            output,
            mask_boundary,
        } => {
            let mut index = TileIndex::new();
            let tiles = index.add_directory(&hgt_dir)?;
            info!(tiles, dir = %hgt_dir.display(), "Indexed HGT tiles");
            let mut raster = index.merge()?;
            if mask_boundary {
                let boundary = BoundaryStore::from_path(&config.boundary_path)?;
                let masked = raster.mask_outside(|lat, lon| {
                    boundary.contains_point(GeoPoint { lat, lon })
                });
                info!(masked, "Masked samples outside the boundary");
            }
            raster.write_geotiff(&output)?;
            print_json(&json!({
                "status": "ok",
                "tiles": tiles,
                "width": raster.width(),
                "height": raster.height(),
                "path": output,
            }));
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_json(&json!({ "status": "error", "message": e.to_string() }));
            if e.is_client_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
