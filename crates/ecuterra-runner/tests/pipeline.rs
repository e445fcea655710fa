//! End-to-end pipeline runs on a synthetic boundary and elevation source.

use ecuterra_boundary::{BoundaryStore, SelectionError};
use ecuterra_common::GeoPoint;
use ecuterra_dem::{DemError, ElevationSource, GeoTransform, Raster, SRTM_VOID};
use ecuterra_export::{read_glb, read_stl, ExportFormat};
use ecuterra_runner::{JobStatus, Pipeline, PipelineConfig, PipelineError};
use std::path::PathBuf;
use std::sync::Arc;

/// Rectangle around the raster, a little wider on every side.
const BOUNDARY: &str = r#"{
  "type": "Feature",
  "properties": { "name": "test" },
  "geometry": {
    "type": "Polygon",
    "coordinates": [[[-79.2, -1.2], [-77.8, -1.2], [-77.8, 0.7], [-79.2, 0.7], [-79.2, -1.2]]]
  }
}"#;

const SAMPLES_PER_DEGREE: usize = 300;

/// Rolling terrain covering latitude -1..0.5 and longitude -79..-78.
fn source() -> Arc<ElevationSource> {
    let cols = SAMPLES_PER_DEGREE + 1;
    let rows = SAMPLES_PER_DEGREE * 3 / 2 + 1;
    let data = (0..rows * cols)
        .map(|i| {
            let (r, c) = ((i / cols) as f32, (i % cols) as f32);
            2500.0 + 400.0 * (r / 17.0).sin() * (c / 23.0).cos()
        })
        .collect();
    let step = 1.0 / SAMPLES_PER_DEGREE as f64;
    let transform = GeoTransform {
        origin_lon: -79.0,
        origin_lat: 0.5,
        dx: step,
        dy: step,
    };
    let raster = Raster::new(data, cols, rows, transform, SRTM_VOID).unwrap();
    Arc::new(ElevationSource::from_raster(raster))
}

fn output_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ecuterra-runner-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn pipeline(name: &str, max_area_km2: f64) -> Pipeline {
    let mut config = PipelineConfig {
        output_dir: output_dir(name),
        max_area_km2,
        ..Default::default()
    };
    config.smoothing.decimate_ratio = 0.5;
    config.validate().unwrap();
    let boundary = Arc::new(BoundaryStore::from_geojson_str(BOUNDARY).unwrap());
    Pipeline::from_parts(config, boundary, source())
}

fn pt(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint::new(lat, lon).unwrap()
}

#[test]
fn test_preview_builds_printable_mesh_without_writing() {
    let pipeline = pipeline("preview", 2000.0);
    let preview = pipeline.preview(pt(0.0, -78.5), pt(-0.1, -78.4)).unwrap();

    assert!(preview.mesh.is_watertight());
    assert!(preview.mesh.face_count() > 0);
    assert!(preview.bbox.area_km2() > 100.0 && preview.bbox.area_km2() < 150.0);

    let doc = read_glb(preview.glb.as_bytes()).unwrap().json;
    assert_eq!(doc["asset"]["extras"]["faces"], preview.mesh.face_count());
    assert!(!pipeline.config().output_dir.exists());
}

#[test]
fn test_export_writes_job_and_reports_done() {
    let pipeline = pipeline("export", 2000.0);
    let job = pipeline
        .export(pt(0.0, -78.5), pt(-0.1, -78.4), ExportFormat::Stl)
        .unwrap();

    assert!(job.path.starts_with(pipeline.config().output_dir.join(&job.job_id)));
    let name = job.path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("ecuador_") && name.ends_with(".stl"), "{}", name);
    // ecuador_YYYYmmdd_HHMMSS.stl
    assert_eq!(name.len(), "ecuador_".len() + 15 + ".stl".len());

    let bytes = std::fs::read(&job.path).unwrap();
    assert_eq!(bytes, job.artifact.as_bytes());
    assert!(read_stl(&bytes).unwrap().is_watertight());

    assert_eq!(pipeline.status(&job.job_id).unwrap(), JobStatus::Done(job.path.clone()));
    let _ = std::fs::remove_dir_all(&pipeline.config().output_dir);
}

#[test]
fn test_same_request_same_job_id() {
    let pipeline = pipeline("job-id", 2000.0);
    let a = pipeline.export(pt(0.0, -78.5), pt(-0.1, -78.4), ExportFormat::Glb).unwrap();
    // Corners given in the other order describe the same box
    let b = pipeline.export(pt(-0.1, -78.4), pt(0.0, -78.5), ExportFormat::Glb).unwrap();
    assert_eq!(a.job_id, b.job_id);
    assert_eq!(a.artifact, b.artifact);
    assert_eq!(pipeline.job_id(&a.bbox, ExportFormat::Glb).unwrap(), a.job_id);

    let stl = pipeline.export(pt(0.0, -78.5), pt(-0.1, -78.4), ExportFormat::Stl).unwrap();
    assert_ne!(a.job_id, stl.job_id);
    let _ = std::fs::remove_dir_all(&pipeline.config().output_dir);
}

#[test]
fn test_area_cap() {
    let pipeline = pipeline("area", 50.0);
    let err = pipeline.preview(pt(0.0, -78.5), pt(-0.1, -78.4)).unwrap_err();
    match err {
        PipelineError::Selection(SelectionError::AreaTooLarge { area_km2, max_km2 }) => {
            assert!(area_km2 > 120.0 && area_km2 < 130.0);
            assert_eq!(max_km2, 50.0);
        }
        other => panic!("expected AreaTooLarge, got {:?}", other),
    }

    let small = pipeline.preview(pt(0.0, -78.5), pt(-0.01, -78.49)).unwrap();
    assert!(small.bbox.area_km2() < 2.0);
}

#[test]
fn test_rejections_write_nothing() {
    let pipeline = pipeline("rejected", 2000.0);

    let err = pipeline
        .export(pt(0.0, -78.0), pt(-0.1, -77.5), ExportFormat::Glb)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Selection(SelectionError::OutOfBounds)));
    assert!(err.is_client_error());

    let err = pipeline
        .export(pt(-0.2, -78.3), pt(-0.2, -78.3), ExportFormat::Glb)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Selection(SelectionError::DegenerateSelection)));

    assert!(!pipeline.config().output_dir.exists());
}

#[test]
fn test_selection_without_elevation_data() {
    // Inside the boundary but west of the raster
    let pipeline = pipeline("no-data", 2000.0);
    let err = pipeline.preview(pt(0.0, -79.15), pt(-0.05, -79.1)).unwrap_err();
    assert!(matches!(err, PipelineError::Dem(DemError::NoElevationData { .. })));
    assert!(err.is_client_error());
}

#[test]
fn test_status_of_unknown_job() {
    let pipeline = pipeline("status", 2000.0);
    assert_eq!(pipeline.status("0123456789abcdef").unwrap(), JobStatus::NotFound);
    assert_eq!(pipeline.status("not-a-job").unwrap(), JobStatus::NotFound);
}
