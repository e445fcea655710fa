//! End-to-end export checks on terrain meshes.

use ecuterra_dem::{ElevationGrid, GeoTransform, SRTM_VOID};
use ecuterra_export::{read_glb, read_stl, ExportError, ExportFormat, ModelExporter};
use ecuterra_mesh::{BuildOptions, Mesh, MeshBuilder};

fn terrain(rows: usize, cols: usize) -> ElevationGrid {
    let data = (0..rows * cols)
        .map(|i| {
            let (r, c) = ((i / cols) as f32, (i % cols) as f32);
            2800.0 + 150.0 * (r * 0.3).sin() + 90.0 * (c * 0.2).cos()
        })
        .collect();
    let transform = GeoTransform {
        origin_lon: -78.55,
        origin_lat: -0.15,
        dx: 1.0 / 1200.0,
        dy: 1.0 / 1200.0,
    };
    ElevationGrid::new(data, rows, cols, transform, SRTM_VOID).unwrap()
}

fn solid() -> Mesh {
    MeshBuilder::default().build(terrain(20, 30)).unwrap()
}

#[test]
fn test_binary_stl_round_trip_is_watertight() {
    let mesh = solid();
    let artifact = ModelExporter::new().export(&mesh, ExportFormat::Stl).unwrap();
    assert_eq!(artifact.len(), 84 + 50 * mesh.face_count());

    let back = read_stl(artifact.as_bytes()).unwrap();
    assert_eq!(back.face_count(), mesh.face_count());
    assert_eq!(back.vertex_count(), mesh.vertex_count());
    assert!(back.is_watertight());
}

#[test]
fn test_ascii_stl_round_trip() {
    let mesh = solid();
    let artifact = ModelExporter::new().export(&mesh, ExportFormat::StlAscii).unwrap();
    assert!(artifact.as_bytes().starts_with(b"solid"));

    let back = read_stl(artifact.as_bytes()).unwrap();
    assert_eq!(back.face_count(), mesh.face_count());
    assert!(back.is_watertight());
}

#[test]
fn test_exports_are_deterministic() {
    let exporter = ModelExporter::new();
    for format in ExportFormat::ALL {
        let a = exporter.export(&solid(), format).unwrap();
        let b = exporter.export(&solid(), format).unwrap();
        assert_eq!(a, b, "{} output differs between runs", format);
    }
}

#[test]
fn test_glb_document() {
    let mesh = solid();
    let artifact = ModelExporter::new().export(&mesh, ExportFormat::Glb).unwrap();
    let chunks = read_glb(artifact.as_bytes()).unwrap();
    let doc = &chunks.json;

    assert_eq!(doc["asset"]["version"], "2.0");
    assert_eq!(doc["asset"]["extras"]["faces"], mesh.face_count());
    assert_eq!(doc["asset"]["extras"]["vertices"], mesh.vertex_count());

    let primitive = &doc["meshes"][0]["primitives"][0];
    assert_eq!(primitive["mode"], 4);
    assert!(primitive["attributes"]["COLOR_0"].is_u64());

    let accessors = doc["accessors"].as_array().unwrap();
    assert_eq!(accessors.len(), 4);
    assert_eq!(accessors[0]["count"], mesh.vertex_count());
    let indices = primitive["indices"].as_u64().unwrap() as usize;
    assert_eq!(accessors[indices]["count"], mesh.face_count() * 3);

    // Y-up: the glTF height range equals the mesh z range
    let (lo, hi) = mesh.bounds().unwrap();
    let min_y = accessors[0]["min"][1].as_f64().unwrap();
    let max_y = accessors[0]["max"][1].as_f64().unwrap();
    assert!((min_y - lo[2]).abs() < 0.01);
    assert!((max_y - hi[2]).abs() < 0.01);

    let declared = doc["buffers"][0]["byteLength"].as_u64().unwrap() as usize;
    assert!(declared <= chunks.bin.len());
    assert_eq!(chunks.bin.len() % 4, 0);
}

#[test]
fn test_glb_without_colors() {
    let builder = MeshBuilder::new(BuildOptions {
        vertex_colors: false,
        ..Default::default()
    });
    let mesh = builder.build(terrain(5, 5)).unwrap();
    let artifact = ModelExporter::new().export(&mesh, ExportFormat::Glb).unwrap();
    let doc = read_glb(artifact.as_bytes()).unwrap().json;
    assert!(doc["meshes"][0]["primitives"][0]["attributes"]
        .get("COLOR_0")
        .is_none());
    assert_eq!(doc["accessors"].as_array().unwrap().len(), 3);
}

#[test]
fn test_unknown_format_name() {
    let err = "obj".parse::<ExportFormat>().unwrap_err();
    assert!(matches!(err, ExportError::UnsupportedFormat(ref s) if s == "obj"));
    assert!(err.to_string().contains("obj"));
}
