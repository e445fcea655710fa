//! End-to-end mesh tests on synthetic terrain.

use ecuterra_dem::{ElevationGrid, GeoTransform, SRTM_VOID};
use ecuterra_mesh::{decimate, BuildOptions, MeshBuilder, MeshSmoother, SmoothParams};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Rolling hills with seeded noise, roughly 3 arc-second spacing near Quito.
fn terrain(rows: usize, cols: usize, seed: u64) -> ElevationGrid {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let data = (0..rows * cols)
        .map(|i| {
            let (r, c) = ((i / cols) as f32, (i % cols) as f32);
            2800.0 + 60.0 * (r / 7.0).sin() * (c / 9.0).cos() + rng.gen_range(-3.0..3.0)
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

fn surface_only() -> BuildOptions {
    BuildOptions {
        add_base: false,
        ..Default::default()
    }
}

#[test]
fn test_hundred_by_hundred_face_count() {
    let mesh = MeshBuilder::new(surface_only())
        .build(terrain(100, 100, 1))
        .unwrap();
    assert_eq!(mesh.face_count(), 2 * 99 * 99);
    assert_eq!(mesh.vertex_count(), 100 * 100);
    mesh.validate().unwrap();
}

#[test]
fn test_solid_is_watertight() {
    let (rows, cols) = (30, 40);
    let mesh = MeshBuilder::default().build(terrain(rows, cols, 2)).unwrap();

    let perimeter = 2 * (rows - 1) + 2 * (cols - 1);
    assert_eq!(mesh.face_count(), 4 * (rows - 1) * (cols - 1) + 2 * perimeter);
    assert!(mesh.is_watertight());
    assert_eq!(mesh.connected_components(), 1);
    assert_eq!(mesh.colors.as_ref().map(Vec::len), Some(mesh.vertex_count()));
}

#[test]
fn test_nodata_patch_leaves_no_hole() {
    let grid = terrain(20, 20, 3);
    let mut data = grid.data().to_vec();
    for r in 5..10 {
        for c in 5..10 {
            data[r * 20 + c] = SRTM_VOID;
        }
    }
    let min = grid.min_max().unwrap().0;
    let grid = ElevationGrid::new(data, 20, 20, grid.transform(), SRTM_VOID).unwrap();

    let mesh = MeshBuilder::default().build(grid).unwrap();
    assert!(mesh.is_watertight());
    let z = mesh.positions[7 * 20 + 7][2];
    assert!(z >= min as f64 * 1.5 - 10.0 && z < 2800.0 * 1.5);
}

#[test]
fn test_decimation_hits_target_and_stays_closed() {
    let mesh = MeshBuilder::default().build(terrain(40, 40, 4)).unwrap();
    let faces = mesh.face_count();

    let smoother = MeshSmoother::new(SmoothParams::default());
    let out = smoother.smooth(mesh, 2, 0.25).unwrap();

    let target = (faces as f64 * 0.25).ceil() as usize;
    assert!(out.face_count() <= target, "{} faces, target {}", out.face_count(), target);
    assert!(out.face_count() > 0);
    out.validate().unwrap();
    assert!(out.is_watertight());
    assert_eq!(out.normals.as_ref().map(Vec::len), Some(out.vertex_count()));
    assert_eq!(out.colors.as_ref().map(Vec::len), Some(out.vertex_count()));
}

#[test]
fn test_ratio_one_keeps_face_count() {
    let mesh = MeshBuilder::default().build(terrain(15, 15, 5)).unwrap();
    let faces = mesh.face_count();
    let out = MeshSmoother::default().smooth(mesh, 1, 1.0).unwrap();
    assert_eq!(out.face_count(), faces);
}

#[test]
fn test_open_surface_boundary_survives_decimation() {
    let mesh = MeshBuilder::new(surface_only())
        .build(terrain(25, 25, 6))
        .unwrap();
    let rim_before = mesh.boundary_edges().len();

    let (out, stats) = decimate(mesh, 200, true);
    assert!(stats.collapses_performed > 0);
    out.validate().unwrap();
    assert_eq!(out.boundary_edges().len(), rim_before);
}

#[test]
fn test_smoothing_is_deterministic() {
    let run = || {
        let mesh = MeshBuilder::default().build(terrain(20, 20, 7)).unwrap();
        MeshSmoother::default().smooth(mesh, 3, 0.5).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_half_ratio_halves_faces_and_stays_connected() {
    for options in [surface_only(), BuildOptions::default()] {
        let mesh = MeshBuilder::new(options).build(terrain(40, 40, 8)).unwrap();
        let before = mesh.face_count();

        let out = MeshSmoother::default().smooth(mesh, 2, 0.5).unwrap();
        let after = out.face_count();
        let half = before / 2;
        assert!(after.abs_diff(half) <= 8, "{} faces from {}", after, before);

        out.validate().unwrap();
        assert_eq!(out.connected_components(), 1);
        if options.add_base {
            assert!(out.is_watertight());
        }

        let mut compacted = out.clone();
        assert_eq!(compacted.remove_unreferenced_vertices(), 0);
    }
}
