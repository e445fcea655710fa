//! Laplacian smoothing followed by optional decimation.

use crate::decimate::decimate;
use crate::mesh::{dot, edge_key, Mesh};
use crate::{MeshError, Result};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

/// Parameters for [`MeshSmoother`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothParams {
    /// Fraction of the way each vertex moves toward its neighbors' centroid.
    pub lambda: f64,
    /// Edges whose faces meet at more than this angle (degrees) are pinned.
    pub feature_angle_deg: f64,
    /// Keep vertices on open boundaries in place during decimation.
    pub preserve_boundary: bool,
}

impl Default for SmoothParams {
    fn default() -> Self {
        Self {
            lambda: 0.5,
            feature_angle_deg: 60.0,
            preserve_boundary: true,
        }
    }
}

/// Smooths and decimates meshes.
#[derive(Debug, Clone, Default)]
pub struct MeshSmoother {
    params: SmoothParams,
}

impl MeshSmoother {
    /// Smoother with the given parameters.
    pub fn new(params: SmoothParams) -> Self {
        Self { params }
    }

    /// Parameters in effect.
    pub fn params(&self) -> SmoothParams {
        self.params
    }

    /// Run `iterations` rounds of Laplacian smoothing, then decimate to
    /// `ceil(faces * decimate_ratio)` faces.
    ///
    /// Returns a compacted mesh with fresh normals.
    pub fn smooth(&self, mesh: Mesh, iterations: usize, decimate_ratio: f64) -> Result<Mesh> {
        if !decimate_ratio.is_finite() || decimate_ratio <= 0.0 || decimate_ratio > 1.0 {
            return Err(MeshError::InvalidRatio(decimate_ratio));
        }
        mesh.validate()?;
        let input_faces = mesh.face_count();

        let mut mesh = self.laplacian(mesh, iterations);

        if decimate_ratio < 1.0 {
            let target = (input_faces as f64 * decimate_ratio).ceil() as usize;
            let (decimated, stats) = decimate(mesh, target, self.params.preserve_boundary);
            debug!(
                ratio = stats.reduction_ratio(),
                rejected = stats.collapses_rejected,
                "Decimated mesh"
            );
            mesh = decimated;
        }

        mesh.compact();
        mesh.compute_normals();

        info!(
            iterations,
            decimate_ratio,
            faces_in = input_faces,
            faces_out = mesh.face_count(),
            vertices = mesh.vertex_count(),
            "Smoothed mesh"
        );
        Ok(mesh)
    }

    fn laplacian(&self, mut mesh: Mesh, iterations: usize) -> Mesh {
        if iterations == 0 || self.params.lambda == 0.0 || mesh.is_empty() {
            return mesh;
        }
        let neighbors = vertex_neighbors(&mesh);
        let pinned = pinned_vertices(&mesh, self.params.feature_angle_deg);
        let lambda = self.params.lambda;

        debug!(
            pinned = pinned.iter().filter(|p| **p).count(),
            iterations,
            "Laplacian smoothing"
        );

        for _ in 0..iterations {
            let current = &mesh.positions;
            let next: Vec<[f64; 3]> = (0..current.len())
                .into_par_iter()
                .map(|i| {
                    let p = current[i];
                    let ring = &neighbors[i];
                    if pinned[i] || ring.is_empty() {
                        return p;
                    }
                    let mut mean = [0.0; 3];
                    for &j in ring {
                        let q = current[j as usize];
                        for k in 0..3 {
                            mean[k] += q[k];
                        }
                    }
                    let inv = 1.0 / ring.len() as f64;
                    [
                        p[0] + lambda * (mean[0] * inv - p[0]),
                        p[1] + lambda * (mean[1] * inv - p[1]),
                        p[2] + lambda * (mean[2] * inv - p[2]),
                    ]
                })
                .collect();
            mesh.positions = next;
        }
        mesh
    }
}

/// Sorted, deduplicated one-ring of every vertex.
fn vertex_neighbors(mesh: &Mesh) -> Vec<Vec<u32>> {
    let mut rings = vec![Vec::new(); mesh.vertex_count()];
    for face in &mesh.faces {
        for i in 0..3 {
            let (a, b) = (face[i], face[(i + 1) % 3]);
            rings[a as usize].push(b);
            rings[b as usize].push(a);
        }
    }
    rings.par_iter_mut().for_each(|ring| {
        ring.sort_unstable();
        ring.dedup();
    });
    rings
}

/// Vertices on open or non-manifold edges, or on edges sharper than
/// `feature_angle_deg`.
fn pinned_vertices(mesh: &Mesh, feature_angle_deg: f64) -> Vec<bool> {
    let cos_limit = feature_angle_deg.to_radians().cos();
    let normals: Vec<Option<[f64; 3]>> = (0..mesh.face_count())
        .map(|f| mesh.face_normal(f))
        .collect();

    let mut edge_faces: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    for (fi, face) in mesh.faces.iter().enumerate() {
        for i in 0..3 {
            edge_faces
                .entry(edge_key(face[i], face[(i + 1) % 3]))
                .or_default()
                .push(fi);
        }
    }

    let mut pinned = vec![false; mesh.vertex_count()];
    for ((a, b), faces) in edge_faces {
        let sharp = match faces.as_slice() {
            [f0, f1] => match (normals[*f0], normals[*f1]) {
                (Some(n0), Some(n1)) => dot(n0, n1) < cos_limit,
                _ => false,
            },
            _ => true,
        };
        if sharp {
            pinned[a as usize] = true;
            pinned[b as usize] = true;
        }
    }
    pinned
}
