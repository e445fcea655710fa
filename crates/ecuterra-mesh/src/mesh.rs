//! Indexed triangle mesh and topology queries.

use crate::{MeshError, Result};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Indexed triangle mesh.
///
/// Positions are in meters with x east, y north and z up. Faces wind
/// counter-clockwise when seen from outside. `normals` and `colors`, when
/// present, hold one entry per vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions.
    pub positions: Vec<[f64; 3]>,
    /// Triangles as vertex index triples.
    pub faces: Vec<[u32; 3]>,
    /// Per-vertex unit normals.
    pub normals: Option<Vec<[f32; 3]>>,
    /// Per-vertex RGB colors in 0..1.
    pub colors: Option<Vec<[f32; 3]>>,
}

impl Mesh {
    /// Mesh without normals or colors.
    pub fn new(positions: Vec<[f64; 3]>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            positions,
            faces,
            normals: None,
            colors: None,
        }
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True if the mesh has no faces.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Check index ranges, degenerate faces and attribute lengths.
    pub fn validate(&self) -> Result<()> {
        let n = self.positions.len();
        for (i, face) in self.faces.iter().enumerate() {
            if face.iter().any(|&v| v as usize >= n) {
                return Err(MeshError::InvalidMesh(format!(
                    "face {} references a vertex beyond {}",
                    i, n
                )));
            }
            if is_degenerate(face) {
                return Err(MeshError::InvalidMesh(format!(
                    "face {} repeats a vertex: {:?}",
                    i, face
                )));
            }
        }
        if self.normals.as_ref().is_some_and(|v| v.len() != n) {
            return Err(MeshError::InvalidMesh("normal count differs from vertex count".into()));
        }
        if self.colors.as_ref().is_some_and(|v| v.len() != n) {
            return Err(MeshError::InvalidMesh("color count differs from vertex count".into()));
        }
        Ok(())
    }

    /// Axis-aligned bounds, `None` for a mesh without vertices.
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        let first = *self.positions.first()?;
        Some(self.positions.iter().fold((first, first), |(mut lo, mut hi), p| {
            for k in 0..3 {
                lo[k] = lo[k].min(p[k]);
                hi[k] = hi[k].max(p[k]);
            }
            (lo, hi)
        }))
    }

    /// Unit normal of a face, `None` if it has no area.
    pub fn face_normal(&self, face: usize) -> Option<[f64; 3]> {
        let [a, b, c] = self.faces[face];
        triangle_normal(
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        )
    }

    /// Recompute area-weighted vertex normals.
    pub fn compute_normals(&mut self) {
        let mut acc = vec![[0.0f64; 3]; self.positions.len()];
        for face in &self.faces {
            let [a, b, c] = face.map(|i| self.positions[i as usize]);
            // Unnormalized cross product weights by twice the area
            let n = cross(sub(b, a), sub(c, a));
            for &i in face {
                let slot = &mut acc[i as usize];
                for k in 0..3 {
                    slot[k] += n[k];
                }
            }
        }
        self.normals = Some(
            acc.into_iter()
                .map(|n| {
                    let len = norm(n);
                    if len > 0.0 {
                        [(n[0] / len) as f32, (n[1] / len) as f32, (n[2] / len) as f32]
                    } else {
                        [0.0, 0.0, 1.0]
                    }
                })
                .collect(),
        );
    }

    /// Number of faces sharing each undirected edge.
    pub fn edge_face_counts(&self) -> HashMap<(u32, u32), usize> {
        let mut counts = HashMap::with_capacity(self.faces.len() * 3 / 2);
        for face in &self.faces {
            for i in 0..3 {
                *counts.entry(edge_key(face[i], face[(i + 1) % 3])).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Edges used by exactly one face.
    pub fn boundary_edges(&self) -> Vec<(u32, u32)> {
        let mut edges: Vec<_> = self
            .edge_face_counts()
            .into_iter()
            .filter(|(_, n)| *n == 1)
            .map(|(e, _)| e)
            .collect();
        edges.sort_unstable();
        edges
    }

    /// True if every edge is shared by exactly two faces and each pair winds
    /// the edge in opposite directions.
    pub fn is_watertight(&self) -> bool {
        if self.faces.is_empty() {
            return false;
        }
        let mut directed: HashMap<(u32, u32), usize> = HashMap::new();
        for face in &self.faces {
            for i in 0..3 {
                *directed.entry((face[i], face[(i + 1) % 3])).or_insert(0) += 1;
            }
        }
        directed
            .iter()
            .all(|(&(a, b), &n)| n == 1 && directed.get(&(b, a)) == Some(&1))
    }

    /// Number of face-connected components.
    pub fn connected_components(&self) -> usize {
        let mut parent: Vec<u32> = (0..self.positions.len() as u32).collect();
        fn find(parent: &mut [u32], mut v: u32) -> u32 {
            while parent[v as usize] != v {
                parent[v as usize] = parent[parent[v as usize] as usize];
                v = parent[v as usize];
            }
            v
        }
        for face in &self.faces {
            let r0 = find(&mut parent, face[0]);
            for &v in &face[1..] {
                let r = find(&mut parent, v);
                if r != r0 {
                    parent[r as usize] = r0;
                }
            }
        }
        let mut roots = HashSet::new();
        for face in &self.faces {
            roots.insert(find(&mut parent, face[0]));
        }
        roots.len()
    }

    /// Drop faces that repeat a vertex. Returns the number removed.
    pub fn remove_degenerate_faces(&mut self) -> usize {
        let before = self.faces.len();
        self.faces.retain(|f| !is_degenerate(f));
        before - self.faces.len()
    }

    /// Drop faces over a vertex set already used by an earlier face,
    /// regardless of winding. Returns the number removed.
    pub fn remove_duplicate_faces(&mut self) -> usize {
        let before = self.faces.len();
        let mut seen = HashSet::with_capacity(before);
        self.faces.retain(|f| {
            let mut key = *f;
            key.sort_unstable();
            seen.insert(key)
        });
        before - self.faces.len()
    }

    /// Drop vertices no face references, remapping faces and attributes.
    /// Returns the number removed.
    pub fn remove_unreferenced_vertices(&mut self) -> usize {
        let n = self.positions.len();
        let mut used = vec![false; n];
        for face in &self.faces {
            for &v in face {
                used[v as usize] = true;
            }
        }

        let mut remap = vec![u32::MAX; n];
        let mut next = 0u32;
        for (old, _) in used.iter().enumerate().filter(|(_, u)| **u) {
            remap[old] = next;
            next += 1;
        }
        if next as usize == n {
            return 0;
        }

        fn keep<T: Copy>(values: &[T], used: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(used)
                .filter(|(_, u)| **u)
                .map(|(v, _)| *v)
                .collect()
        }
        self.positions = keep(&self.positions, &used);
        self.normals = self.normals.as_deref().map(|v| keep(v, &used));
        self.colors = self.colors.as_deref().map(|v| keep(v, &used));
        for face in &mut self.faces {
            *face = face.map(|v| remap[v as usize]);
        }

        let removed = n - next as usize;
        debug!(removed, "Removed unreferenced vertices");
        removed
    }

    /// Remove degenerate and duplicate faces, then unreferenced vertices.
    pub fn compact(&mut self) {
        self.remove_degenerate_faces();
        self.remove_duplicate_faces();
        self.remove_unreferenced_vertices();
    }
}

pub(crate) fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

pub(crate) fn is_degenerate(f: &[u32; 3]) -> bool {
    f[0] == f[1] || f[1] == f[2] || f[0] == f[2]
}

pub(crate) fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

pub(crate) fn triangle_normal(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Option<[f64; 3]> {
    let n = cross(sub(b, a), sub(c, a));
    let len = norm(n);
    if len < 1e-12 {
        return None;
    }
    Some([n[0] / len, n[1] / len, n[2] / len])
}
