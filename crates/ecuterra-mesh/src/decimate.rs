//! Edge-collapse decimation with quadric error metrics.

use crate::mesh::{dot, edge_key, norm, sub, triangle_normal, Mesh};
use crate::quadric::Quadric;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info};

/// Faces whose normal turns by more than this (cosine) veto a collapse.
const MIN_NORMAL_COS: f64 = 0.2;

/// Outcome of a decimation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimationStats {
    /// Faces before decimation.
    pub original_faces: usize,
    /// Faces after decimation.
    pub final_faces: usize,
    /// Edge collapses applied.
    pub collapses_performed: usize,
    /// Candidate collapses rejected by the validity checks.
    pub collapses_rejected: usize,
}

impl DecimationStats {
    /// Fraction of faces kept.
    pub fn reduction_ratio(&self) -> f64 {
        if self.original_faces == 0 {
            1.0
        } else {
            self.final_faces as f64 / self.original_faces as f64
        }
    }
}

/// A candidate collapse of `keep`-`drop` into `keep` at `target`.
#[derive(Debug, Clone)]
struct Candidate {
    cost: f64,
    keep: u32,
    drop: u32,
    keep_version: u32,
    drop_version: u32,
    target: [f64; 3],
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the cheapest collapse; ties break on
        // vertex ids to keep results deterministic
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.keep.cmp(&self.keep))
            .then_with(|| other.drop.cmp(&self.drop))
    }
}

/// Working state of a decimation.
struct Decimator {
    positions: Vec<[f64; 3]>,
    colors: Option<Vec<[f32; 3]>>,
    faces: Vec<[u32; 3]>,
    face_alive: Vec<bool>,
    vertex_alive: Vec<bool>,
    vertex_faces: Vec<Vec<usize>>,
    quadrics: Vec<Quadric>,
    version: Vec<u32>,
    on_boundary: Vec<bool>,
    preserve_boundary: bool,
    active_faces: usize,
}

impl Decimator {
    fn new(mesh: Mesh, preserve_boundary: bool) -> Self {
        let n = mesh.positions.len();
        let mut vertex_faces = vec![Vec::new(); n];
        let mut quadrics = vec![Quadric::default(); n];
        for (fi, face) in mesh.faces.iter().enumerate() {
            let [a, b, c] = face.map(|v| mesh.positions[v as usize]);
            let q = Quadric::from_triangle(a, b, c);
            for &v in face {
                vertex_faces[v as usize].push(fi);
                if let Some(q) = q {
                    quadrics[v as usize] += q;
                }
            }
        }

        let mut on_boundary = vec![false; n];
        for ((a, b), count) in mesh.edge_face_counts() {
            if count == 1 {
                on_boundary[a as usize] = true;
                on_boundary[b as usize] = true;
            }
        }

        let active_faces = mesh.faces.len();
        Self {
            positions: mesh.positions,
            colors: mesh.colors,
            face_alive: vec![true; active_faces],
            faces: mesh.faces,
            vertex_alive: vec![true; n],
            vertex_faces,
            quadrics,
            version: vec![0; n],
            on_boundary,
            preserve_boundary,
            active_faces,
        }
    }

    fn live_faces(&self, v: u32) -> impl Iterator<Item = usize> + '_ {
        self.vertex_faces[v as usize]
            .iter()
            .copied()
            .filter(move |&f| self.face_alive[f] && self.faces[f].contains(&v))
    }

    fn neighbors(&self, v: u32) -> HashSet<u32> {
        self.live_faces(v)
            .flat_map(|f| self.faces[f])
            .filter(|&u| u != v)
            .collect()
    }

    fn candidate(&self, keep: u32, drop: u32) -> Option<Candidate> {
        if self.preserve_boundary
            && (self.on_boundary[keep as usize] || self.on_boundary[drop as usize])
        {
            return None;
        }
        let q = self.quadrics[keep as usize] + self.quadrics[drop as usize];
        let pk = self.positions[keep as usize];
        let pd = self.positions[drop as usize];
        let mid = [
            (pk[0] + pd[0]) / 2.0,
            (pk[1] + pd[1]) / 2.0,
            (pk[2] + pd[2]) / 2.0,
        ];

        // Fall back to the best of the endpoints and midpoint when the
        // optimum is undefined or far off the edge
        let edge_len = norm(sub(pk, pd));
        let target = q
            .optimal_point()
            .filter(|p| norm(sub(*p, mid)) <= edge_len)
            .unwrap_or_else(|| {
                [pk, pd, mid]
                    .into_iter()
                    .min_by(|a, b| q.evaluate(*a).total_cmp(&q.evaluate(*b)))
                    .unwrap_or(mid)
            });

        Some(Candidate {
            cost: q.evaluate(target).max(0.0),
            keep,
            drop,
            keep_version: self.version[keep as usize],
            drop_version: self.version[drop as usize],
            target,
        })
    }

    fn is_current(&self, c: &Candidate) -> bool {
        self.vertex_alive[c.keep as usize]
            && self.vertex_alive[c.drop as usize]
            && self.version[c.keep as usize] == c.keep_version
            && self.version[c.drop as usize] == c.drop_version
    }

    /// Link condition plus the flip and degeneracy checks on every face
    /// that survives the collapse.
    fn is_valid(&self, c: &Candidate) -> bool {
        let (keep, drop) = (c.keep, c.drop);
        let shared_faces: Vec<usize> = self
            .live_faces(keep)
            .filter(|&f| self.faces[f].contains(&drop))
            .collect();
        if shared_faces.is_empty() {
            return false;
        }
        // An interior edge joining two boundary vertices would pinch the rim
        if shared_faces.len() > 1
            && self.on_boundary[keep as usize]
            && self.on_boundary[drop as usize]
        {
            return false;
        }

        // Vertices adjacent to both ends must be exactly the apexes of the
        // faces on the edge, otherwise the collapse pinches the surface
        let common = self
            .neighbors(keep)
            .intersection(&self.neighbors(drop))
            .count();
        if common != shared_faces.len() {
            return false;
        }

        for v in [keep, drop] {
            for f in self.live_faces(v) {
                let face = self.faces[f];
                if face.contains(&keep) && face.contains(&drop) {
                    continue;
                }
                let [a, b, cc] = face.map(|u| self.positions[u as usize]);
                let Some(before) = triangle_normal(a, b, cc) else {
                    continue;
                };
                let moved = face.map(|u| {
                    if u == keep || u == drop {
                        c.target
                    } else {
                        self.positions[u as usize]
                    }
                });
                match triangle_normal(moved[0], moved[1], moved[2]) {
                    Some(after) if dot(before, after) >= MIN_NORMAL_COS => {}
                    _ => return false,
                }
            }
        }
        true
    }

    fn collapse(&mut self, c: &Candidate) {
        let (keep, drop) = (c.keep, c.drop);
        self.positions[keep as usize] = c.target;
        let q = self.quadrics[drop as usize];
        self.quadrics[keep as usize] += q;
        if let Some(colors) = self.colors.as_mut() {
            let (k, d) = (colors[keep as usize], colors[drop as usize]);
            colors[keep as usize] = [
                (k[0] + d[0]) / 2.0,
                (k[1] + d[1]) / 2.0,
                (k[2] + d[2]) / 2.0,
            ];
        }
        self.on_boundary[keep as usize] |= self.on_boundary[drop as usize];

        let moved: Vec<usize> = self.live_faces(drop).collect();
        for f in moved {
            if self.faces[f].contains(&keep) {
                self.face_alive[f] = false;
                self.active_faces -= 1;
            } else {
                for u in self.faces[f].iter_mut() {
                    if *u == drop {
                        *u = keep;
                    }
                }
                self.vertex_faces[keep as usize].push(f);
            }
        }
        self.vertex_alive[drop as usize] = false;
        self.vertex_faces[drop as usize].clear();
        self.version[keep as usize] += 1;
        self.version[drop as usize] += 1;

        // Drop stale face references so adjacency stays small
        let faces = &self.faces;
        let alive = &self.face_alive;
        self.vertex_faces[keep as usize].retain(|&f| alive[f] && faces[f].contains(&keep));
    }

    fn push_edges(&self, v: u32, heap: &mut BinaryHeap<Candidate>) {
        let mut neighbors: Vec<u32> = self.neighbors(v).into_iter().collect();
        neighbors.sort_unstable();
        for u in neighbors {
            if let Some(c) = self.candidate(v, u) {
                heap.push(c);
            }
        }
    }

    fn into_mesh(self) -> Mesh {
        let faces = self
            .faces
            .into_iter()
            .zip(self.face_alive)
            .filter(|(_, alive)| *alive)
            .map(|(f, _)| f)
            .collect();
        let mut mesh = Mesh::new(self.positions, faces);
        mesh.colors = self.colors;
        mesh.compact();
        mesh
    }
}

/// Collapse edges until the mesh has at most `target_faces` faces.
///
/// Collapses that would pinch the surface, flip or flatten a face, or (when
/// `preserve_boundary`) move a vertex on an open boundary are skipped. If no
/// valid collapse remains, the result stays above the target. The returned
/// mesh is compacted but carries no normals.
pub fn decimate(mesh: Mesh, target_faces: usize, preserve_boundary: bool) -> (Mesh, DecimationStats) {
    let original_faces = mesh.face_count();
    let mut stats = DecimationStats {
        original_faces,
        final_faces: original_faces,
        collapses_performed: 0,
        collapses_rejected: 0,
    };
    if original_faces <= target_faces {
        return (mesh, stats);
    }

    info!(original = original_faces, target = target_faces, "Starting mesh decimation");

    let mut state = Decimator::new(mesh, preserve_boundary);
    let mut heap = BinaryHeap::new();
    let mut seen = HashSet::new();
    for face in &state.faces {
        for i in 0..3 {
            let (a, b) = edge_key(face[i], face[(i + 1) % 3]);
            if seen.insert((a, b)) {
                if let Some(c) = state.candidate(a, b) {
                    heap.push(c);
                }
            }
        }
    }
    debug!(candidates = heap.len(), "Built collapse queue");

    while state.active_faces > target_faces {
        let Some(c) = heap.pop() else {
            break;
        };
        if !state.is_current(&c) {
            continue;
        }
        if !state.is_valid(&c) {
            stats.collapses_rejected += 1;
            continue;
        }
        state.collapse(&c);
        stats.collapses_performed += 1;
        state.push_edges(c.keep, &mut heap);
    }

    let result = state.into_mesh();
    stats.final_faces = result.face_count();

    info!(
        final_faces = stats.final_faces,
        collapses = stats.collapses_performed,
        rejected = stats.collapses_rejected,
        "Decimation complete"
    );
    (result, stats)
}
