//! STL (stereolithography) writing and reading.
//!
//! Binary layout:
//!
//! ```text
//! 80-byte header
//! u32 triangle count
//! per triangle: normal (3 x f32) | 3 vertices (9 x f32) | u16 attribute
//! ```
//!
//! STL carries no topology, so [`read_stl`] welds vertices with identical
//! coordinates back together.

use crate::{ExportError, Result};
use ecuterra_mesh::Mesh;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Binary header size in bytes.
const HEADER_SIZE: usize = 80;
/// Bytes per triangle in binary STL.
const TRIANGLE_SIZE: usize = 50;
/// Solid name written to both formats.
const SOLID_NAME: &str = "ecuador_terrain";

fn face_vertices(mesh: &Mesh, face: [u32; 3]) -> [[f32; 3]; 3] {
    face.map(|i| {
        let p = mesh.positions[i as usize];
        [p[0] as f32, p[1] as f32, p[2] as f32]
    })
}

fn facet_normal(mesh: &Mesh, index: usize) -> [f32; 3] {
    mesh.face_normal(index)
        .map(|n| [n[0] as f32, n[1] as f32, n[2] as f32])
        .unwrap_or([0.0; 3])
}

/// Serialize as binary STL.
pub(crate) fn write_binary(mesh: &Mesh) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + 4 + mesh.face_count() * TRIANGLE_SIZE);

    // Must not begin with "solid" or readers may take it for ASCII
    let mut header = [0u8; HEADER_SIZE];
    let label = format!("binary STL {} faces={}", SOLID_NAME, mesh.face_count());
    let len = label.len().min(HEADER_SIZE);
    header[..len].copy_from_slice(&label.as_bytes()[..len]);
    out.extend_from_slice(&header);
    out.extend_from_slice(&(mesh.face_count() as u32).to_le_bytes());

    for (i, &face) in mesh.faces.iter().enumerate() {
        for c in facet_normal(mesh, i) {
            out.extend_from_slice(&c.to_le_bytes());
        }
        for v in face_vertices(mesh, face) {
            for c in v {
                out.extend_from_slice(&c.to_le_bytes());
            }
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    out
}

/// Serialize as ASCII STL.
pub(crate) fn write_ascii(mesh: &Mesh) -> Vec<u8> {
    let mut out = String::with_capacity(64 + mesh.face_count() * 256);
    // Writing to a String cannot fail
    let _ = writeln!(out, "solid {}", SOLID_NAME);
    for (i, &face) in mesh.faces.iter().enumerate() {
        let [nx, ny, nz] = facet_normal(mesh, i);
        let _ = writeln!(out, "  facet normal {} {} {}", nx, ny, nz);
        out.push_str("    outer loop\n");
        for [x, y, z] in face_vertices(mesh, face) {
            let _ = writeln!(out, "      vertex {} {} {}", x, y, z);
        }
        out.push_str("    endloop\n");
        out.push_str("  endfacet\n");
    }
    let _ = writeln!(out, "endsolid {}", SOLID_NAME);
    out.into_bytes()
}

/// Welds triangle corners into shared vertices by exact coordinates.
#[derive(Default)]
struct Welder {
    index: HashMap<[u32; 3], u32>,
    positions: Vec<[f64; 3]>,
    faces: Vec<[u32; 3]>,
}

impl Welder {
    fn vertex(&mut self, v: [f32; 3]) -> u32 {
        let key = v.map(|c| if c == 0.0 { 0 } else { c.to_bits() });
        let next = self.positions.len() as u32;
        *self.index.entry(key).or_insert_with(|| {
            self.positions.push(v.map(f64::from));
            next
        })
    }

    fn triangle(&mut self, tri: [[f32; 3]; 3]) {
        let face = tri.map(|v| self.vertex(v));
        self.faces.push(face);
    }

    fn finish(self) -> Mesh {
        Mesh::new(self.positions, self.faces)
    }
}

fn read_f32(data: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

fn read_binary(data: &[u8], count: usize) -> Mesh {
    let mut welder = Welder::default();
    for t in 0..count {
        // Skip the stored normal, it is recomputed from the winding
        let base = HEADER_SIZE + 4 + t * TRIANGLE_SIZE + 12;
        let mut tri = [[0.0f32; 3]; 3];
        for (k, v) in tri.iter_mut().enumerate() {
            for (c, slot) in v.iter_mut().enumerate() {
                *slot = read_f32(data, base + k * 12 + c * 4);
            }
        }
        welder.triangle(tri);
    }
    welder.finish()
}

fn parse_vertex(line: usize, rest: &str) -> Result<[f32; 3]> {
    let mut coords = [0.0f32; 3];
    let mut parts = rest.split_whitespace();
    for slot in &mut coords {
        let token = parts
            .next()
            .ok_or_else(|| ExportError::InvalidStl(format!("line {}: vertex needs 3 coordinates", line)))?;
        *slot = token
            .parse()
            .map_err(|_| ExportError::InvalidStl(format!("line {}: bad coordinate {:?}", line, token)))?;
    }
    Ok(coords)
}

fn read_ascii(text: &str) -> Result<Mesh> {
    let mut welder = Welder::default();
    let mut corners = Vec::with_capacity(3);
    let mut closed = false;

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        let lineno = i + 1;
        if let Some(rest) = line.strip_prefix("vertex") {
            corners.push(parse_vertex(lineno, rest)?);
        } else if line.starts_with("endloop") {
            let tri: [[f32; 3]; 3] = corners.as_slice().try_into().map_err(|_| {
                ExportError::InvalidStl(format!(
                    "line {}: facet has {} vertices, expected 3",
                    lineno,
                    corners.len()
                ))
            })?;
            welder.triangle(tri);
            corners.clear();
        } else if line.starts_with("endsolid") {
            closed = true;
            break;
        }
    }

    if !closed {
        return Err(ExportError::InvalidStl("missing endsolid".into()));
    }
    Ok(welder.finish())
}

/// Parse binary or ASCII STL into an indexed mesh.
///
/// Data whose length matches the binary triangle count is read as binary;
/// otherwise it must be ASCII starting with `solid`.
pub fn read_stl(data: &[u8]) -> Result<Mesh> {
    if data.len() >= HEADER_SIZE + 4 {
        let count = u32::from_le_bytes([
            data[HEADER_SIZE],
            data[HEADER_SIZE + 1],
            data[HEADER_SIZE + 2],
            data[HEADER_SIZE + 3],
        ]) as usize;
        if data.len() == HEADER_SIZE + 4 + count * TRIANGLE_SIZE {
            return Ok(read_binary(data, count));
        }
    }

    let text = std::str::from_utf8(data)
        .map_err(|_| ExportError::InvalidStl("neither binary STL nor UTF-8 text".into()))?;
    if !text.trim_start().starts_with("solid") {
        return Err(ExportError::InvalidStl("ASCII STL must start with 'solid'".into()));
    }
    read_ascii(text)
}
