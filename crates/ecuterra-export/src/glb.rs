//! Binary glTF 2.0 (GLB) writing and chunk parsing.
//!
//! ```text
//! header  magic "glTF" | version 2 | total length        (3 x u32 LE)
//! chunk 0 length | "JSON" | scene description, space padded
//! chunk 1 length | "BIN\0" | vertex and index data, zero padded
//! ```

use crate::{ExportError, Result};
use ecuterra_mesh::Mesh;
use serde_json::{json, Value};

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const COMPONENT_FLOAT: u32 = 5126;
const COMPONENT_UNSIGNED_INT: u32 = 5125;
const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;
const MODE_TRIANGLES: u32 = 4;

/// Generator string recorded in `asset.generator`.
pub const GENERATOR: &str = concat!("ecuterra ", env!("CARGO_PKG_VERSION"));

/// Terrain z-up to glTF y-up.
fn to_y_up(p: [f64; 3]) -> [f32; 3] {
    [p[0] as f32, p[2] as f32, -p[1] as f32]
}

fn push_vec3(buf: &mut Vec<u8>, v: [f32; 3]) {
    for c in v {
        buf.extend_from_slice(&c.to_le_bytes());
    }
}

/// Serialize a mesh as GLB. The mesh must carry normals.
pub(crate) fn write_glb(mesh: &Mesh, normals: &[[f32; 3]]) -> Result<Vec<u8>> {
    let n = mesh.vertex_count();
    let mut bin = Vec::with_capacity(n * 36 + mesh.face_count() * 12);

    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for &p in &mesh.positions {
        let v = to_y_up(p);
        for k in 0..3 {
            min[k] = min[k].min(v[k]);
            max[k] = max[k].max(v[k]);
        }
        push_vec3(&mut bin, v);
    }
    let positions_len = bin.len();

    for &nrm in normals {
        push_vec3(&mut bin, to_y_up([nrm[0] as f64, nrm[1] as f64, nrm[2] as f64]));
    }
    let normals_len = bin.len() - positions_len;

    let colors_len = match &mesh.colors {
        Some(colors) => {
            let start = bin.len();
            for &c in colors {
                push_vec3(&mut bin, c);
            }
            bin.len() - start
        }
        None => 0,
    };

    let indices_offset = bin.len();
    for face in &mesh.faces {
        for &i in face {
            bin.extend_from_slice(&i.to_le_bytes());
        }
    }
    let indices_len = bin.len() - indices_offset;

    let mut attributes = json!({ "POSITION": 0, "NORMAL": 1 });
    let mut accessors = vec![
        json!({
            "bufferView": 0,
            "componentType": COMPONENT_FLOAT,
            "count": n,
            "type": "VEC3",
            "min": min,
            "max": max,
        }),
        json!({
            "bufferView": 1,
            "componentType": COMPONENT_FLOAT,
            "count": n,
            "type": "VEC3",
        }),
    ];
    let mut buffer_views = vec![
        json!({ "buffer": 0, "byteOffset": 0, "byteLength": positions_len, "target": TARGET_ARRAY_BUFFER }),
        json!({ "buffer": 0, "byteOffset": positions_len, "byteLength": normals_len, "target": TARGET_ARRAY_BUFFER }),
    ];
    if colors_len > 0 {
        attributes["COLOR_0"] = json!(accessors.len());
        accessors.push(json!({
            "bufferView": buffer_views.len(),
            "componentType": COMPONENT_FLOAT,
            "count": n,
            "type": "VEC3",
        }));
        buffer_views.push(json!({
            "buffer": 0,
            "byteOffset": positions_len + normals_len,
            "byteLength": colors_len,
            "target": TARGET_ARRAY_BUFFER,
        }));
    }
    let indices_accessor = accessors.len();
    accessors.push(json!({
        "bufferView": buffer_views.len(),
        "componentType": COMPONENT_UNSIGNED_INT,
        "count": mesh.face_count() * 3,
        "type": "SCALAR",
    }));
    buffer_views.push(json!({
        "buffer": 0,
        "byteOffset": indices_offset,
        "byteLength": indices_len,
        "target": TARGET_ELEMENT_ARRAY_BUFFER,
    }));

    let document = json!({
        "asset": {
            "version": "2.0",
            "generator": GENERATOR,
            "extras": { "vertices": n, "faces": mesh.face_count() },
        },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "terrain", "mesh": 0 }],
        "meshes": [{
            "name": "terrain",
            "primitives": [{
                "attributes": attributes,
                "indices": indices_accessor,
                "mode": MODE_TRIANGLES,
            }],
        }],
        "accessors": accessors,
        "bufferViews": buffer_views,
        "buffers": [{ "byteLength": bin.len() }],
    });

    let mut json_bytes = serde_json::to_vec(&document)?;
    json_bytes.resize(json_bytes.len().next_multiple_of(4), b' ');
    bin.resize(bin.len().next_multiple_of(4), 0);

    let total = 12 + 8 + json_bytes.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(GLB_MAGIC);
    glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    glb.extend_from_slice(&json_bytes);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    glb.extend_from_slice(&bin);
    Ok(glb)
}

/// The two chunks of a GLB container.
#[derive(Debug, Clone)]
pub struct GlbChunks {
    /// Parsed JSON chunk.
    pub json: Value,
    /// BIN chunk, padding included.
    pub bin: Vec<u8>,
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| ExportError::InvalidGlb(format!("truncated at byte {}", offset)))
}

/// Split a GLB container into its JSON and BIN chunks.
pub fn read_glb(data: &[u8]) -> Result<GlbChunks> {
    if data.len() < 12 || &data[0..4] != GLB_MAGIC {
        return Err(ExportError::InvalidGlb("missing glTF magic".into()));
    }
    let version = read_u32(data, 4)?;
    if version != GLB_VERSION {
        return Err(ExportError::InvalidGlb(format!("unsupported version {}", version)));
    }
    let total = read_u32(data, 8)? as usize;
    if total != data.len() {
        return Err(ExportError::InvalidGlb(format!(
            "header length {} but {} bytes present",
            total,
            data.len()
        )));
    }

    let mut json = None;
    let mut bin = Vec::new();
    let mut offset = 12;
    while offset + 8 <= data.len() {
        let len = read_u32(data, offset)? as usize;
        let kind = read_u32(data, offset + 4)?;
        let body = data
            .get(offset + 8..offset + 8 + len)
            .ok_or_else(|| ExportError::InvalidGlb(format!("chunk at {} overruns file", offset)))?;
        match kind {
            CHUNK_JSON => json = Some(serde_json::from_slice(body)?),
            CHUNK_BIN => bin = body.to_vec(),
            _ => {}
        }
        offset += 8 + len;
    }

    let json = json.ok_or_else(|| ExportError::InvalidGlb("no JSON chunk".into()))?;
    Ok(GlbChunks { json, bin })
}
