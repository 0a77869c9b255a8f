//! glTF 2.0 binary (GLB) encoding.
//!
//! Emits a single-mesh, single-node scene with a non-indexed triangle list.
//! Layout:
//! - 12-byte header: magic `glTF`, version 2, total length
//! - JSON chunk, space-padded to a 4-byte boundary
//! - BIN chunk (positions then normals, `f32` LE), zero-padded

use serde_json::json;

use super::TriangleMesh;

const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A; // "JSON"
const CHUNK_BIN: u32 = 0x004E_4942; // "BIN\0"

const COMPONENT_FLOAT: u32 = 5126;
const TARGET_ARRAY_BUFFER: u32 = 34962;
const MODE_TRIANGLES: u32 = 4;

/// Encode `mesh` as a GLB byte buffer.
pub fn encode_glb(mesh: &TriangleMesh) -> Vec<u8> {
    let vertex_count = mesh.triangles.len() * 3;
    let attribute_len = vertex_count * 3 * 4;

    let mut bin = Vec::with_capacity(attribute_len * 2);
    for tri in &mesh.triangles {
        for vertex in &tri.vertices {
            for c in vertex {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
    }
    for tri in &mesh.triangles {
        let normal = tri.normal();
        for _ in 0..3 {
            for c in &normal {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
    }

    let (min, max) = mesh.bounds();
    let document = json!({
        "asset": { "version": "2.0", "generator": concat!("keychain-core ", env!("CARGO_PKG_VERSION")) },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{
            "primitives": [{
                "attributes": { "POSITION": 0, "NORMAL": 1 },
                "mode": MODE_TRIANGLES,
            }],
        }],
        "buffers": [{ "byteLength": bin.len() }],
        "bufferViews": [
            {
                "buffer": 0,
                "byteOffset": 0,
                "byteLength": attribute_len,
                "target": TARGET_ARRAY_BUFFER,
            },
            {
                "buffer": 0,
                "byteOffset": attribute_len,
                "byteLength": attribute_len,
                "target": TARGET_ARRAY_BUFFER,
            },
        ],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": COMPONENT_FLOAT,
                "count": vertex_count,
                "type": "VEC3",
                "min": min,
                "max": max,
            },
            {
                "bufferView": 1,
                "componentType": COMPONENT_FLOAT,
                "count": vertex_count,
                "type": "VEC3",
            },
        ],
    });

    // Serializing a `Value` built from plain numbers and strings cannot fail.
    let mut json_bytes = serde_json::to_vec(&document).unwrap_or_default();
    pad_to_four(&mut json_bytes, b' ');
    pad_to_four(&mut bin, 0);

    let total_len = 12 + 8 + json_bytes.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total_len as u32).to_le_bytes());

    out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_bytes);

    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(&bin);

    out
}

fn pad_to_four(buf: &mut Vec<u8>, fill: u8) {
    while buf.len() % 4 != 0 {
        buf.push(fill);
    }
}
