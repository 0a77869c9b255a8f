//! STL → GLB preview conversion.
//!
//! Generated STLs are re-encoded as GLB for the browser viewer. Conversion is
//! synchronous and CPU-bound; async callers should run [`convert_to_glb`]
//! on the blocking pool.

pub mod glb;
pub mod stl;

use std::path::{Path, PathBuf};

/// File extension for preview artifacts.
pub const GLB_EXTENSION: &str = "glb";

/// Errors raised while converting a mesh.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("STL is truncated: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("malformed ASCII STL at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("STL contains no triangles")]
    EmptyMesh,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [[f32; 3]; 3],
}

/// A triangle soup, as stored in STL.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TriangleMesh {
    pub triangles: Vec<Triangle>,
}

impl Triangle {
    /// Unit face normal from counter-clockwise winding.
    ///
    /// Degenerate triangles get `+Z` so the output stays a valid unit vector.
    pub fn normal(&self) -> [f32; 3] {
        let [v0, v1, v2] = self.vertices;
        let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
        let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
        let nx = e1[1] * e2[2] - e1[2] * e2[1];
        let ny = e1[2] * e2[0] - e1[0] * e2[2];
        let nz = e1[0] * e2[1] - e1[1] * e2[0];
        let len = (nx * nx + ny * ny + nz * nz).sqrt();
        if len > 1e-12 {
            [nx / len, ny / len, nz / len]
        } else {
            [0.0, 0.0, 1.0]
        }
    }
}

impl TriangleMesh {
    /// Axis-aligned bounds `(min, max)`. All zeros for an empty mesh.
    pub fn bounds(&self) -> ([f32; 3], [f32; 3]) {
        if self.triangles.is_empty() {
            return ([0.0; 3], [0.0; 3]);
        }
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for tri in &self.triangles {
            for v in &tri.vertices {
                for i in 0..3 {
                    min[i] = min[i].min(v[i]);
                    max[i] = max[i].max(v[i]);
                }
            }
        }
        (min, max)
    }
}

/// Convert the STL at `stl_path` into a new `<uuid>.glb` in `preview_dir`.
///
/// Every call writes a fresh file, even for identical input.
pub fn convert_to_glb(stl_path: &Path, preview_dir: &Path) -> Result<PathBuf, ConvertError> {
    let data = std::fs::read(stl_path)?;
    let mesh = stl::parse_stl(&data)?;
    let glb = glb::encode_glb(&mesh);

    let glb_path = preview_dir.join(format!("{}.{GLB_EXTENSION}", uuid::Uuid::new_v4()));
    std::fs::write(&glb_path, &glb)?;

    tracing::debug!(
        stl = %stl_path.display(),
        glb = %glb_path.display(),
        triangles = mesh.triangles.len(),
        bytes = glb.len(),
        "Converted STL to GLB"
    );
    Ok(glb_path)
}
