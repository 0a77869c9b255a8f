//! STL decoding (binary and ASCII).

use super::{ConvertError, Triangle, TriangleMesh};

/// Size of the binary STL header.
const HEADER_LEN: usize = 80;

/// Bytes per binary STL triangle: normal, three vertices, attribute count.
const TRIANGLE_LEN: usize = 50;

/// Decode an STL file, detecting the flavour from its contents.
pub fn parse_stl(data: &[u8]) -> Result<TriangleMesh, ConvertError> {
    let triangles = if is_ascii_stl(data) {
        parse_ascii(data)?
    } else {
        parse_binary(data)?
    };

    if triangles.is_empty() {
        return Err(ConvertError::EmptyMesh);
    }
    Ok(TriangleMesh { triangles })
}

/// ASCII STL starts with `solid ` and mentions `facet` early on.
///
/// Binary exporters sometimes put `solid` in the 80-byte header too, so the
/// prefix alone is not enough.
fn is_ascii_stl(data: &[u8]) -> bool {
    if !data.starts_with(b"solid") {
        return false;
    }
    let window = &data[..data.len().min(1024)];
    window.windows(5).any(|w| w == b"facet")
        || window.windows(8).any(|w| w == b"endsolid")
}

fn parse_binary(data: &[u8]) -> Result<Vec<Triangle>, ConvertError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(ConvertError::Truncated {
            expected: HEADER_LEN + 4,
            actual: data.len(),
        });
    }

    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    let expected = HEADER_LEN + 4 + count * TRIANGLE_LEN;
    if data.len() < expected {
        return Err(ConvertError::Truncated {
            expected,
            actual: data.len(),
        });
    }

    let triangles = data[HEADER_LEN + 4..expected]
        .chunks_exact(TRIANGLE_LEN)
        .map(|record| {
            // Stored normals are ignored; they are recomputed from winding.
            let mut vertices = [[0.0f32; 3]; 3];
            for (v, vertex) in vertices.iter_mut().enumerate() {
                for (c, coord) in vertex.iter_mut().enumerate() {
                    let at = 12 + v * 12 + c * 4;
                    *coord = f32::from_le_bytes([
                        record[at],
                        record[at + 1],
                        record[at + 2],
                        record[at + 3],
                    ]);
                }
            }
            Triangle { vertices }
        })
        .collect();

    Ok(triangles)
}

fn parse_ascii(data: &[u8]) -> Result<Vec<Triangle>, ConvertError> {
    let text = std::str::from_utf8(data).map_err(|_| ConvertError::Malformed {
        line: 0,
        reason: "ASCII STL is not valid UTF-8".into(),
    })?;

    let mut triangles = Vec::new();
    let mut pending: Vec<[f32; 3]> = Vec::with_capacity(3);

    for (line_no, line) in text.lines().enumerate() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("vertex") => {
                let mut vertex = [0.0f32; 3];
                for coord in vertex.iter_mut() {
                    *coord = parts
                        .next()
                        .and_then(|p| p.parse::<f32>().ok())
                        .ok_or_else(|| ConvertError::Malformed {
                            line: line_no + 1,
                            reason: format!("invalid vertex '{}'", line.trim()),
                        })?;
                }
                pending.push(vertex);
            }
            Some("endloop") => {
                if pending.len() != 3 {
                    return Err(ConvertError::Malformed {
                        line: line_no + 1,
                        reason: format!("facet has {} vertices, expected 3", pending.len()),
                    });
                }
                triangles.push(Triangle {
                    vertices: [pending[0], pending[1], pending[2]],
                });
                pending.clear();
            }
            _ => {}
        }
    }

    Ok(triangles)
}
