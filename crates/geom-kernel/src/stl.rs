//! Binary STL encoding for preview meshes.

use crate::types::{KernelError, RenderMesh};

/// Unit normal of the triangle at `tri`, falling back to +Z for slivers.
fn facet_normal(mesh: &RenderMesh, tri: &[u32]) -> [f32; 3] {
    let corner = |k: usize| {
        let i = tri[k] as usize * 3;
        [mesh.vertices[i], mesh.vertices[i + 1], mesh.vertices[i + 2]]
    };
    let (p0, p1, p2) = (corner(0), corner(1), corner(2));
    let a = [p1[0] - p0[0], p1[1] - p0[1], p1[2] - p0[2]];
    let b = [p2[0] - p0[0], p2[1] - p0[1], p2[2] - p0[2]];
    let n = [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 1e-12 {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}

/// Encode a RenderMesh as binary STL.
///
/// Layout: 80-byte header, u32 triangle count (little-endian), then per
/// triangle 3×f32 normal + 3×(3×f32 vertex) + u16 attribute = 50 bytes.
pub fn encode_binary_stl(mesh: &RenderMesh, name: &str) -> Result<Vec<u8>, KernelError> {
    let tri_count = mesh.indices.len() / 3;
    if tri_count == 0 {
        return Err(KernelError::TessellationFailed {
            reason: "mesh has no triangles".to_string(),
        });
    }

    let vertex_count = mesh.vertices.len() / 3;
    if let Some(&idx) = mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(KernelError::TessellationFailed {
            reason: format!("index {} out of range (vertex count = {})", idx, vertex_count),
        });
    }

    let mut buf = Vec::with_capacity(80 + 4 + tri_count * 50);

    let header = format!("binary STL: {}", name);
    let header_bytes = header.as_bytes();
    buf.extend_from_slice(&header_bytes[..header_bytes.len().min(80)]);
    buf.resize(80, 0u8);

    buf.extend_from_slice(&(tri_count as u32).to_le_bytes());

    for tri in mesh.indices.chunks_exact(3) {
        for component in facet_normal(mesh, tri) {
            buf.extend_from_slice(&component.to_le_bytes());
        }
        for &idx in tri {
            let vi = idx as usize * 3;
            for k in 0..3 {
                buf.extend_from_slice(&mesh.vertices[vi + k].to_le_bytes());
            }
        }
        buf.extend_from_slice(&0u16.to_le_bytes());
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FaceRange, KernelId};

    fn single_triangle() -> RenderMesh {
        RenderMesh {
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            indices: vec![0, 1, 2],
            face_ranges: vec![FaceRange {
                face_id: KernelId(1),
                start_index: 0,
                end_index: 3,
            }],
        }
    }

    #[test]
    fn binary_stl_size_and_count() {
        let bytes = encode_binary_stl(&single_triangle(), "tri").unwrap();
        assert_eq!(bytes.len(), 80 + 4 + 50);
        assert_eq!(u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]), 1);
        // Normal of a CCW triangle in the XY plane is +Z.
        let nz = f32::from_le_bytes([bytes[92], bytes[93], bytes[94], bytes[95]]);
        assert_eq!(nz, 1.0);
    }

    #[test]
    fn empty_mesh_is_rejected() {
        let mut mesh = single_triangle();
        mesh.indices.clear();
        assert!(encode_binary_stl(&mesh, "empty").is_err());
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut mesh = single_triangle();
        mesh.indices = vec![0, 1, 7];
        assert!(encode_binary_stl(&mesh, "bad").is_err());
    }
}
