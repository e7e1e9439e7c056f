//! Tessellation wrapper with per-face metadata.
//!
//! Wraps truck-meshalgo to produce a RenderMesh whose FaceRange entries map
//! triangle index ranges back to boundary faces. The mesh also backs the
//! TruckKernel's volume and distance queries.

use nalgebra::{Point3, Vector3};
use truck_meshalgo::prelude::*;
use truck_meshalgo::tessellation::MeshableShape;

use crate::types::*;

type TruckSolid = truck_modeling::Solid;

/// Tessellate a truck Solid into a RenderMesh with per-face tracking.
///
/// Face ids are `face_id_base + running face index`, in boundary order.
pub fn tessellate_solid(
    solid: &TruckSolid,
    tolerance: f64,
    face_id_base: u64,
) -> Result<RenderMesh, KernelError> {
    let meshed_solid = solid.triangulation(tolerance);

    let mut all_vertices: Vec<f32> = Vec::new();
    let mut all_normals: Vec<f32> = Vec::new();
    let mut all_indices: Vec<u32> = Vec::new();
    let mut face_ranges: Vec<FaceRange> = Vec::new();

    let mut face_index = 0u64;
    for shell in meshed_solid.boundaries().iter() {
        for face in shell.face_iter() {
            let face_id = KernelId(face_id_base + face_index);
            face_index += 1;

            // Each meshed face's surface is Option<PolygonMesh>
            let maybe_mesh: Option<PolygonMesh> = face.surface();
            let Some(face_mesh) = maybe_mesh else {
                continue;
            };

            // If face is inverted, the mesh needs inversion too
            let face_mesh = if !face.orientation() {
                let mut m = face_mesh;
                m.invert();
                m
            } else {
                face_mesh
            };

            let start_index = all_indices.len() as u32;
            let base_vertex = (all_vertices.len() / 3) as u32;

            let positions = face_mesh.positions();
            let normals = face_mesh.normals();

            for pos in positions {
                all_vertices.extend([pos[0] as f32, pos[1] as f32, pos[2] as f32]);
            }
            if normals.is_empty() {
                for _ in 0..positions.len() {
                    all_normals.extend([0.0, 0.0, 1.0]);
                }
            } else {
                for norm in normals {
                    all_normals.extend([norm[0] as f32, norm[1] as f32, norm[2] as f32]);
                }
            }

            for tri in face_mesh.tri_faces() {
                for v in tri.iter() {
                    all_indices.push(v.pos as u32 + base_vertex);
                }
            }

            let end_index = all_indices.len() as u32;
            if end_index > start_index {
                face_ranges.push(FaceRange {
                    face_id,
                    start_index,
                    end_index,
                });
            }
        }
    }

    if all_indices.is_empty() {
        return Err(KernelError::TessellationFailed {
            reason: "solid produced no triangles".to_string(),
        });
    }

    Ok(RenderMesh {
        vertices: all_vertices,
        normals: all_normals,
        indices: all_indices,
        face_ranges,
    })
}

fn vertex(mesh: &RenderMesh, index: u32) -> Point3<f64> {
    let i = index as usize * 3;
    Point3::new(
        mesh.vertices[i] as f64,
        mesh.vertices[i + 1] as f64,
        mesh.vertices[i + 2] as f64,
    )
}

/// Iterate the triangles of a mesh as (face id, corners).
pub fn triangles(mesh: &RenderMesh) -> impl Iterator<Item = (KernelId, [Point3<f64>; 3])> + '_ {
    mesh.face_ranges.iter().flat_map(move |range| {
        mesh.indices[range.start_index as usize..range.end_index as usize]
            .chunks_exact(3)
            .map(move |tri| {
                (
                    range.face_id,
                    [vertex(mesh, tri[0]), vertex(mesh, tri[1]), vertex(mesh, tri[2])],
                )
            })
    })
}

/// Signed volume enclosed by an oriented triangle mesh (divergence theorem).
pub fn mesh_volume(mesh: &RenderMesh) -> f64 {
    triangles(mesh)
        .map(|(_, [a, b, c])| a.coords.dot(&b.coords.cross(&c.coords)) / 6.0)
        .sum()
}

/// Closest point to `p` on triangle `abc` (Ericson, Real-Time Collision Detection 5.1.5).
pub fn closest_point_on_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Point3<f64> {
    let ab: Vector3<f64> = b - a;
    let ac: Vector3<f64> = c - a;
    let ap: Vector3<f64> = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}

/// Nearest mesh point to `p` and the face owning it.
pub fn nearest_on_mesh(mesh: &RenderMesh, p: &Point3<f64>) -> Option<(KernelId, Point3<f64>, f64)> {
    triangles(mesh)
        .map(|(face, [a, b, c])| {
            let q = closest_point_on_triangle(p, &a, &b, &c);
            (face, q, (q - p).norm())
        })
        .min_by(|x, y| x.2.partial_cmp(&y.2).unwrap_or(std::cmp::Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    #[test]
    fn closest_point_interior_projects_onto_plane() {
        let q = closest_point_on_triangle(
            &p(0.25, 0.25, 3.0),
            &p(0.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            &p(0.0, 1.0, 0.0),
        );
        assert!((q - p(0.25, 0.25, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn closest_point_outside_clamps_to_vertex() {
        let q = closest_point_on_triangle(
            &p(-1.0, -1.0, 0.0),
            &p(0.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            &p(0.0, 1.0, 0.0),
        );
        assert!((q - p(0.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn closest_point_outside_edge_clamps_to_edge() {
        let q = closest_point_on_triangle(
            &p(0.5, -2.0, 0.0),
            &p(0.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            &p(0.0, 1.0, 0.0),
        );
        assert!((q - p(0.5, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn tessellated_box_volume() {
        let solid = crate::primitives::make_box([0.0; 3], [1.0, 2.0, 3.0]);
        let mesh = tessellate_solid(&solid, 0.1, 0).unwrap();
        assert_eq!(mesh.face_ranges.len(), 6, "Box should have 6 face ranges");
        assert!((mesh_volume(&mesh).abs() - 6.0).abs() < 1e-4);
    }
}
