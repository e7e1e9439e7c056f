//! TruckKernel: real geometry kernel wrapping truck's API.
//!
//! Offsetting is not available in truck, so `offset_solid` reports
//! `NotSupported`. Distance, volume and bounds queries run on a tessellation
//! at `QUERY_TOLERANCE`.

use std::collections::HashMap;
use std::path::Path;

use nalgebra::Isometry3;
use tracing::debug;
use truck_modeling::builder;
use truck_modeling::geometry::{Curve, Surface};
use truck_modeling::topology::{Face, Solid};
use truck_modeling::{InnerSpace, Matrix4, ParametricSurface3D, Point3};
use truck_modeling::{SearchNearestParameter, D2};
use truck_stepio::out;
use truck_topology::compress::CompressedSolid;
use truck_topology::shell::ShellCondition;

use crate::primitives;
use crate::stl;
use crate::tessellation;
use crate::traits::{Kernel, KernelQuery};
use crate::types::*;

/// Face ids are `handle * FACE_STRIDE + face index`.
const FACE_STRIDE: u64 = 10_000;

/// Tessellation tolerance used by geometric queries.
const QUERY_TOLERANCE: f64 = 0.05;

/// Newton trials for surface parameter inversion.
const INVERSION_TRIALS: usize = 100;

type CompressedModel = CompressedSolid<Point3, Curve, Surface>;

/// Real geometry kernel backed by the truck BREP library.
pub struct TruckKernel {
    next_handle: u64,
    solids: HashMap<u64, Solid>,
}

impl TruckKernel {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            solids: HashMap::new(),
        }
    }

    pub(crate) fn store_solid(&mut self, solid: Solid) -> KernelSolidHandle {
        let handle = KernelSolidHandle(self.next_handle);
        self.next_handle += 1;
        self.solids.insert(handle.id(), solid);
        handle
    }

    pub(crate) fn get_solid(&self, handle: &KernelSolidHandle) -> Result<&Solid, KernelError> {
        self.solids
            .get(&handle.id())
            .ok_or(KernelError::EntityNotFound {
                id: KernelId(handle.id()),
            })
    }

    fn mesh(&self, handle: &KernelSolidHandle) -> Result<RenderMesh, KernelError> {
        let solid = self.get_solid(handle)?;
        tessellation::tessellate_solid(solid, QUERY_TOLERANCE, handle.id() * FACE_STRIDE)
    }

    fn face(&self, id: KernelId) -> Option<&Face> {
        let solid = self.solids.get(&(id.0 / FACE_STRIDE))?;
        let index = (id.0 % FACE_STRIDE) as usize;
        solid
            .boundaries()
            .iter()
            .flat_map(|shell| shell.face_iter())
            .nth(index)
    }
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn to_point(p: [f64; 3]) -> Point3 {
    Point3::new(p[0], p[1], p[2])
}

impl Kernel for TruckKernel {
    fn read_solid_model(&mut self, path: &Path) -> Result<KernelSolidHandle, KernelError> {
        let import_failed = |reason: String| KernelError::ImportFailed {
            path: path.display().to_string(),
            reason,
        };
        if !is_json(path) {
            return Err(KernelError::NotSupported {
                operation: format!("reading {} (only compressed JSON models)", path.display()),
            });
        }

        let text = std::fs::read_to_string(path).map_err(|e| import_failed(e.to_string()))?;
        let compressed: CompressedModel =
            serde_json::from_str(&text).map_err(|e| import_failed(e.to_string()))?;
        let solid = Solid::extract(compressed).map_err(|e| import_failed(format!("{:?}", e)))?;
        Ok(self.store_solid(solid))
    }

    fn write_solid_model(
        &mut self,
        shape: &KernelSolidHandle,
        path: &Path,
    ) -> Result<(), KernelError> {
        let export_failed = |reason: String| KernelError::ExportFailed {
            path: path.display().to_string(),
            reason,
        };
        let compressed = self.get_solid(shape)?.compress();

        let contents = if is_json(path) {
            serde_json::to_string(&compressed).map_err(|e| export_failed(e.to_string()))?
        } else {
            out::CompleteStepDisplay::new(
                out::StepModel::from(&compressed),
                out::StepHeaderDescriptor {
                    organization_system: "groove-clip".to_owned(),
                    ..Default::default()
                },
            )
            .to_string()
        };

        std::fs::write(path, contents).map_err(|e| export_failed(e.to_string()))
    }

    fn export_mesh(
        &mut self,
        shape: &KernelSolidHandle,
        path: &Path,
        tolerance: f64,
    ) -> Result<(), KernelError> {
        let solid = self.get_solid(shape)?;
        let mesh = tessellation::tessellate_solid(solid, tolerance, shape.id() * FACE_STRIDE)?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("preview");
        let bytes = stl::encode_binary_stl(&mesh, name)?;
        std::fs::write(path, bytes).map_err(|e| KernelError::ExportFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn boolean_union(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
        fuzzy: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        let solid_a = self.get_solid(a)?.clone();
        let solid_b = self.get_solid(b)?.clone();

        let result = truck_shapeops::or(&solid_a, &solid_b, fuzzy)
            .ok_or_else(|| KernelError::incomplete("union", "truck or() returned None"))?;
        Ok(self.store_solid(result))
    }

    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
        fuzzy: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        let solid_a = self.get_solid(a)?.clone();
        let mut solid_b = self.get_solid(b)?.clone();

        // Subtraction = A ∩ ¬B. not() mutates in place.
        solid_b.not();
        let result = truck_shapeops::and(&solid_a, &solid_b, fuzzy).ok_or_else(|| {
            KernelError::incomplete("subtract", "truck and() returned None for subtraction")
        })?;
        Ok(self.store_solid(result))
    }

    fn offset_solid(
        &mut self,
        shape: &KernelSolidHandle,
        _signed_thickness: f64,
        _tolerance: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.get_solid(shape)?;
        Err(KernelError::NotSupported {
            operation: "offset_solid".to_string(),
        })
    }

    fn reverse_orientation(
        &mut self,
        shape: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        let mut solid = self.get_solid(shape)?.clone();
        solid.not();
        Ok(self.store_solid(solid))
    }

    fn build_box(
        &mut self,
        origin: [f64; 3],
        extents: [f64; 3],
    ) -> Result<KernelSolidHandle, KernelError> {
        if extents.iter().any(|&e| e <= 0.0) {
            return Err(KernelError::Other {
                message: format!("box extents must be positive, got {:?}", extents),
            });
        }
        Ok(self.store_solid(primitives::make_box(origin, extents)))
    }

    fn build_cylinder(
        &mut self,
        base: [f64; 3],
        axis: [f64; 3],
        radius: f64,
        height: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        let solid = primitives::make_cylinder(base, axis, radius, height)?;
        Ok(self.store_solid(solid))
    }

    fn build_prism(
        &mut self,
        polygon: &[[f64; 3]],
        extrusion: [f64; 3],
    ) -> Result<KernelSolidHandle, KernelError> {
        let solid = primitives::make_prism(polygon, extrusion)?;
        Ok(self.store_solid(solid))
    }

    fn transform(
        &mut self,
        shape: &KernelSolidHandle,
        placement: &Isometry3<f64>,
    ) -> Result<KernelSolidHandle, KernelError> {
        let solid = self.get_solid(shape)?;
        // Both nalgebra and cgmath store matrices column-major.
        let h = placement.to_homogeneous();
        let m = h.as_slice();
        let matrix = Matrix4::new(
            m[0], m[1], m[2], m[3], m[4], m[5], m[6], m[7], m[8], m[9], m[10], m[11], m[12],
            m[13], m[14], m[15],
        );
        let moved = builder::transformed(solid, matrix);
        Ok(self.store_solid(moved))
    }
}

impl KernelQuery for TruckKernel {
    fn check_validity(&self, shape: &KernelSolidHandle) -> bool {
        let Ok(solid) = self.get_solid(shape) else {
            return false;
        };
        let boundaries = solid.boundaries();
        !boundaries.is_empty()
            && boundaries
                .iter()
                .all(|shell| shell.shell_condition() == ShellCondition::Closed)
    }

    fn face_count(&self, shape: &KernelSolidHandle) -> usize {
        self.get_solid(shape).map_or(0, |solid| {
            solid
                .boundaries()
                .iter()
                .map(|shell| shell.face_iter().count())
                .sum()
        })
    }

    fn point_to_shape_distance(
        &self,
        point: [f64; 3],
        shape: &KernelSolidHandle,
    ) -> Result<DistanceQuery, KernelError> {
        let mesh = self.mesh(shape)?;
        let target = nalgebra::Point3::from(point);
        let (face, nearest, distance) = tessellation::nearest_on_mesh(&mesh, &target)
            .ok_or_else(|| KernelError::TessellationFailed {
                reason: "empty mesh".to_string(),
            })?;
        debug!(?face, distance, "nearest boundary point");
        Ok(DistanceQuery {
            distance,
            nearest_point: [nearest.x, nearest.y, nearest.z],
            support: Support::Face(face),
        })
    }

    fn shape_distance(
        &self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<f64, KernelError> {
        let mesh_a = self.mesh(a)?;
        let mesh_b = self.mesh(b)?;
        let min_to = |from: &RenderMesh, to: &RenderMesh| {
            from.vertices
                .chunks_exact(3)
                .filter_map(|v| {
                    let p = nalgebra::Point3::new(v[0] as f64, v[1] as f64, v[2] as f64);
                    tessellation::nearest_on_mesh(to, &p).map(|(_, _, d)| d)
                })
                .fold(f64::MAX, f64::min)
        };
        Ok(min_to(&mesh_a, &mesh_b).min(min_to(&mesh_b, &mesh_a)))
    }

    fn surface_parameters(
        &self,
        face: KernelId,
        point: [f64; 3],
    ) -> Result<(f64, f64), KernelError> {
        let truck_face = self
            .face(face)
            .ok_or(KernelError::EntityNotFound { id: face })?;
        let surface = truck_face.oriented_surface();
        SearchNearestParameter::<D2>::search_nearest_parameter(
            &surface,
            to_point(point),
            None,
            INVERSION_TRIALS,
        )
        .ok_or_else(|| KernelError::incomplete("surface inversion", format!("{:?}", face)))
    }

    fn evaluate_surface_normal(&self, face: KernelId, u: f64, v: f64) -> Option<[f64; 3]> {
        let surface = self.face(face)?.oriented_surface();
        let n = surface.normal(u, v);
        let len = n.magnitude();
        if !len.is_finite() || len < 1e-9 {
            return None;
        }
        let n = n / len;
        Some([n.x, n.y, n.z])
    }

    fn signed_volume(&self, shape: &KernelSolidHandle) -> Result<f64, KernelError> {
        Ok(tessellation::mesh_volume(&self.mesh(shape)?))
    }

    fn bounding_box(&self, shape: &KernelSolidHandle) -> Option<BoundingBox> {
        let mesh = self.mesh(shape).ok()?;
        let points: Vec<[f64; 3]> = mesh
            .vertices
            .chunks_exact(3)
            .map(|v| [v[0] as f64, v[1] as f64, v[2] as f64])
            .collect();
        BoundingBox::from_points(points.iter())
    }
}
