//! MockKernel: scripted deterministic test double implementing Kernel + KernelQuery.
//!
//! Every shape is a point hull with a signed volume. Distance, surface and
//! normal queries answer against the hull's axis-aligned bounds, so a box
//! body behaves exactly like a box. Failures are scripted per operation.
//! Used by feature-ops and groove-pipeline for unit testing.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use nalgebra::{Isometry3, Point3, Vector3};

use crate::traits::{Kernel, KernelQuery};
use crate::types::*;

/// Face ids are `handle * FACE_STRIDE + index`, index in 0..6.
const FACE_STRIDE: u64 = 8;

/// A synthetic shape.
#[derive(Debug, Clone)]
struct MockSolid {
    /// Hull points in world coordinates.
    points: Vec<[f64; 3]>,
    /// Signed enclosed volume. Zero for open shells.
    volume: f64,
    faces: usize,
    valid: bool,
    /// Handles of the placed shapes this shape was combined from.
    lineage: Vec<u64>,
    /// Tool shapes subtracted from this shape.
    cuts: Vec<u64>,
    /// Tool shapes fused into this shape.
    fusions: Vec<u64>,
}

impl MockSolid {
    fn from_points(points: Vec<[f64; 3]>, volume: f64) -> Self {
        Self {
            points,
            volume,
            faces: 6,
            valid: true,
            lineage: Vec::new(),
            cuts: Vec::new(),
            fusions: Vec::new(),
        }
    }

    fn bounds(&self) -> BoundingBox {
        BoundingBox::from_points(self.points.iter()).unwrap_or(BoundingBox {
            min: [0.0; 3],
            max: [0.0; 3],
        })
    }
}

/// The eight corners of an axis-aligned box.
fn box_corners(min: [f64; 3], max: [f64; 3]) -> Vec<[f64; 3]> {
    let mut corners = Vec::with_capacity(8);
    for &x in &[min[0], max[0]] {
        for &y in &[min[1], max[1]] {
            for &z in &[min[2], max[2]] {
                corners.push([x, y, z]);
            }
        }
    }
    corners
}

fn merged(a: &[u64], b: &[u64]) -> Vec<u64> {
    let mut ids: Vec<u64> = a.iter().chain(b.iter()).copied().collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Scripted test double for the geometry kernel.
pub struct MockKernel {
    next_handle: u64,
    solids: HashMap<u64, MockSolid>,
    models: HashMap<PathBuf, MockSolid>,
    written: Vec<PathBuf>,
    meshes: Vec<PathBuf>,
    log: Vec<String>,
    offset_attempts: Vec<f64>,
    fail_inward_offset: bool,
    fail_outward_offset: bool,
    invert_offset_orientation: bool,
    offset_drift: [f64; 3],
    poisoned: HashSet<u64>,
    fail_multi_tool: bool,
    invalid_boolean_results: bool,
    undefined_normals: HashSet<KernelId>,
    fail_writes: bool,
    fail_mesh_export: bool,
}

impl MockKernel {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            solids: HashMap::new(),
            models: HashMap::new(),
            written: Vec::new(),
            meshes: Vec::new(),
            log: Vec::new(),
            offset_attempts: Vec::new(),
            fail_inward_offset: false,
            fail_outward_offset: false,
            invert_offset_orientation: false,
            offset_drift: [0.0; 3],
            poisoned: HashSet::new(),
            fail_multi_tool: false,
            invalid_boolean_results: false,
            undefined_normals: HashSet::new(),
            fail_writes: false,
            fail_mesh_export: false,
        }
    }

    fn store(&mut self, solid: MockSolid) -> KernelSolidHandle {
        let handle = KernelSolidHandle(self.next_handle);
        self.next_handle += 1;
        self.solids.insert(handle.id(), solid);
        handle
    }

    /// Store a freshly built shape that counts as its own lineage.
    fn store_placed(&mut self, mut solid: MockSolid) -> KernelSolidHandle {
        let id = self.next_handle;
        solid.lineage = vec![id];
        self.store(solid)
    }

    fn get(&self, handle: &KernelSolidHandle) -> Result<&MockSolid, KernelError> {
        self.solids
            .get(&handle.id())
            .ok_or(KernelError::EntityNotFound {
                id: KernelId(handle.id()),
            })
    }

    fn face_owner(&self, face: KernelId) -> Option<(&MockSolid, usize)> {
        let index = (face.0 % FACE_STRIDE) as usize;
        if index >= 6 {
            return None;
        }
        self.solids
            .get(&(face.0 / FACE_STRIDE))
            .map(|solid| (solid, index))
    }

    fn face_id(handle: &KernelSolidHandle, index: usize) -> KernelId {
        KernelId(handle.id() * FACE_STRIDE + index as u64)
    }

    fn check_boolean(
        &self,
        operation: &str,
        a: &MockSolid,
        b: &MockSolid,
    ) -> Result<(), KernelError> {
        if let Some(id) = a
            .lineage
            .iter()
            .chain(b.lineage.iter())
            .find(|id| self.poisoned.contains(id))
        {
            return Err(KernelError::incomplete(
                operation,
                format!("tool {} self-intersects", id),
            ));
        }
        if self.fail_multi_tool && b.lineage.len() > 1 {
            return Err(KernelError::incomplete(
                operation,
                format!("compound tool of {} shapes rejected", b.lineage.len()),
            ));
        }
        Ok(())
    }

    // ── Scripting ───────────────────────────────────────────────────────

    /// Make `path` readable as a closed box body spanning `min`..`max`.
    pub fn register_box_model(&mut self, path: impl Into<PathBuf>, min: [f64; 3], max: [f64; 3]) {
        self.models.insert(path.into(), Self::box_solid(min, max));
    }

    /// Make `path` readable as an open box-shaped shell (zero volume).
    pub fn register_shell_model(
        &mut self,
        path: impl Into<PathBuf>,
        min: [f64; 3],
        max: [f64; 3],
    ) {
        let mut shell = Self::box_solid(min, max);
        shell.volume = 0.0;
        self.models.insert(path.into(), shell);
    }

    /// Make `path` readable as a shape that fails validity analysis.
    pub fn register_corrupt_model(&mut self, path: impl Into<PathBuf>) {
        let mut shell = Self::box_solid([0.0; 3], [1.0; 3]);
        shell.valid = false;
        self.models.insert(path.into(), shell);
    }

    /// Make `path` readable as a valid shape without boundary faces.
    pub fn register_faceless_model(
        &mut self,
        path: impl Into<PathBuf>,
        min: [f64; 3],
        max: [f64; 3],
    ) {
        let mut shell = Self::box_solid(min, max);
        shell.volume = 0.0;
        shell.faces = 0;
        self.models.insert(path.into(), shell);
    }

    fn box_solid(min: [f64; 3], max: [f64; 3]) -> MockSolid {
        let volume = (0..3).map(|i| max[i] - min[i]).product();
        MockSolid::from_points(box_corners(min, max), volume)
    }

    /// Insert a closed box body directly.
    pub fn insert_box(&mut self, min: [f64; 3], max: [f64; 3]) -> KernelSolidHandle {
        let solid = Self::box_solid(min, max);
        self.store_placed(solid)
    }

    pub fn fail_inward_offset(&mut self) {
        self.fail_inward_offset = true;
    }

    pub fn fail_outward_offset(&mut self) {
        self.fail_outward_offset = true;
    }

    /// Offsets succeed but return solids with inverted orientation.
    pub fn invert_offset_orientation(&mut self) {
        self.invert_offset_orientation = true;
    }

    /// Offsets succeed but the result is translated by `by`.
    pub fn drift_offset(&mut self, by: [f64; 3]) {
        self.offset_drift = by;
    }

    /// Every boolean involving this shape (directly or inside a compound) is incomplete.
    pub fn poison(&mut self, shape: &KernelSolidHandle) {
        self.poisoned.insert(shape.id());
    }

    /// Booleans whose second operand is a compound of several shapes are incomplete.
    pub fn fail_multi_tool_booleans(&mut self) {
        self.fail_multi_tool = true;
    }

    /// Boolean results fail validity analysis.
    pub fn invalidate_boolean_results(&mut self) {
        self.invalid_boolean_results = true;
    }

    pub fn undefine_normal(&mut self, face: KernelId) {
        self.undefined_normals.insert(face);
    }

    pub fn fail_writes(&mut self) {
        self.fail_writes = true;
    }

    pub fn fail_mesh_export(&mut self) {
        self.fail_mesh_export = true;
    }

    // ── Inspection ──────────────────────────────────────────────────────

    /// Handles of the tool shapes subtracted from `shape`.
    pub fn cut_sources(&self, shape: &KernelSolidHandle) -> Vec<u64> {
        self.solids
            .get(&shape.id())
            .map(|s| s.cuts.clone())
            .unwrap_or_default()
    }

    /// Handles of the tool shapes fused into `shape`.
    pub fn fused_sources(&self, shape: &KernelSolidHandle) -> Vec<u64> {
        self.solids
            .get(&shape.id())
            .map(|s| s.fusions.clone())
            .unwrap_or_default()
    }

    /// Names of the kernel operations invoked so far, in order.
    pub fn operation_log(&self) -> &[String] {
        &self.log
    }

    pub fn count_operations(&self, name: &str) -> usize {
        self.log.iter().filter(|op| op.as_str() == name).count()
    }

    /// Signed thickness of every offset attempt, in order.
    pub fn offset_attempts(&self) -> &[f64] {
        &self.offset_attempts
    }

    pub fn written_paths(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn mesh_paths(&self) -> &[PathBuf] {
        &self.meshes
    }
}

impl Default for MockKernel {
    fn default() -> Self {
        Self::new()
    }
}

/// Two unit vectors orthogonal to `n` and to each other.
fn perpendicular_basis(n: Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let helper = if n.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = n.cross(&helper).normalize();
    let v = n.cross(&u);
    (u, v)
}

impl Kernel for MockKernel {
    fn read_solid_model(&mut self, path: &Path) -> Result<KernelSolidHandle, KernelError> {
        self.log.push("read".to_string());
        let solid = self
            .models
            .get(path)
            .cloned()
            .ok_or_else(|| KernelError::ImportFailed {
                path: path.display().to_string(),
                reason: "no such model".to_string(),
            })?;
        Ok(self.store_placed(solid))
    }

    fn write_solid_model(
        &mut self,
        shape: &KernelSolidHandle,
        path: &Path,
    ) -> Result<(), KernelError> {
        self.log.push("write".to_string());
        self.get(shape)?;
        if self.fail_writes {
            return Err(KernelError::ExportFailed {
                path: path.display().to_string(),
                reason: "writer reported failure".to_string(),
            });
        }
        self.written.push(path.to_path_buf());
        Ok(())
    }

    fn export_mesh(
        &mut self,
        shape: &KernelSolidHandle,
        path: &Path,
        _tolerance: f64,
    ) -> Result<(), KernelError> {
        self.log.push("export_mesh".to_string());
        self.get(shape)?;
        if self.fail_mesh_export {
            return Err(KernelError::TessellationFailed {
                reason: "scripted mesh failure".to_string(),
            });
        }
        self.meshes.push(path.to_path_buf());
        Ok(())
    }

    fn boolean_union(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
        _fuzzy: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.log.push("union".to_string());
        let solid_a = self.get(a)?.clone();
        let solid_b = self.get(b)?.clone();
        self.check_boolean("union", &solid_a, &solid_b)?;

        let mut points = solid_a.points.clone();
        points.extend(solid_b.points.iter().copied());
        let result = MockSolid {
            points,
            volume: solid_a.volume + solid_b.volume.abs(),
            faces: solid_a.faces + solid_b.faces,
            valid: solid_a.valid && solid_b.valid && !self.invalid_boolean_results,
            lineage: merged(&solid_a.lineage, &solid_b.lineage),
            cuts: merged(&solid_a.cuts, &solid_b.cuts),
            fusions: merged(
                &solid_a.fusions,
                &merged(&solid_b.fusions, &solid_b.lineage),
            ),
        };
        Ok(self.store(result))
    }

    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
        _fuzzy: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.log.push("subtract".to_string());
        let solid_a = self.get(a)?.clone();
        let solid_b = self.get(b)?.clone();
        self.check_boolean("subtract", &solid_a, &solid_b)?;

        let result = MockSolid {
            points: solid_a.points.clone(),
            volume: solid_a.volume - solid_b.volume.abs(),
            faces: solid_a.faces + solid_b.faces,
            valid: solid_a.valid && solid_b.valid && !self.invalid_boolean_results,
            lineage: solid_a.lineage.clone(),
            cuts: merged(&solid_a.cuts, &solid_b.lineage),
            fusions: solid_a.fusions.clone(),
        };
        Ok(self.store(result))
    }

    fn offset_solid(
        &mut self,
        shape: &KernelSolidHandle,
        signed_thickness: f64,
        _tolerance: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.log.push("offset".to_string());
        self.offset_attempts.push(signed_thickness);
        let source = self.get(shape)?.clone();

        let inward = signed_thickness < 0.0;
        if signed_thickness == 0.0
            || (inward && self.fail_inward_offset)
            || (!inward && self.fail_outward_offset)
        {
            return Err(KernelError::incomplete(
                "offset",
                format!("offset by {} self-intersects", signed_thickness),
            ));
        }

        let bounds = source.bounds();
        let grow = if inward { 0.0 } else { signed_thickness };
        let min: [f64; 3] = std::array::from_fn(|i| bounds.min[i] - grow + self.offset_drift[i]);
        let max: [f64; 3] = std::array::from_fn(|i| bounds.max[i] + grow + self.offset_drift[i]);

        let e: [f64; 3] = std::array::from_fn(|i| bounds.extent(i));
        let area = 2.0 * (e[0] * e[1] + e[1] * e[2] + e[0] * e[2]);
        let volume = area * signed_thickness.abs();

        let mut solid = MockSolid::from_points(box_corners(min, max), volume);
        if self.invert_offset_orientation {
            solid.volume = -volume;
        }
        solid.faces = source.faces * 2;
        solid.lineage = source.lineage.clone();
        Ok(self.store(solid))
    }

    fn reverse_orientation(
        &mut self,
        shape: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.log.push("reverse".to_string());
        let mut solid = self.get(shape)?.clone();
        solid.volume = -solid.volume;
        Ok(self.store(solid))
    }

    fn build_box(
        &mut self,
        origin: [f64; 3],
        extents: [f64; 3],
    ) -> Result<KernelSolidHandle, KernelError> {
        self.log.push("box".to_string());
        if extents.iter().any(|&e| e <= 0.0) {
            return Err(KernelError::Other {
                message: format!("box extents must be positive, got {:?}", extents),
            });
        }
        let max = std::array::from_fn(|i| origin[i] + extents[i]);
        let solid = Self::box_solid(origin, max);
        Ok(self.store_placed(solid))
    }

    fn build_cylinder(
        &mut self,
        base: [f64; 3],
        axis: [f64; 3],
        radius: f64,
        height: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.log.push("cylinder".to_string());
        let axis = Vector3::from(axis);
        if radius <= 0.0 || height <= 0.0 || axis.norm() < 1e-12 {
            return Err(KernelError::Other {
                message: "degenerate cylinder".to_string(),
            });
        }
        let axis = axis.normalize();
        let (u, v) = perpendicular_basis(axis);
        let base = Vector3::from(base);

        let mut points = Vec::with_capacity(8);
        for offset in [Vector3::zeros(), axis * height] {
            for rim in [u, -u, v, -v] {
                let p = base + offset + rim * radius;
                points.push([p.x, p.y, p.z]);
            }
        }
        let volume = std::f64::consts::PI * radius * radius * height;
        let mut solid = MockSolid::from_points(points, volume);
        solid.faces = 3;
        Ok(self.store_placed(solid))
    }

    fn build_prism(
        &mut self,
        polygon: &[[f64; 3]],
        extrusion: [f64; 3],
    ) -> Result<KernelSolidHandle, KernelError> {
        self.log.push("prism".to_string());
        if polygon.len() < 3 {
            return Err(KernelError::Other {
                message: "Profile has fewer than 3 points".to_string(),
            });
        }

        // Newell's method: |sum of edge cross products| / 2 is the polygon area.
        let mut newell = Vector3::zeros();
        for (i, p) in polygon.iter().enumerate() {
            let q = polygon[(i + 1) % polygon.len()];
            newell += Vector3::from(*p).cross(&Vector3::from(q));
        }
        let area = newell.norm() / 2.0;
        let sweep = Vector3::from(extrusion);
        let volume = if area > 1e-12 {
            area * sweep.dot(&newell.normalize()).abs()
        } else {
            0.0
        };
        if volume <= 0.0 {
            return Err(KernelError::Other {
                message: "degenerate prism".to_string(),
            });
        }

        let mut points = polygon.to_vec();
        points.extend(
            polygon
                .iter()
                .map(|p| std::array::from_fn(|i| p[i] + extrusion[i])),
        );
        let mut solid = MockSolid::from_points(points, volume);
        solid.faces = polygon.len() + 2;
        Ok(self.store_placed(solid))
    }

    fn transform(
        &mut self,
        shape: &KernelSolidHandle,
        placement: &Isometry3<f64>,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.log.push("transform".to_string());
        let mut solid = self.get(shape)?.clone();
        solid.points = solid
            .points
            .iter()
            .map(|p| {
                let q = placement.transform_point(&Point3::from(*p));
                [q.x, q.y, q.z]
            })
            .collect();
        Ok(self.store_placed(solid))
    }
}

impl KernelQuery for MockKernel {
    fn check_validity(&self, shape: &KernelSolidHandle) -> bool {
        self.solids.get(&shape.id()).is_some_and(|s| s.valid)
    }

    fn face_count(&self, shape: &KernelSolidHandle) -> usize {
        self.solids.get(&shape.id()).map_or(0, |s| s.faces)
    }

    fn point_to_shape_distance(
        &self,
        point: [f64; 3],
        shape: &KernelSolidHandle,
    ) -> Result<DistanceQuery, KernelError> {
        let bounds = self.get(shape)?.bounds();

        let mut nearest = point;
        let mut clamped = Vec::new();
        for i in 0..3 {
            if point[i] < bounds.min[i] {
                nearest[i] = bounds.min[i];
                clamped.push(2 * i);
            } else if point[i] > bounds.max[i] {
                nearest[i] = bounds.max[i];
                clamped.push(2 * i + 1);
            }
        }

        let support = match clamped.len() {
            // Inside: project onto the closest face.
            0 => {
                let mut best = (f64::MAX, 0);
                for i in 0..3 {
                    let to_min = point[i] - bounds.min[i];
                    let to_max = bounds.max[i] - point[i];
                    if to_min < best.0 {
                        best = (to_min, 2 * i);
                    }
                    if to_max < best.0 {
                        best = (to_max, 2 * i + 1);
                    }
                }
                let index = best.1;
                let axis = index / 2;
                nearest[axis] = if index % 2 == 0 {
                    bounds.min[axis]
                } else {
                    bounds.max[axis]
                };
                Support::Face(Self::face_id(shape, index))
            }
            1 => Support::Face(Self::face_id(shape, clamped[0])),
            2 => Support::Edge(KernelId(shape.id() * FACE_STRIDE + 6)),
            _ => Support::Vertex(KernelId(shape.id() * FACE_STRIDE + 7)),
        };

        let distance = (0..3)
            .map(|i| (point[i] - nearest[i]).powi(2))
            .sum::<f64>()
            .sqrt();

        Ok(DistanceQuery {
            distance,
            nearest_point: nearest,
            support,
        })
    }

    fn shape_distance(
        &self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<f64, KernelError> {
        Ok(self.get(a)?.bounds().separation(&self.get(b)?.bounds()))
    }

    fn surface_parameters(
        &self,
        face: KernelId,
        point: [f64; 3],
    ) -> Result<(f64, f64), KernelError> {
        let (_, index) = self
            .face_owner(face)
            .ok_or(KernelError::EntityNotFound { id: face })?;
        let axis = index / 2;
        Ok((point[(axis + 1) % 3], point[(axis + 2) % 3]))
    }

    fn evaluate_surface_normal(&self, face: KernelId, _u: f64, _v: f64) -> Option<[f64; 3]> {
        if self.undefined_normals.contains(&face) {
            return None;
        }
        let (_, index) = self.face_owner(face)?;
        let mut normal = [0.0; 3];
        normal[index / 2] = if index % 2 == 0 { -1.0 } else { 1.0 };
        Some(normal)
    }

    fn signed_volume(&self, shape: &KernelSolidHandle) -> Result<f64, KernelError> {
        Ok(self.get(shape)?.volume)
    }

    fn bounding_box(&self, shape: &KernelSolidHandle) -> Option<BoundingBox> {
        self.solids.get(&shape.id()).map(MockSolid::bounds)
    }
}
