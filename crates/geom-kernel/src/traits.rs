use std::path::Path;

use nalgebra::Isometry3;

use crate::types::*;

/// Core geometry kernel trait: construction, booleans, offsetting and file I/O.
/// Implemented by TruckKernel (wraps real truck) and MockKernel (scripted test double).
pub trait Kernel {
    /// Read a solid model from disk.
    fn read_solid_model(&mut self, path: &Path) -> Result<KernelSolidHandle, KernelError>;

    /// Write a solid model to disk. `Ok` only when the writer confirms success.
    fn write_solid_model(&mut self, shape: &KernelSolidHandle, path: &Path)
        -> Result<(), KernelError>;

    /// Tessellate a shape and write the mesh to disk.
    fn export_mesh(
        &mut self,
        shape: &KernelSolidHandle,
        path: &Path,
        tolerance: f64,
    ) -> Result<(), KernelError>;

    /// Boolean union of two shapes with a fuzzy tolerance.
    fn boolean_union(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
        fuzzy: f64,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Boolean subtraction: a minus b, with a fuzzy tolerance.
    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
        fuzzy: f64,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Offset a shell into a solid of uniform thickness. The sign selects the side.
    fn offset_solid(
        &mut self,
        shape: &KernelSolidHandle,
        signed_thickness: f64,
        tolerance: f64,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Return a copy of the shape with every face orientation flipped.
    fn reverse_orientation(
        &mut self,
        shape: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Axis-aligned box with its minimum corner at `origin`.
    fn build_box(
        &mut self,
        origin: [f64; 3],
        extents: [f64; 3],
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Circular cylinder whose base disc is centered at `base`, extending along `axis`.
    fn build_cylinder(
        &mut self,
        base: [f64; 3],
        axis: [f64; 3],
        radius: f64,
        height: f64,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Extrude a closed planar polygon along `extrusion`.
    fn build_prism(
        &mut self,
        polygon: &[[f64; 3]],
        extrusion: [f64; 3],
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Return a rigidly transformed copy of the shape.
    fn transform(
        &mut self,
        shape: &KernelSolidHandle,
        placement: &Isometry3<f64>,
    ) -> Result<KernelSolidHandle, KernelError>;
}

/// Read-only geometric queries. Safe to run against a body while no
/// construction is in progress.
pub trait KernelQuery {
    /// Whether the shape passes the kernel's validity analysis.
    fn check_validity(&self, shape: &KernelSolidHandle) -> bool;

    /// Number of boundary faces of the shape.
    fn face_count(&self, shape: &KernelSolidHandle) -> usize;

    /// Nearest boundary point of `shape` to `point`, with its owning entity.
    fn point_to_shape_distance(
        &self,
        point: [f64; 3],
        shape: &KernelSolidHandle,
    ) -> Result<DistanceQuery, KernelError>;

    /// Minimum distance between two shapes.
    fn shape_distance(
        &self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<f64, KernelError>;

    /// Invert a face's parametric mapping at a point lying on (or near) it.
    fn surface_parameters(&self, face: KernelId, point: [f64; 3])
        -> Result<(f64, f64), KernelError>;

    /// Outward unit normal at surface parameters. `None` where it is not defined.
    fn evaluate_surface_normal(&self, face: KernelId, u: f64, v: f64) -> Option<[f64; 3]>;

    /// Signed enclosed volume. Negative when face orientation is inverted.
    fn signed_volume(&self, shape: &KernelSolidHandle) -> Result<f64, KernelError>;

    /// Axis-aligned bounds of the shape.
    fn bounding_box(&self, shape: &KernelSolidHandle) -> Option<BoundingBox>;
}
