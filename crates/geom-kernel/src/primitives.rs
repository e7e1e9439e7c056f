//! Higher-level primitive builders on top of truck's sweep API.
//!
//! truck has no built-in box/cylinder/prism; everything is successive sweeps.

use std::f64::consts::PI;

use truck_modeling::builder;
use truck_modeling::topology::{Edge, Solid, Wire};
use truck_modeling::{InnerSpace, Point3, Rad, Vector3};

use crate::types::KernelError;

fn point(p: [f64; 3]) -> Point3 {
    Point3::new(p[0], p[1], p[2])
}

fn vector(v: [f64; 3]) -> Vector3 {
    Vector3::new(v[0], v[1], v[2])
}

/// Create a box solid via successive translational sweeps.
/// Minimum corner at `origin`, extending by `extents`.
pub fn make_box(origin: [f64; 3], extents: [f64; 3]) -> Solid {
    let v = builder::vertex(point(origin));
    let edge = builder::tsweep(&v, Vector3::new(extents[0], 0.0, 0.0));
    let face = builder::tsweep(&edge, Vector3::new(0.0, extents[1], 0.0));
    builder::tsweep(&face, Vector3::new(0.0, 0.0, extents[2]))
}

/// Create a cylinder solid: circle wire → face → translational sweep.
/// Base disc centered at `base`, extending `height` along `axis`.
pub fn make_cylinder(
    base: [f64; 3],
    axis: [f64; 3],
    radius: f64,
    height: f64,
) -> Result<Solid, KernelError> {
    let axis = vector(axis);
    if axis.magnitude() < 1e-12 {
        return Err(KernelError::Other {
            message: "cylinder axis has zero length".to_string(),
        });
    }
    let axis = axis.normalize();
    let helper = if axis.x.abs() < 0.9 {
        Vector3::unit_x()
    } else {
        Vector3::unit_y()
    };
    let radial = axis.cross(helper).normalize() * radius;

    let center = point(base);
    let v = builder::vertex(center + radial);
    let wire = builder::rsweep(&v, center, axis, Rad(2.0 * PI));
    let face = builder::try_attach_plane(&[wire]).map_err(|e| KernelError::Other {
        message: format!("Failed to create circular face: {}", e),
    })?;
    Ok(builder::tsweep(&face, axis * height))
}

/// Extrude a closed planar polygon along `extrusion`.
pub fn make_prism(polygon: &[[f64; 3]], extrusion: [f64; 3]) -> Result<Solid, KernelError> {
    if polygon.len() < 3 {
        return Err(KernelError::Other {
            message: "Profile has fewer than 3 points".to_string(),
        });
    }

    // Create all vertices first so edges share endpoints.
    let pts: Vec<Point3> = polygon.iter().map(|&p| point(p)).collect();
    let vertices: Vec<_> = pts.iter().map(|&p| builder::vertex(p)).collect();
    let n = pts.len();
    let edges: Vec<Edge> = (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            Edge::new(
                &vertices[i],
                &vertices[j],
                truck_modeling::geometry::Curve::Line(truck_modeling::geometry::Line(
                    pts[i], pts[j],
                )),
            )
        })
        .collect();
    let wire = Wire::from_iter(edges);

    let face = builder::try_attach_plane(&[wire]).map_err(|e| KernelError::Other {
        message: format!("Failed to create planar face: {}", e),
    })?;
    Ok(builder::tsweep(&face, vector(extrusion)))
}
