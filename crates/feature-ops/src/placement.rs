//! Placement of canonical profiles onto a body surface.
//!
//! A target point is snapped to the nearest boundary face, the outward
//! normal is evaluated there, and a rigid transform maps the profile's
//! local -Z (depth) axis onto the inward direction.

use std::f64::consts::PI;

use geom_kernel::{
    Isometry3, KernelError, KernelId, KernelQuery, KernelSolidHandle, Support,
};
use groove_types::{PlacementFrame, ShapeKind};
use nalgebra::{Translation3, Unit, UnitQuaternion, Vector3};
use tracing::debug;

use crate::kernel_ext::KernelBundle;

/// Alignment required between the mapped depth axis and the inward normal.
const FRAME_TOLERANCE: f64 = 1e-9;

/// Below this length a vector is treated as zero.
const DEGENERATE_LENGTH: f64 = 1e-12;

/// Why a single target location could not be placed. The pipeline skips
/// the location and carries on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlacementError {
    #[error("no supporting face near {point:?}: nearest boundary entity is {support:?}")]
    NoSupportingFace { point: [f64; 3], support: Support },

    #[error("surface normal undefined at {point:?}")]
    UndefinedNormal {
        point: [f64; 3],
        face: Option<KernelId>,
    },

    #[error("placement maps the depth axis to {mapped:?} instead of {expected:?}")]
    FrameMismatch { mapped: [f64; 3], expected: [f64; 3] },

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
}

/// Nearest surface point to `target` on `body` and the outward normal there.
pub fn resolve_frame(
    query: &dyn KernelQuery,
    body: &KernelSolidHandle,
    target: [f64; 3],
) -> Result<PlacementFrame, PlacementError> {
    let nearest = query.point_to_shape_distance(target, body)?;
    let point = nearest.nearest_point;
    let face = nearest
        .support
        .face()
        .ok_or(PlacementError::NoSupportingFace {
            point: target,
            support: nearest.support,
        })?;

    let (u, v) = query.surface_parameters(face, point)?;
    let undefined = PlacementError::UndefinedNormal {
        point,
        face: Some(face),
    };
    let normal = query
        .evaluate_surface_normal(face, u, v)
        .ok_or_else(|| undefined.clone())?;
    let normal = Vector3::from(normal);
    let length = normal.norm();
    if !length.is_finite() || length < DEGENERATE_LENGTH {
        return Err(undefined);
    }

    let normal = normal / length;
    debug!(?face, distance = nearest.distance, ?point, ?normal, "resolved placement frame");
    Ok(PlacementFrame::new(point, [normal.x, normal.y, normal.z]))
}

/// Rigid transform taking the canonical profile frame onto `frame`.
///
/// Rotation about the local origin first, then translation to the anchor.
/// A tangent, when given for a profile that is not rotationally symmetric,
/// fixes the in-plane rotation by turning local X onto the tangent's
/// projection into the surface plane.
pub fn placement_transform(
    frame: &PlacementFrame,
    kind: ShapeKind,
) -> Result<Isometry3<f64>, PlacementError> {
    let undefined = || PlacementError::UndefinedNormal {
        point: frame.anchor,
        face: None,
    };
    let normal = Vector3::from(frame.normal);
    if !normal.iter().all(|c| c.is_finite()) || normal.norm() < DEGENERATE_LENGTH {
        return Err(undefined());
    }
    let axis = Unit::new_normalize(normal);
    let n = axis.into_inner();

    // rotation_between has no unique answer for opposite vectors.
    let mut rotation = UnitQuaternion::rotation_between(&Vector3::z(), &n)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI));

    if let Some(tangent) = frame.tangent.filter(|_| !kind.is_rotationally_symmetric()) {
        let tangent = Vector3::from(tangent);
        let in_plane = tangent - n * tangent.dot(&n);
        if in_plane.norm() > DEGENERATE_LENGTH {
            let local_x = rotation * Vector3::x();
            let angle = n.dot(&local_x.cross(&in_plane)).atan2(local_x.dot(&in_plane));
            rotation = UnitQuaternion::from_axis_angle(&axis, angle) * rotation;
        } else {
            debug!(?tangent, "tangent parallel to the normal, in-plane rotation left free");
        }
    }

    let placement = Isometry3::from_parts(Translation3::from(Vector3::from(frame.anchor)), rotation);

    let mapped = placement.transform_vector(&-Vector3::z());
    let expected = -n;
    if mapped.dot(&expected) < 1.0 - FRAME_TOLERANCE {
        return Err(PlacementError::FrameMismatch {
            mapped: [mapped.x, mapped.y, mapped.z],
            expected: [expected.x, expected.y, expected.z],
        });
    }
    Ok(placement)
}

/// Place a copy of `canonical` at `frame`.
pub fn place(
    kb: &mut dyn KernelBundle,
    canonical: &KernelSolidHandle,
    frame: &PlacementFrame,
    kind: ShapeKind,
) -> Result<KernelSolidHandle, PlacementError> {
    let placement = placement_transform(frame, kind)?;
    let placed = kb.transform(canonical, &placement)?;
    debug!(tool = placed.id(), anchor = ?frame.anchor, "placed tool");
    Ok(placed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn assert_vec(actual: Vector3<f64>, expected: [f64; 3]) {
        for i in 0..3 {
            assert_relative_eq!(actual[i], expected[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn identity_for_plus_z_normal() {
        let frame = PlacementFrame::new([1.0, 2.0, 3.0], [0.0, 0.0, 1.0]);
        let iso = placement_transform(&frame, ShapeKind::Rectangular).unwrap();
        assert_vec(iso.transform_vector(&Vector3::x()), [1.0, 0.0, 0.0]);
        let origin = iso.transform_point(&Point3::origin());
        assert_vec(origin.coords, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn rotation_happens_before_translation() {
        let frame = PlacementFrame::new([10.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let iso = placement_transform(&frame, ShapeKind::Rectangular).unwrap();
        // A point one unit deep lands one unit inside the anchor.
        let p = iso.transform_point(&Point3::new(0.0, 0.0, -1.0));
        assert_vec(p.coords, [9.0, 0.0, 0.0]);
    }

    #[test]
    fn unnormalized_normal_is_accepted() {
        let frame = PlacementFrame::new([0.0; 3], [0.0, 3.0, 0.0]);
        let iso = placement_transform(&frame, ShapeKind::Circular).unwrap();
        assert_vec(iso.transform_vector(&Vector3::z()), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn zero_normal_is_undefined() {
        let frame = PlacementFrame::new([0.0; 3], [0.0; 3]);
        let err = placement_transform(&frame, ShapeKind::Square).unwrap_err();
        assert!(matches!(err, PlacementError::UndefinedNormal { face: None, .. }));
    }

    #[test]
    fn tangent_ignored_for_circular_profiles() {
        let plain = PlacementFrame::new([0.0; 3], [0.0, 1.0, 0.0]);
        let with_tangent = plain.with_tangent([0.0, 0.0, 1.0]);
        let a = placement_transform(&plain, ShapeKind::Circular).unwrap();
        let b = placement_transform(&with_tangent, ShapeKind::Circular).unwrap();
        assert_relative_eq!(a.rotation.angle_to(&b.rotation), 0.0, epsilon = 1e-12);
    }
}
