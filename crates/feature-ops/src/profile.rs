//! Canonical feature profiles.
//!
//! Every profile is built in a local frame whose origin is the surface
//! point: local -Z points into the material, local Y is the height axis
//! and local X the width axis. The open face lies on z = 0.

use geom_kernel::{BoundingBox, KernelSolidHandle};
use groove_types::{FeatureParameters, ShapeKind};
use tracing::debug;

use crate::kernel_ext::KernelBundle;
use crate::types::OpError;

/// Depth of an equilateral triangle profile. Depends only on the width;
/// the `depth` field is ignored for triangles.
pub fn triangle_depth(width: f64) -> f64 {
    width * 3.0_f64.sqrt() / 2.0
}

/// Local-frame bounds the built profile will have.
pub fn canonical_bounds(params: &FeatureParameters) -> BoundingBox {
    let w = params.width / 2.0;
    let h = params.height / 2.0;
    let (y, depth) = match params.kind {
        ShapeKind::Rectangular => (h, params.depth),
        ShapeKind::Square => (w, params.depth),
        ShapeKind::Circular => (w, params.depth),
        ShapeKind::Triangle => (h, triangle_depth(params.width)),
    };
    BoundingBox {
        min: [-w, -y, -depth],
        max: [w, y, 0.0],
    }
}

fn check_dimensions(params: &FeatureParameters) -> Result<(), OpError> {
    let dims = [
        ("width", params.width),
        ("depth", params.depth),
        ("height", params.height),
    ];
    for (name, value) in dims {
        if !(value.is_finite() && value > 0.0) {
            return Err(OpError::invalid(format!(
                "{} {} must be positive, got {}",
                params.kind, name, value
            )));
        }
    }
    if !(params.fillet_radius >= 0.0) {
        return Err(OpError::invalid(format!(
            "fillet radius must not be negative, got {}",
            params.fillet_radius
        )));
    }
    Ok(())
}

/// Build the canonical shape for `params` in its local frame.
pub fn build_profile(
    kb: &mut dyn KernelBundle,
    params: &FeatureParameters,
) -> Result<KernelSolidHandle, OpError> {
    check_dimensions(params)?;
    let w = params.width;
    let d = params.depth;
    let h = params.height;

    let handle = match params.kind {
        ShapeKind::Rectangular => kb.build_box([-w / 2.0, -h / 2.0, -d], [w, h, d])?,
        ShapeKind::Square => kb.build_box([-w / 2.0, -w / 2.0, -d], [w, w, d])?,
        ShapeKind::Circular => kb.build_cylinder([0.0, 0.0, -d], [0.0, 0.0, 1.0], w / 2.0, d)?,
        ShapeKind::Triangle => {
            // Apex points into the material; built already centred on the height axis.
            let y = -h / 2.0;
            let triangle = [
                [-w / 2.0, y, 0.0],
                [w / 2.0, y, 0.0],
                [0.0, y, -triangle_depth(w)],
            ];
            kb.build_prism(&triangle, [0.0, h, 0.0])?
        }
    };

    if params.fillet_radius > 0.0 {
        debug!(
            radius = params.fillet_radius,
            "fillet radius recorded, profile edges left sharp"
        );
    }
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geom_kernel::{KernelQuery, MockKernel};

    fn built_bounds(params: FeatureParameters) -> BoundingBox {
        let mut kernel = MockKernel::new();
        let h = build_profile(&mut kernel, &params).unwrap();
        kernel.bounding_box(&h).unwrap()
    }

    #[test]
    fn built_bounds_match_canonical_bounds() {
        for kind in ShapeKind::ALL {
            let params = FeatureParameters::new(kind, 5.0, 2.5, 10.0);
            let built = built_bounds(params);
            let expected = canonical_bounds(&params);
            for i in 0..3 {
                assert_relative_eq!(built.min[i], expected.min[i], epsilon = 1e-9);
                assert_relative_eq!(built.max[i], expected.max[i], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn square_ignores_height() {
        let bbox = built_bounds(FeatureParameters::new(ShapeKind::Square, 4.0, 1.0, 30.0));
        assert_relative_eq!(bbox.extent(0), 4.0);
        assert_relative_eq!(bbox.extent(1), 4.0);
    }

    #[test]
    fn triangle_depth_is_fixed_by_width() {
        let shallow = built_bounds(FeatureParameters::new(ShapeKind::Triangle, 6.0, 0.5, 10.0));
        let deep = built_bounds(FeatureParameters::new(ShapeKind::Triangle, 6.0, 9.0, 10.0));
        assert_relative_eq!(shallow.min[2], deep.min[2]);
        assert_relative_eq!(shallow.min[2], -3.0 * 3.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn rejects_non_positive_width() {
        let mut kernel = MockKernel::new();
        let params = FeatureParameters::new(ShapeKind::Rectangular, 0.0, 2.5, 10.0);
        let err = build_profile(&mut kernel, &params).unwrap_err();
        assert!(matches!(err, OpError::InvalidParameters { .. }));
        assert!(kernel.operation_log().is_empty());
    }

    #[test]
    fn rejects_negative_fillet() {
        let mut kernel = MockKernel::new();
        let params = FeatureParameters::new(ShapeKind::Circular, 5.0, 2.5, 10.0).with_fillet(-1.0);
        assert!(build_profile(&mut kernel, &params).is_err());
    }
}
