//! Uniform thickening of a shell into a solid.

use geom_kernel::{KernelError, KernelQuery, KernelSolidHandle};
use tracing::{debug, warn};

use crate::kernel_ext::KernelBundle;
use crate::types::{Diagnostics, OpError};

/// A successfully thickened solid.
#[derive(Debug, Clone)]
pub struct Thickened {
    pub handle: KernelSolidHandle,
    /// Offset that completed: negative for inward, positive for outward.
    pub signed_thickness: f64,
    /// The kernel produced inverted faces and the solid was reversed.
    pub reoriented: bool,
    pub diagnostics: Diagnostics,
}

/// An offset the other direction may still produce.
fn retry_outward(e: &KernelError) -> bool {
    e.is_incomplete() || matches!(e, KernelError::NotSupported { .. })
}

/// Offset `shape` by `thickness`, inward first, outward if that does not
/// complete. Other kernel errors (unknown handle and the like) are returned
/// as they are. A solid with negative signed volume is reversed before it is
/// returned. Deviation from the input beyond `deviation_tolerance` is a
/// warning.
pub fn thicken(
    kb: &mut dyn KernelBundle,
    shape: &KernelSolidHandle,
    thickness: f64,
    offset_tolerance: f64,
    deviation_tolerance: f64,
) -> Result<Thickened, OpError> {
    if !(thickness.is_finite() && thickness > 0.0) {
        return Err(OpError::invalid(format!(
            "thickness must be positive, got {}",
            thickness
        )));
    }
    let t = thickness.abs();

    let (handle, signed_thickness) = match kb.offset_solid(shape, -t, offset_tolerance) {
        Ok(handle) => (handle, -t),
        Err(inward) if retry_outward(&inward) => {
            warn!(error = %inward, "inward offset failed, retrying outward");
            match kb.offset_solid(shape, t, offset_tolerance) {
                Ok(handle) => (handle, t),
                Err(outward) if retry_outward(&outward) => {
                    return Err(OpError::ThickeningFailed {
                        thickness: t,
                        inward: inward.to_string(),
                        outward: outward.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(e) => return Err(e.into()),
    };
    debug!(signed_thickness, result = handle.id(), "offset completed");

    let mut diagnostics = Diagnostics::default();
    let volume = kb.signed_volume(&handle)?;
    let (handle, reoriented) = if volume < 0.0 {
        warn!(volume, "thickened solid has inverted orientation, reversing");
        diagnostics.warn(format!(
            "thickened solid had negative volume ({:.3}), orientation reversed",
            volume
        ));
        (kb.reverse_orientation(&handle)?, true)
    } else {
        (handle, false)
    };

    diagnostics.extend(check_preservation(
        kb.as_query(),
        shape,
        &handle,
        deviation_tolerance,
    ));

    Ok(Thickened {
        handle,
        signed_thickness,
        reoriented,
        diagnostics,
    })
}

/// Warn when the thickened solid has moved away from the input shape.
pub fn check_preservation(
    query: &dyn KernelQuery,
    original: &KernelSolidHandle,
    thickened: &KernelSolidHandle,
    tolerance: f64,
) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();
    match query.shape_distance(original, thickened) {
        Ok(distance) if distance > tolerance => {
            warn!(distance, tolerance, "thickened solid deviates from input");
            diagnostics.warn(format!(
                "geometry deviation of {:.6} exceeds tolerance {}",
                distance, tolerance
            ));
        }
        Ok(distance) => debug!(distance, "input geometry preserved"),
        Err(e) => {
            warn!(error = %e, "could not measure geometry deviation");
            diagnostics.warn(format!("geometry deviation not measured: {}", e));
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use geom_kernel::MockKernel;

    #[test]
    fn inward_offset_used_when_it_completes() {
        let mut kernel = MockKernel::new();
        let shell = kernel.insert_box([0.0; 3], [10.0; 3]);
        let result = thicken(&mut kernel, &shell, 2.0, 1e-3, 1e-3).unwrap();
        assert_eq!(result.signed_thickness, -2.0);
        assert_eq!(kernel.offset_attempts(), &[-2.0]);
        assert!(!result.reoriented);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn zero_thickness_never_reaches_kernel() {
        let mut kernel = MockKernel::new();
        let shell = kernel.insert_box([0.0; 3], [10.0; 3]);
        let err = thicken(&mut kernel, &shell, 0.0, 1e-3, 1e-3).unwrap_err();
        assert!(matches!(err, OpError::InvalidParameters { .. }));
        assert!(kernel.offset_attempts().is_empty());
    }
}
