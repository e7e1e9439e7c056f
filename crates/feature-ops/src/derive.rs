//! Clip derivation: a clip is its groove's profile, narrowed by the
//! assembly clearance, made shallower by the retention offset and set back
//! from the open face by that same offset so its far face sits on the
//! groove floor.

use std::cell::OnceCell;

use geom_kernel::{Isometry3, KernelSolidHandle};
use groove_types::{DependentFeatureParameters, FeatureParameters, ShapeKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kernel_ext::KernelBundle;
use crate::profile::build_profile;
use crate::types::OpError;

/// Dimensions of a derived clip next to its groove, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionSummary {
    pub kind: ShapeKind,
    pub width: f64,
    pub depth: f64,
    pub height: f64,
    pub source_width: f64,
    pub source_depth: f64,
    pub assembly_clearance: f64,
    pub retention_offset: f64,
}

/// Check that a clip can be derived from its groove. Runs before any
/// geometry is built.
pub fn validate(params: &DependentFeatureParameters) -> Result<(), OpError> {
    let source = &params.source;
    for (name, value) in [
        ("width", source.width),
        ("depth", source.depth),
        ("height", source.height),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(OpError::invalid(format!(
                "Groove {} must be positive, got {}",
                name, value
            )));
        }
    }
    if !(params.height.is_finite() && params.height > 0.0) {
        return Err(OpError::invalid("Clip height must be positive"));
    }
    if !(params.assembly_clearance >= 0.0) {
        return Err(OpError::invalid(format!(
            "Assembly clearance ({}mm) must not be negative",
            params.assembly_clearance
        )));
    }
    if params.assembly_clearance >= source.width {
        return Err(OpError::invalid(format!(
            "Assembly clearance ({}mm) must be less than groove width ({}mm)",
            params.assembly_clearance, source.width
        )));
    }
    if !(params.retention_offset >= 0.0) {
        return Err(OpError::invalid(format!(
            "Retention offset ({}mm) must not be negative",
            params.retention_offset
        )));
    }
    if params.retention_offset >= source.depth {
        return Err(OpError::invalid(format!(
            "Retention offset ({}mm) must be less than groove depth ({}mm)",
            params.retention_offset, source.depth
        )));
    }

    let width = params.derived_width();
    if width <= 0.0 {
        return Err(OpError::invalid(format!(
            "Calculated clip width ({:.3}mm) must be positive",
            width
        )));
    }
    let depth = params.derived_depth();
    if depth <= 0.0 {
        return Err(OpError::invalid(format!(
            "Calculated clip depth ({:.3}mm) must be positive",
            depth
        )));
    }
    Ok(())
}

/// Derives clip geometry from groove parameters.
///
/// The derived parameters are computed once and reused for every
/// placement.
#[derive(Debug, Clone)]
pub struct DependentFeatureDeriver {
    params: DependentFeatureParameters,
    derived: OnceCell<FeatureParameters>,
}

impl DependentFeatureDeriver {
    pub fn new(params: DependentFeatureParameters) -> Self {
        Self {
            params,
            derived: OnceCell::new(),
        }
    }

    pub fn params(&self) -> &DependentFeatureParameters {
        &self.params
    }

    pub fn validate(&self) -> Result<(), OpError> {
        validate(&self.params)
    }

    /// The clip's own profile parameters. Same shape kind as the groove.
    pub fn derive(&self) -> Result<&FeatureParameters, OpError> {
        if let Some(derived) = self.derived.get() {
            return Ok(derived);
        }
        self.validate()?;
        let p = &self.params;
        let derived = FeatureParameters {
            width: p.derived_width(),
            depth: p.derived_depth(),
            height: p.height,
            kind: p.source.kind,
            fillet_radius: p.derived_fillet(),
        };
        debug!(?derived, "derived clip parameters");
        Ok(self.derived.get_or_init(|| derived))
    }

    /// Build the clip in the groove's local frame, occupying
    /// z in [-groove depth, -retention offset].
    pub fn build(&self, kb: &mut dyn KernelBundle) -> Result<KernelSolidHandle, OpError> {
        let derived = *self.derive()?;
        let profile = build_profile(kb, &derived)?;

        let offset = self.params.retention_offset;
        if offset == 0.0 {
            return Ok(profile);
        }
        let recessed = kb.transform(&profile, &Isometry3::translation(0.0, 0.0, -offset))?;
        Ok(recessed)
    }

    pub fn summary(&self) -> Result<DimensionSummary, OpError> {
        let derived = self.derive()?;
        Ok(DimensionSummary {
            kind: derived.kind,
            width: derived.width,
            depth: derived.depth,
            height: derived.height,
            source_width: self.params.source.width,
            source_depth: self.params.source.depth,
            assembly_clearance: self.params.assembly_clearance,
            retention_offset: self.params.retention_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn clip(clearance: f64, offset: f64) -> DependentFeatureParameters {
        DependentFeatureParameters {
            source: FeatureParameters::new(ShapeKind::Rectangular, 5.0, 2.5, 10.0),
            height: 20.0,
            assembly_clearance: clearance,
            retention_offset: offset,
        }
    }

    fn reason(err: OpError) -> String {
        match err {
            OpError::InvalidParameters { reason } => reason,
            other => panic!("expected invalid parameters, got {other:?}"),
        }
    }

    #[test]
    fn derive_keeps_shape_kind_and_clip_height() {
        let deriver = DependentFeatureDeriver::new(clip(0.2, 0.1));
        let derived = deriver.derive().unwrap();
        assert_eq!(derived.kind, ShapeKind::Rectangular);
        assert_relative_eq!(derived.width, 4.8, epsilon = 1e-12);
        assert_relative_eq!(derived.depth, 2.4, epsilon = 1e-12);
        assert_relative_eq!(derived.height, 20.0);
    }

    #[test]
    fn derive_is_memoized() {
        let deriver = DependentFeatureDeriver::new(clip(0.2, 0.1));
        let first: *const FeatureParameters = deriver.derive().unwrap();
        let second: *const FeatureParameters = deriver.derive().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn zero_clearances_are_accepted() {
        assert!(validate(&clip(0.0, 0.0)).is_ok());
    }

    #[test]
    fn offset_at_depth_is_rejected() {
        let msg = reason(validate(&clip(0.2, 2.5)).unwrap_err());
        assert!(msg.contains("Retention offset"), "{msg}");
        assert!(msg.contains("groove depth"), "{msg}");
    }

    #[test]
    fn negative_clearance_is_rejected() {
        let msg = reason(validate(&clip(-0.1, 0.1)).unwrap_err());
        assert!(msg.contains("must not be negative"), "{msg}");
    }

    #[test]
    fn zero_clip_height_is_rejected() {
        let mut params = clip(0.2, 0.1);
        params.height = 0.0;
        assert_eq!(reason(validate(&params).unwrap_err()), "Clip height must be positive");
    }

    #[test]
    fn summary_reports_both_sides() {
        let summary = DependentFeatureDeriver::new(clip(0.2, 0.1)).summary().unwrap();
        assert_relative_eq!(summary.source_width, 5.0);
        assert_relative_eq!(summary.width, 4.8, epsilon = 1e-12);
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["kind"], "rectangular");
    }
}
