use serde::{Deserialize, Serialize};

use crate::shape::ShapeKind;

/// Geometry of a primary feature (groove).
///
/// `height` is the extent along the in-plane axis the profile is extruded
/// along; `depth` is how far the cavity reaches into the material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureParameters {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
    pub kind: ShapeKind,
    #[serde(default)]
    pub fillet_radius: f64,
}

impl FeatureParameters {
    pub fn new(kind: ShapeKind, width: f64, depth: f64, height: f64) -> Self {
        Self {
            width,
            depth,
            height,
            kind,
            fillet_radius: 0.0,
        }
    }

    pub fn with_fillet(mut self, radius: f64) -> Self {
        self.fillet_radius = radius;
        self
    }
}

/// Parameters of a dependent feature (clip) derived from a groove.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DependentFeatureParameters {
    pub source: FeatureParameters,
    /// Clip extent along the height axis. Independent of the groove height.
    pub height: f64,
    /// Width reduction for fit.
    pub assembly_clearance: f64,
    /// Depth reduction; also the distance the clip is set back from the open face.
    pub retention_offset: f64,
}

impl DependentFeatureParameters {
    pub fn derived_width(&self) -> f64 {
        self.source.width - self.assembly_clearance
    }

    pub fn derived_depth(&self) -> f64 {
        self.source.depth - self.retention_offset
    }

    /// Fillet radius scaled by the width ratio. Zero when the source has no fillet.
    pub fn derived_fillet(&self) -> f64 {
        if self.source.fillet_radius > 0.0 && self.source.width > 0.0 {
            self.source.fillet_radius * (self.derived_width() / self.source.width)
        } else {
            0.0
        }
    }
}
