//! Run parameters, loaded from JSON.
//!
//! Every field has a default, so a file only needs to name what it
//! overrides.

use std::path::Path;

use groove_types::{DependentFeatureParameters, FeatureParameters, ShapeKind};
use serde::{Deserialize, Deserializer, Serialize};

use crate::anchors::REFERENCE_ANCHORS;

/// Errors from loading or checking parameters.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed parameters: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Numerical tolerances handed to the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Fuzzy value for every boolean.
    pub fuzzy: f64,
    /// Offset tolerance for thickening.
    pub offset: f64,
    /// Input-to-result distance above which a deviation warning is raised.
    pub deviation: f64,
    /// Chordal tolerance of the preview mesh.
    pub mesh: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            fuzzy: 0.1,
            offset: 1e-3,
            deviation: 1e-3,
            mesh: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParameters {
    /// Wall thickness of the thickened body.
    pub thickness: f64,
    /// Number of groove/clip pairs, taken from the front of the anchor list.
    pub groove_count: usize,
    #[serde(deserialize_with = "shape_by_name_or_number")]
    pub groove_shape: ShapeKind,
    pub groove_height: f64,
    pub groove_width: f64,
    pub groove_depth: f64,
    pub clip_height: f64,
    pub assembly_clearance: f64,
    pub retention_offset: f64,
    pub fillet_radius: f64,
    pub tolerances: Tolerances,
    /// Replaces the reference anchors when present.
    pub anchors: Option<Vec<[f64; 3]>>,
}

impl Default for PipelineParameters {
    fn default() -> Self {
        Self {
            thickness: 2.65,
            groove_count: 10,
            groove_shape: ShapeKind::Rectangular,
            groove_height: 10.0,
            groove_width: 5.0,
            groove_depth: 2.5,
            clip_height: 20.0,
            assembly_clearance: 0.2,
            retention_offset: 0.1,
            fillet_radius: 0.0,
            tolerances: Tolerances::default(),
            anchors: None,
        }
    }
}

/// Accept `"square"` as well as `3`.
fn shape_by_name_or_number<'de, D>(deserializer: D) -> Result<ShapeKind, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Name(String),
    }

    let text = match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Name(name) => name,
    };
    text.parse().map_err(serde::de::Error::custom)
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be positive, got {}", value),
        })
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must not be negative, got {}", value),
        })
    }
}

impl PipelineParameters {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Report the first field outside its accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("thickness", self.thickness, 0.1, 20.0)?;
        check_range("groove_count", self.groove_count as f64, 1.0, 100.0)?;
        check_range("groove_height", self.groove_height, 1.0, 50.0)?;
        check_range("groove_width", self.groove_width, 0.5, 20.0)?;
        check_range("groove_depth", self.groove_depth, 0.5, 10.0)?;
        check_range("clip_height", self.clip_height, 0.5, 200.0)?;
        // Clearance and offset are bounded by the groove, not by a fixed range.
        check_non_negative("assembly_clearance", self.assembly_clearance)?;
        check_non_negative("retention_offset", self.retention_offset)?;
        check_non_negative("fillet_radius", self.fillet_radius)?;

        check_positive("tolerances.fuzzy", self.tolerances.fuzzy)?;
        check_positive("tolerances.offset", self.tolerances.offset)?;
        check_positive("tolerances.deviation", self.tolerances.deviation)?;
        check_positive("tolerances.mesh", self.tolerances.mesh)?;

        if let Some(anchors) = &self.anchors {
            if anchors.is_empty() {
                return Err(ConfigError::Invalid {
                    field: "anchors",
                    reason: "list is empty".to_string(),
                });
            }
            if let Some(bad) = anchors.iter().find(|a| a.iter().any(|c| !c.is_finite())) {
                return Err(ConfigError::Invalid {
                    field: "anchors",
                    reason: format!("non-finite coordinate in {:?}", bad),
                });
            }
        }
        Ok(())
    }

    pub fn groove(&self) -> FeatureParameters {
        FeatureParameters::new(
            self.groove_shape,
            self.groove_width,
            self.groove_depth,
            self.groove_height,
        )
        .with_fillet(self.fillet_radius)
    }

    pub fn clip(&self) -> DependentFeatureParameters {
        DependentFeatureParameters {
            source: self.groove(),
            height: self.clip_height,
            assembly_clearance: self.assembly_clearance,
            retention_offset: self.retention_offset,
        }
    }

    /// Configured anchors, or the reference anchors.
    pub fn anchor_list(&self) -> &[[f64; 3]] {
        self.anchors.as_deref().unwrap_or(&REFERENCE_ANCHORS)
    }
}
