use serde::{Deserialize, Serialize};

/// Where and how a canonical profile is oriented onto a body surface.
///
/// `normal` is the outward unit normal at `anchor`. The profile's depth axis
/// (local -Z) is mapped onto `-normal`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementFrame {
    pub anchor: [f64; 3],
    pub normal: [f64; 3],
    pub tangent: Option<[f64; 3]>,
}

impl PlacementFrame {
    pub fn new(anchor: [f64; 3], normal: [f64; 3]) -> Self {
        Self {
            anchor,
            normal,
            tangent: None,
        }
    }

    pub fn with_tangent(mut self, tangent: [f64; 3]) -> Self {
        self.tangent = Some(tangent);
        self
    }
}
