use geom_kernel::{KernelError, KernelSolidHandle};
use serde::Serialize;

/// Pipeline progress. Each non-terminal state is reached only after the
/// gate of the previous phase passed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PipelineState {
    Imported,
    Thickened,
    GeometryChecked,
    FeaturesPlaced,
    Assembled,
    Validated,
    Exported,
    Succeeded,
    Failed(String),
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Imported => "imported",
            PipelineState::Thickened => "thickened",
            PipelineState::GeometryChecked => "geometry_checked",
            PipelineState::FeaturesPlaced => "features_placed",
            PipelineState::Assembled => "assembled",
            PipelineState::Validated => "validated",
            PipelineState::Exported => "exported",
            PipelineState::Succeeded => "succeeded",
            PipelineState::Failed(_) => "failed",
        }
    }
}

/// Fatal pipeline errors. Anything here ends the run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Invalid clip parameters: {reason}")]
    InvalidFeatureParameters { reason: String },

    #[error("Input geometry corrupted: {reason}")]
    InputCorrupted { reason: String },

    #[error("Thickening failed: {reason}")]
    ThickeningFailed { reason: String },

    /// The assembled body failed validity analysis.
    #[error("Final solid is invalid: {reason}")]
    InvalidResult { reason: String },

    #[error("Export failed: {reason}")]
    ExportFailed { reason: String },

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
}

/// A target location that could not be placed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedPlacement {
    pub index: usize,
    pub anchor: [f64; 3],
    pub reason: String,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub succeeded: bool,
    pub message: String,
    /// Terminal state.
    pub state: PipelineState,
    /// Non-terminal states reached, in order.
    pub trail: Vec<PipelineState>,
    /// Present only on success.
    pub final_shape: Option<KernelSolidHandle>,
    /// Number of groove/clip pairs placed.
    pub placed: usize,
    pub skipped: Vec<SkippedPlacement>,
    pub warnings: Vec<String>,
}

impl PipelineResult {
    /// The last non-terminal state reached.
    pub fn last_phase(&self) -> Option<&PipelineState> {
        self.trail.last()
    }
}
