use geom_kernel::KernelError;

/// Non-fatal diagnostics collected while an operation runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub warnings: Vec<String>,
}

impl Diagnostics {
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }
}

/// Errors from feature operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OpError {
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    /// Feature parameters violate a constraint. `reason` names it.
    #[error("{reason}")]
    InvalidParameters { reason: String },

    /// Offsetting failed in both directions.
    #[error("thickening by {thickness} failed in both directions (inward: {inward}; outward: {outward})")]
    ThickeningFailed {
        thickness: f64,
        inward: String,
        outward: String,
    },
}

impl OpError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        OpError::InvalidParameters {
            reason: reason.into(),
        }
    }
}
