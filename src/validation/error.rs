use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for solver, extractor and inverter operations
pub type CalibrationResult<T> = Result<T, CalibrationError>;

/// Recoverable failures of a calibration attempt
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum CalibrationError {
    #[error("insufficient correspondences: {provided} provided, {required} required")]
    InsufficientPoints { required: usize, provided: usize },

    #[error("singular matrix: {context}")]
    SingularMatrix { context: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("calculation failed: {reason}")]
    CalculationFailed { reason: String },
}

impl CalibrationError {
    pub fn singular(context: impl Into<String>) -> Self {
        CalibrationError::SingularMatrix { context: context.into() }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        CalibrationError::InvalidInput { reason: reason.into() }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        CalibrationError::CalculationFailed { reason: reason.into() }
    }

    /// Stable variant name for UI routing
    pub fn kind(&self) -> &'static str {
        match self {
            CalibrationError::InsufficientPoints { .. } => "InsufficientPoints",
            CalibrationError::SingularMatrix { .. } => "SingularMatrix",
            CalibrationError::InvalidInput { .. } => "InvalidInput",
            CalibrationError::CalculationFailed { .. } => "CalculationFailed",
        }
    }
}
