//! Error types for lifting-line operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AeroError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Mismatched lengths: {what} (expected {expected}, got {got})")]
    MismatchedLengths {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    #[error("Unsteady-aero state invalid: {what}")]
    UaInvalid { what: &'static str },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type AeroResult<T> = Result<T, AeroError>;

impl From<wf_induction::InductionError> for AeroError {
    fn from(e: wf_induction::InductionError) -> Self {
        AeroError::Backend {
            message: e.to_string(),
        }
    }
}
