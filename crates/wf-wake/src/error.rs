//! Error types for wake state operations.

use thiserror::Error;

/// Errors encountered while mutating or packing the wake state.
#[derive(Error, Debug)]
pub enum WakeError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invariant violated: {what}")]
    Invariant { what: &'static str },

    #[error("Unsupported model: {what}")]
    Unsupported { what: &'static str },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type WakeResult<T> = Result<T, WakeError>;

impl From<wf_induction::InductionError> for WakeError {
    fn from(e: wf_induction::InductionError) -> Self {
        WakeError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<wf_core::CoreError> for WakeError {
    fn from(e: wf_core::CoreError) -> Self {
        WakeError::Backend {
            message: e.to_string(),
        }
    }
}
