//! Error types for the integration engine and orchestrator.

use thiserror::Error;

/// Errors encountered while advancing the wake solver.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invariant violated: {what}")]
    Invariant { what: &'static str },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<wf_wake::WakeError> for SimError {
    fn from(e: wf_wake::WakeError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<wf_aero::AeroError> for SimError {
    fn from(e: wf_aero::AeroError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<wf_induction::InductionError> for SimError {
    fn from(e: wf_induction::InductionError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<wf_core::CoreError> for SimError {
    fn from(e: wf_core::CoreError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}
