//! Error types for induction evaluation.

use thiserror::Error;

/// Errors from segment packing and induction evaluation.
///
/// Capacity overruns are internal-consistency failures: buffer capacities
/// are fixed upper bounds established at initialization, so exceeding one
/// means the caller's bookkeeping is wrong, not that more memory is needed.
#[derive(Error, Debug)]
pub enum InductionError {
    #[error("Segment buffer capacity exceeded for {what} ({count} > {capacity})")]
    CapacityExceeded {
        what: &'static str,
        count: usize,
        capacity: usize,
    },

    #[error("Mismatched lengths: {what} (expected {expected}, got {got})")]
    MismatchedLengths {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub type InductionResult<T> = Result<T, InductionError>;
