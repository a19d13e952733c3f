//! OdeModel trait for pluggable dynamic systems.

use crate::error::SimResult;

/// Trait for systems advanced by the explicit integrators.
///
/// An OdeModel must implement:
/// - State type (Clone, for stage snapshots)
/// - RHS (right-hand side) computation: x_dot = f(t, x)
/// - Scalar field arithmetic for integration: add states, scale by scalar
pub trait OdeModel {
    /// State type (must be Clone).
    type State: Clone;

    /// Compute state derivative dxdt = f(t, x).
    ///
    /// Note: takes &mut self so models can reuse internal scratch buffers
    /// (segment buffers, evaluation-point lists) across stages.
    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// Add two states element-wise: result = a + b.
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// Scale a state by a scalar: result = scale * a.
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;
}
