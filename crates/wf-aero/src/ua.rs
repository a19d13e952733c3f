//! Unsteady-aerodynamics boundary.
//!
//! The dynamic-stall model itself is an external subsystem; the solver
//! only derives its per-node inputs, drives its state update across each
//! coupling interval, and honors its validity verdicts. A node whose
//! update fails is permanently disabled and the simulation continues with
//! that node's unsteady correction off; this is the one non-fatal error
//! class in the solver.

use tracing::warn;

use crate::error::AeroResult;

/// Per-node inputs derived from induced + structural + ambient velocity.
#[derive(Clone, Copy, Debug, Default)]
pub struct UaInputs {
    /// Angle of attack (rad)
    pub alpha: f64,
    /// Relative inflow speed (m/s)
    pub v_rel: f64,
    /// Chord Reynolds number
    pub re: f64,
}

/// External dynamic-stall state updater.
pub trait UnsteadyAeroModel: Send {
    /// Advance the internal states of one node across `[t, t + dt]`.
    /// An error marks the node invalid; it will not be called again.
    fn advance_node(
        &mut self,
        wing: usize,
        node: usize,
        inputs: &UaInputs,
        t: f64,
        dt: f64,
    ) -> AeroResult<()>;
}

/// Drives an [`UnsteadyAeroModel`] and tracks per-node disable flags.
pub struct UaHarness {
    model: Box<dyn UnsteadyAeroModel>,
    disabled: Vec<Vec<bool>>,
}

impl UaHarness {
    pub fn new(model: Box<dyn UnsteadyAeroModel>, n_wings: usize, n_nodes: usize) -> Self {
        Self {
            model,
            disabled: vec![vec![false; n_nodes]; n_wings],
        }
    }

    /// Whether a node's unsteady correction has been turned off.
    pub fn is_disabled(&self, wing: usize, node: usize) -> bool {
        self.disabled[wing][node]
    }

    /// Advance every still-enabled node across `[t, t + dt]`.
    ///
    /// `inputs[wing][node]` must cover every node of every wing. Node
    /// failures are downgraded to warnings and the node is disabled.
    pub fn advance(&mut self, inputs: &[Vec<UaInputs>], t: f64, dt: f64) {
        for (iw, wing_inputs) in inputs.iter().enumerate() {
            for (j, node_inputs) in wing_inputs.iter().enumerate() {
                if self.disabled[iw][j] {
                    continue;
                }
                if let Err(e) = self.model.advance_node(iw, j, node_inputs, t, dt) {
                    warn!(wing = iw, node = j, error = %e, "unsteady aero disabled for node");
                    self.disabled[iw][j] = true;
                }
            }
        }
    }
}
