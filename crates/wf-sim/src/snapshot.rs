//! Visualization / diagnostics snapshots.
//!
//! Sinks receive the wake geometry by value on their own output schedule,
//! decoupled from the wake time step. A failing sink is a diagnostics
//! problem, not a physics problem: the error is logged and the solver
//! carries on.

use wf_core::Real;
use wf_wake::{Vec3, WakeGeometry};

use crate::error::SimResult;

/// Wake geometry and circulation of one wing at one instant.
#[derive(Clone, Debug)]
pub struct WingSnapshot {
    /// Active near-wake node rows (row 0 is the lifting line)
    pub r_nw: Vec<Vec<Vec3>>,
    /// Active near-wake panel circulation rows
    pub gamma_nw: Vec<Vec<Real>>,
    /// Active far-wake node rows
    pub r_fw: Vec<Vec<Vec3>>,
    /// Active far-wake panel circulation rows
    pub gamma_fw: Vec<Vec<Real>>,
}

/// Solver state snapshot handed to sinks.
#[derive(Clone, Debug)]
pub struct WakeSnapshot {
    pub t: Real,
    pub n_nw: usize,
    pub n_fw: usize,
    pub wings: Vec<WingSnapshot>,
}

impl WakeSnapshot {
    pub fn capture(t: Real, geom: &WakeGeometry, n_nw: usize, n_fw: usize) -> Self {
        let wings = geom
            .wings()
            .iter()
            .map(|w| WingSnapshot {
                r_nw: (0..=n_nw).map(|age| w.r_nw.row(age).to_vec()).collect(),
                gamma_nw: (0..n_nw).map(|age| w.gamma_nw.row(age).to_vec()).collect(),
                r_fw: if n_fw > 0 {
                    (0..=n_fw).map(|age| w.r_fw.row(age).to_vec()).collect()
                } else {
                    Vec::new()
                },
                gamma_fw: (0..n_fw).map(|age| w.gamma_fw.row(age).to_vec()).collect(),
            })
            .collect();
        Self {
            t,
            n_nw,
            n_fw,
            wings,
        }
    }
}

/// Receives snapshots (VTK writer, plotting pipe, test probe, ...).
pub trait WakeSink {
    fn emit(&mut self, snapshot: &WakeSnapshot) -> SimResult<()>;
}

/// Rate limiter for snapshot emission, independent of the wake step.
#[derive(Clone, Debug)]
pub struct SnapshotSchedule {
    dt_out: Real,
    t_last: Real,
}

impl SnapshotSchedule {
    pub fn new(dt_out: Real) -> Self {
        Self {
            dt_out,
            t_last: Real::NEG_INFINITY,
        }
    }

    pub fn due(&self, t: Real) -> bool {
        (t - self.t_last) >= self.dt_out * (1.0 - 1e4 * f64::EPSILON)
    }

    pub fn mark(&mut self, t: Real) {
        self.t_last = t;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_rate_limits() {
        let mut s = SnapshotSchedule::new(0.1);
        assert!(s.due(0.0));
        s.mark(0.0);
        assert!(!s.due(0.05));
        assert!(s.due(0.1));
        s.mark(0.1);
        assert!(!s.due(0.15));
    }
}
