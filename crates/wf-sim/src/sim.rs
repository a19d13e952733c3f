//! Fixed-step simulation driver.

use wf_aero::BladeMotion;
use wf_core::Real;

use crate::error::{SimError, SimResult};
use crate::solver::{WakeSolver, WindProvider};

/// Options for a driven run.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Final simulation time (s); the step size is the solver's `dt_aero`
    pub t_end: Real,
    /// Maximum number of steps (safety limit)
    pub max_steps: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            t_end: 1.0,
            max_steps: 100_000,
        }
    }
}

/// Drive the solver from t = 0 to `t_end`, querying `motion_fn` for the
/// blade motion at each interval end. Returns the number of steps taken.
pub fn run_sim<F>(
    solver: &mut WakeSolver,
    mut motion_fn: F,
    wind: &mut dyn WindProvider,
    opts: &SimOptions,
) -> SimResult<usize>
where
    F: FnMut(Real) -> Vec<BladeMotion>,
{
    if opts.t_end < 0.0 {
        return Err(SimError::InvalidArg {
            what: "t_end must be non-negative",
        });
    }
    if opts.max_steps == 0 {
        return Err(SimError::InvalidArg {
            what: "max_steps must be positive",
        });
    }

    let dt = solver.options().dt_aero;
    let mut t = 0.0;
    let mut step = 0;
    while t < opts.t_end && step < opts.max_steps {
        let motions_t = motion_fn(t);
        let motions_next = motion_fn(t + dt);
        solver.update_states(t, &motions_t, &motions_next, wind)?;
        t += dt;
        step += 1;
    }
    Ok(step)
}
