//! wf-sim: wake integration engine and update orchestration.
//!
//! Combines the wake state machine (wf-wake), the induction kernels
//! (wf-induction), and the lifting line (wf-aero) into the per-time-step
//! update sequence, with explicit Euler and classical RK4 integrators over
//! the active wake state.

pub mod error;
pub mod integrator;
pub mod model;
pub mod sim;
pub mod snapshot;
pub mod solver;
pub mod state;
pub mod wake_model;

pub use error::{SimError, SimResult};
pub use integrator::{ForwardEuler, Integrator, Rk4, step_with};
pub use model::OdeModel;
pub use sim::{SimOptions, run_sim};
pub use snapshot::{SnapshotSchedule, WakeSink, WakeSnapshot, WingSnapshot};
pub use solver::{AeroOutput, UniformWind, WakeSolver, WindProvider};
pub use state::WakeOdeState;
pub use wake_model::WakeConvectionModel;
