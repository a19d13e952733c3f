//! wf-aero: the lifting line and its circulation.
//!
//! Panels the blade-motion input into lifting-line stations, looks up
//! airfoil polars, and resolves the bound circulation either from a
//! prescribed distribution or by an iterative fixed-point solve against
//! the polar data. Also hosts the unsteady-aerodynamics boundary with its
//! per-node degrade-and-continue semantics.

pub mod circulation;
pub mod error;
pub mod geometry;
pub mod polar;
pub mod ua;

pub use circulation::CirculationSolver;
pub use error::{AeroError, AeroResult};
pub use geometry::{BladeMotion, LiftingLine};
pub use polar::{AirfoilPolar, PolarPoint, PolarSet};
pub use ua::{UaHarness, UaInputs, UnsteadyAeroModel};

/// 3D vector type shared with the wake crates.
pub type Vec3 = nalgebra::Vector3<f64>;
