//! wf-induction: regularized Biot-Savart induction over vortex line segments.
//!
//! The rest of the solver talks to this crate through two things: the
//! [`SegmentBuffer`] it fills with packed vortex segments, and
//! [`induced_velocities`] which evaluates the induction of every active
//! segment at a set of points, either by direct summation or through a
//! Barnes-Hut style octree.

pub mod error;
pub mod evaluator;
pub mod kernel;
pub mod segments;
pub mod tree;

pub use error::{InductionError, InductionResult};
pub use evaluator::{induced_velocities, induced_velocities_dense};
pub use kernel::segment_velocity;
pub use segments::SegmentBuffer;
pub use tree::SegmentTree;

/// 3D vector type used for points and velocities.
pub type Vec3 = nalgebra::Vector3<f64>;
