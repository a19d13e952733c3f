//! wf-wake: the vortex-wake state machine.
//!
//! Owns the fixed-capacity near-wake / far-wake geometry arenas, the active
//! panel-row counters and their grow/shrink/rollback rules, the segment
//! packer feeding the induction kernels, the core-radius diffusion models,
//! and the requested-wind-point bookkeeping.

pub mod diffusion;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod lifecycle;
pub mod packer;
pub mod wind;

pub use error::{WakeError, WakeResult};
pub use geometry::{WakeDims, WakeGeometry, WingWake};
pub use grid::AgeSpanGrid;
pub use lifecycle::WakeLifecycle;
pub use packer::{pack_segments, segment_capacity};
pub use wind::WindSamples;

/// 3D vector type used for positions, wind, and induced velocity.
pub type Vec3 = nalgebra::Vector3<f64>;
