//! Flattened vortex-segment buffer consumed by the induction kernels.

use crate::Vec3;
use crate::error::{InductionError, InductionResult};

/// Transient, rebuilt-every-call flat list of vortex line segments.
///
/// Capacity is sized once for the worst case (maximum wake extent, doubled
/// when a ground mirror is modeled) and never grows afterwards; only the
/// active counts change between calls. Endpoints are indices into `points`
/// so shared filament nodes are stored once.
#[derive(Clone, Debug)]
pub struct SegmentBuffer {
    /// Endpoint index pairs into `points`, active prefix is `0..n_act`
    connct: Vec<[usize; 2]>,
    /// Node coordinates, active prefix is `0..n_act_p`
    points: Vec<Vec3>,
    /// Circulation strength per segment (m^2/s)
    gamma: Vec<f64>,
    /// Core radius per segment (m)
    epsilon: Vec<f64>,
    /// Active segment count
    n_act: usize,
    /// Active point count
    n_act_p: usize,
}

impl SegmentBuffer {
    /// Allocate a buffer for at most `seg_capacity` segments over
    /// `point_capacity` points.
    pub fn with_capacity(seg_capacity: usize, point_capacity: usize) -> Self {
        Self {
            connct: vec![[0, 0]; seg_capacity],
            points: vec![Vec3::zeros(); point_capacity],
            gamma: vec![0.0; seg_capacity],
            epsilon: vec![0.0; seg_capacity],
            n_act: 0,
            n_act_p: 0,
        }
    }

    /// Reset active counts without touching capacity.
    pub fn clear(&mut self) {
        self.n_act = 0;
        self.n_act_p = 0;
    }

    pub fn seg_capacity(&self) -> usize {
        self.connct.len()
    }

    pub fn point_capacity(&self) -> usize {
        self.points.len()
    }

    pub fn n_active(&self) -> usize {
        self.n_act
    }

    pub fn n_active_points(&self) -> usize {
        self.n_act_p
    }

    pub fn is_empty(&self) -> bool {
        self.n_act == 0
    }

    /// Append a node, returning its index.
    pub fn push_point(&mut self, p: Vec3) -> InductionResult<usize> {
        if self.n_act_p >= self.points.len() {
            return Err(InductionError::CapacityExceeded {
                what: "points",
                count: self.n_act_p + 1,
                capacity: self.points.len(),
            });
        }
        self.points[self.n_act_p] = p;
        self.n_act_p += 1;
        Ok(self.n_act_p - 1)
    }

    /// Append a segment between two previously pushed points.
    pub fn push_segment(
        &mut self,
        i0: usize,
        i1: usize,
        gamma: f64,
        epsilon: f64,
    ) -> InductionResult<()> {
        if self.n_act >= self.connct.len() {
            return Err(InductionError::CapacityExceeded {
                what: "segments",
                count: self.n_act + 1,
                capacity: self.connct.len(),
            });
        }
        debug_assert!(i0 < self.n_act_p && i1 < self.n_act_p);
        self.connct[self.n_act] = [i0, i1];
        self.gamma[self.n_act] = gamma;
        self.epsilon[self.n_act] = epsilon;
        self.n_act += 1;
        Ok(())
    }

    /// Endpoint coordinates of active segment `i`.
    pub fn endpoints(&self, i: usize) -> (Vec3, Vec3) {
        let [i0, i1] = self.connct[i];
        (self.points[i0], self.points[i1])
    }

    pub fn gamma(&self, i: usize) -> f64 {
        self.gamma[i]
    }

    pub fn epsilon(&self, i: usize) -> f64 {
        self.epsilon[i]
    }

    /// Iterate over active segments as (p0, p1, gamma, epsilon).
    pub fn iter_active(&self) -> impl Iterator<Item = (Vec3, Vec3, f64, f64)> + '_ {
        (0..self.n_act).map(move |i| {
            let (p0, p1) = self.endpoints(i);
            (p0, p1, self.gamma[i], self.epsilon[i])
        })
    }
}
