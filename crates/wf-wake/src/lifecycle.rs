//! Active panel-row counters and shed scheduling.
//!
//! The wake gains one near-wake panel row per accepted shed step until the
//! near wake saturates at `n_nw_max`; only then does the far wake start
//! growing, up to `n_fw_max`. A predictor-corrector driver may call the
//! solver twice for the same target time; the second call must roll back
//! exactly one speculative growth, so `grow` snapshots the counters (and
//! the shed clock) and `shrink` restores that snapshot. One level of
//! rollback is supported.

use tracing::{debug, info};
use wf_core::{Real, WakeOptions};

/// Shed-schedule slack: absorbs floating round-off when the elapsed time
/// lands a few ulps short of the wake step.
const SHED_TOL: Real = 1.0 - 10_000.0 * f64::EPSILON;

#[derive(Clone, Copy, Debug)]
struct Snapshot {
    n_nw: usize,
    n_fw: usize,
    t_last_shed: Real,
}

/// Wake growth/rollback state machine.
#[derive(Clone, Debug)]
pub struct WakeLifecycle {
    n_nw: usize,
    n_fw: usize,
    n_nw_max: usize,
    n_fw_max: usize,
    dt_aero: Real,
    dt_wake: Real,
    t_last_shed: Real,
    t_last_update: Real,
    prev: Option<Snapshot>,
}

impl WakeLifecycle {
    pub fn new(opts: &WakeOptions) -> Self {
        Self {
            n_nw: 0,
            n_fw: 0,
            n_nw_max: opts.n_nw_max,
            n_fw_max: opts.n_fw_max,
            dt_aero: opts.dt_aero,
            dt_wake: opts.dt_wake(),
            // One full wake step in the past, so the first update sheds
            t_last_shed: -opts.dt_wake(),
            t_last_update: Real::NEG_INFINITY,
            prev: None,
        }
    }

    /// Active near-wake panel rows.
    pub fn n_nw(&self) -> usize {
        self.n_nw
    }

    /// Active far-wake panel rows.
    pub fn n_fw(&self) -> usize {
        self.n_fw
    }

    pub fn n_nw_max(&self) -> usize {
        self.n_nw_max
    }

    pub fn n_fw_max(&self) -> usize {
        self.n_fw_max
    }

    /// Near wake has reached capacity.
    pub fn nw_saturated(&self) -> bool {
        self.n_nw == self.n_nw_max
    }

    /// True when enough time has elapsed since the last shed for a new wake
    /// row this step (inclusive comparison, with round-off slack).
    pub fn should_shed(&self, t: Real) -> bool {
        (t - self.t_last_shed) >= self.dt_wake * SHED_TOL
    }

    /// True when `t` is a repeat of the previously recorded update time
    /// (corrector re-entry), within a quarter aerodynamic step.
    pub fn is_reevaluation(&self, t: Real) -> bool {
        (t - self.t_last_update).abs() < 0.25 * self.dt_aero
    }

    /// Extend the wake by one panel row. The far wake only grows on steps
    /// where the near wake was already saturated, i.e. when a near-wake
    /// row actually graduates past the trailing edge. Records the prior
    /// state for a single `shrink`.
    pub fn grow(&mut self) {
        self.prev = Some(Snapshot {
            n_nw: self.n_nw,
            n_fw: self.n_fw,
            t_last_shed: self.t_last_shed,
        });
        let was_saturated = self.n_nw == self.n_nw_max;
        self.n_nw = (self.n_nw + 1).min(self.n_nw_max);
        if was_saturated {
            let n_fw = (self.n_fw + 1).min(self.n_fw_max);
            if n_fw == 1 && self.n_fw == 0 {
                info!("far wake starts growing");
            }
            self.n_fw = n_fw;
        }
        debug!(n_nw = self.n_nw, n_fw = self.n_fw, "wake grown");
    }

    /// Undo the most recent `grow`. Only one level of rollback is kept, so
    /// a second `shrink` without an intervening `grow` is a no-op; in
    /// particular shrinking an empty wake stays empty.
    pub fn shrink(&mut self) {
        if let Some(prev) = self.prev.take() {
            self.n_nw = prev.n_nw;
            self.n_fw = prev.n_fw;
            self.t_last_shed = prev.t_last_shed;
            debug!(n_nw = self.n_nw, n_fw = self.n_fw, "wake rolled back");
        } else {
            debug!("shrink without recorded growth ignored");
        }
    }

    /// Record that a shed was committed at `t` (advances the shed clock).
    pub fn mark_shed(&mut self, t: Real) {
        self.t_last_shed = t;
    }

    /// Accept the previous speculative step: its growth can no longer be
    /// rolled back. Called at the start of every non-reevaluation update.
    pub fn commit(&mut self) {
        self.prev = None;
    }

    /// Most recent shed time (drives the partial shed-scale weighting).
    pub fn t_last_shed(&self) -> Real {
        self.t_last_shed
    }

    /// Record the wake-update time used for reevaluation detection.
    pub fn record_update(&mut self, t: Real) {
        self.t_last_update = t;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lifecycle(n_nw_max: usize, n_fw_max: usize) -> WakeLifecycle {
        WakeLifecycle::new(&WakeOptions {
            n_nw_max,
            n_fw_max,
            n_fw_free: n_fw_max,
            ..Default::default()
        })
    }

    #[test]
    fn near_wake_fills_before_far_wake() {
        let mut lc = lifecycle(3, 2);
        lc.grow();
        lc.grow();
        assert_eq!((lc.n_nw(), lc.n_fw()), (2, 0));
        lc.grow();
        // Saturation step: the far wake has nothing to inherit yet
        assert_eq!((lc.n_nw(), lc.n_fw()), (3, 0));
        lc.grow();
        assert_eq!((lc.n_nw(), lc.n_fw()), (3, 1));
        lc.grow();
        assert_eq!((lc.n_nw(), lc.n_fw()), (3, 2));
        lc.grow();
        assert_eq!((lc.n_nw(), lc.n_fw()), (3, 2));
    }

    #[test]
    fn grow_then_shrink_restores_counters() {
        let mut lc = lifecycle(2, 3);
        for _ in 0..7 {
            let before = (lc.n_nw(), lc.n_fw());
            lc.grow();
            lc.shrink();
            assert_eq!((lc.n_nw(), lc.n_fw()), before);
            lc.grow();
        }
    }

    #[test]
    fn shrink_is_a_noop_at_empty() {
        let mut lc = lifecycle(4, 4);
        lc.shrink();
        assert_eq!((lc.n_nw(), lc.n_fw()), (0, 0));
        lc.shrink();
        assert_eq!((lc.n_nw(), lc.n_fw()), (0, 0));
    }

    #[test]
    fn first_update_sheds_immediately() {
        let lc = lifecycle(4, 4);
        assert!(lc.should_shed(0.0));
    }

    #[test]
    fn shed_schedule_is_inclusive_with_slack() {
        let mut lc = lifecycle(4, 4);
        let dt_wake = lc.dt_wake;
        lc.mark_shed(0.0);
        assert!(lc.should_shed(dt_wake));
        // A few ulps short still counts
        assert!(lc.should_shed(dt_wake * (1.0 - 1e-13)));
        assert!(!lc.should_shed(0.5 * dt_wake));
        lc.mark_shed(dt_wake);
        assert!(!lc.should_shed(dt_wake * 1.5));
        assert!(lc.should_shed(2.0 * dt_wake));
    }

    #[test]
    fn reevaluation_detects_repeated_time() {
        let mut lc = lifecycle(4, 4);
        assert!(!lc.is_reevaluation(0.0));
        lc.record_update(1.0);
        assert!(lc.is_reevaluation(1.0));
        assert!(lc.is_reevaluation(1.0 + 0.2 * lc.dt_aero));
        assert!(!lc.is_reevaluation(1.0 + lc.dt_aero));
    }

    #[test]
    fn shed_clock_rolls_back_with_shrink() {
        let mut lc = lifecycle(4, 4);
        let t = lc.dt_wake;
        assert!(lc.should_shed(t));
        lc.grow();
        lc.mark_shed(t);
        assert!(!lc.should_shed(t));
        lc.shrink();
        assert!(lc.should_shed(t));
    }

    proptest! {
        #[test]
        fn counters_stay_in_bounds(ops in proptest::collection::vec(any::<bool>(), 0..200)) {
            let mut lc = lifecycle(5, 7);
            for grow in ops {
                if grow {
                    lc.grow();
                } else {
                    lc.shrink();
                }
                prop_assert!(lc.n_nw() <= 5);
                prop_assert!(lc.n_fw() <= 7);
                // Far wake is only ever populated while the near wake is full
                if lc.n_fw() > 0 {
                    prop_assert_eq!(lc.n_nw(), 5);
                }
            }
        }
    }
}
