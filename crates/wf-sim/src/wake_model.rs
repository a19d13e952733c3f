//! Derivative evaluation for the convecting wake.
//!
//! The convection velocity of every resolved filament node is ambient wind
//! plus wake self-induction (bound lifting-line segments excluded). Far
//! wake rows beyond the free region are not resolved individually; they
//! drift at the averaged velocity of the free far wake (or of the near
//! wake while the free far wake is empty). Before the configured free-wake
//! start time the induction evaluation is skipped entirely and the wake
//! convects with ambient wind alone.

use tracing::debug;
use wf_core::WakeOptions;
use wf_induction::{SegmentBuffer, induced_velocities};
use wf_wake::diffusion::core_radius_rate;
use wf_wake::packer::{GroundMirror, PackSelection, pack_segments};
use wf_wake::{Vec3, WakeGeometry, WindSamples};

use crate::error::SimResult;
use crate::model::OdeModel;
use crate::state::WakeOdeState;

/// One-step convection model over the active wake rows.
///
/// Borrows the orchestrator's scratch geometry (which carries the frozen
/// panel circulation for this step) and its preallocated segment buffer;
/// stage positions and core radii are written into the scratch before each
/// packing so all four RK4 stages see their own geometry.
pub struct WakeConvectionModel<'a> {
    pub opts: &'a WakeOptions,
    pub wind: &'a WindSamples,
    /// Active near-wake panel rows
    pub n_nw: usize,
    /// Active far-wake panel rows
    pub n_fw: usize,
    pub scratch: &'a mut WakeGeometry,
    pub seg_buf: &'a mut SegmentBuffer,
}

impl WakeConvectionModel<'_> {
    /// Far-wake node rows that are individually resolved.
    fn n_fw_resolved(&self) -> usize {
        self.n_fw.min(self.opts.n_fw_free)
    }

    /// Debug-only safety net: active nodes must never carry the allocation
    /// sentinel into a convection stage. Release builds skip this check.
    #[cfg(debug_assertions)]
    fn check_active_nodes(&self, x: &WakeOdeState) -> SimResult<()> {
        use crate::error::SimError;
        use wf_core::is_poisoned;
        for iw in 0..x.n_wings() {
            for age in 0..=self.n_nw {
                for &p in x.r_nw[iw].row(age) {
                    if is_poisoned(p.x) || is_poisoned(p.y) || is_poisoned(p.z) {
                        return Err(SimError::Invariant {
                            what: "active near-wake node carries uninitialized sentinel",
                        });
                    }
                }
            }
            if self.n_fw > 0 {
                for age in 0..=self.n_fw {
                    for &p in x.r_fw[iw].row(age) {
                        if is_poisoned(p.x) || is_poisoned(p.y) || is_poisoned(p.z) {
                            return Err(SimError::Invariant {
                                what: "active far-wake node carries uninitialized sentinel",
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl OdeModel for WakeConvectionModel<'_> {
    type State = WakeOdeState;

    fn rhs(&mut self, t: f64, x: &WakeOdeState) -> SimResult<WakeOdeState> {
        let mut dx = x.zeros_like();
        let n_wings = x.n_wings();
        let n_fw_res = self.n_fw_resolved();

        #[cfg(debug_assertions)]
        self.check_active_nodes(x)?;

        // Stage geometry for packing
        x.write_to(self.scratch);

        // Evaluation points: resolved wake nodes, near wake first. The
        // bound age-0 near-wake row never convects, so it is not evaluated.
        let mut pts: Vec<Vec3> = Vec::new();
        for iw in 0..n_wings {
            for age in 1..=self.n_nw {
                pts.extend_from_slice(self.scratch.wing(iw).r_nw.row(age));
            }
        }
        let nw_count = pts.len();
        if self.n_fw > 0 && n_fw_res > 0 {
            for iw in 0..n_wings {
                for age in 0..=n_fw_res {
                    pts.extend_from_slice(self.scratch.wing(iw).r_fw.row(age));
                }
            }
        }

        let mut vind = vec![Vec3::zeros(); pts.len()];
        let free_wake = t >= self.opts.free_wake_start_time;
        if free_wake && !pts.is_empty() {
            let sel = PackSelection {
                include_bound: false,
                n_nw: self.n_nw,
                n_fw: self.n_fw,
            };
            let mirror = self
                .opts
                .ground_effect
                .then_some(GroundMirror { z: self.opts.ground_z });
            pack_segments(self.scratch, &[], &[], sel, mirror, self.seg_buf)?;
            induced_velocities(
                self.seg_buf,
                self.opts.reg_function,
                self.opts.induction_accel,
                &pts,
                &mut vind,
            )?;
        }

        // Averaged convection velocities for the locked far wake
        let mean = |v: &[Vec3]| -> Vec3 {
            if v.is_empty() {
                Vec3::zeros()
            } else {
                v.iter().sum::<Vec3>() / v.len() as f64
            }
        };
        let avg_nw = mean(&vind[..nw_count]);
        let avg_drift = if vind.len() > nw_count {
            mean(&vind[nw_count..])
        } else {
            avg_nw
        };
        if free_wake {
            debug!(
                t,
                nodes = pts.len(),
                avg_nw = ?avg_nw,
                avg_drift = ?avg_drift,
                "wake derivative"
            );
        }

        // Near wake: rows 1..=n_nw convect with wind + own induction; the
        // bound row 0 keeps its forced-zero derivative.
        let mut k = 0;
        for iw in 0..n_wings {
            for age in 1..=self.n_nw {
                for j in 0..x.r_nw[iw].n_span() {
                    let v = self.wind.nw[iw].get(age, j) + vind[k];
                    dx.r_nw[iw].set(age, j, v);
                    k += 1;
                }
            }
        }
        // Far wake: resolved rows with own induction, locked rows with the
        // broadcast drift velocity. With no free rows at all, everything
        // drifts at the near-wake average.
        if self.n_fw > 0 {
            for iw in 0..n_wings {
                if n_fw_res > 0 {
                    for age in 0..=n_fw_res {
                        for j in 0..x.r_fw[iw].n_span() {
                            let v = self.wind.fw[iw].get(age, j) + vind[k];
                            dx.r_fw[iw].set(age, j, v);
                            k += 1;
                        }
                    }
                }
                let locked_from = if n_fw_res > 0 { n_fw_res + 1 } else { 0 };
                for age in locked_from..=self.n_fw {
                    for j in 0..x.r_fw[iw].n_span() {
                        let v = self.wind.fw[iw].get(age, j) + avg_drift;
                        dx.r_fw[iw].set(age, j, v);
                    }
                }
            }
        }
        debug_assert_eq!(k, vind.len());

        // Core-radius growth on the active panel rows
        for iw in 0..n_wings {
            for age in 0..self.n_nw {
                for j in 0..x.eps_nw[iw].n_span() {
                    let rate = core_radius_rate(self.opts, x.eps_nw[iw].get(age, j))?;
                    dx.eps_nw[iw].set(age, j, rate);
                }
            }
            for age in 0..self.n_fw {
                for j in 0..x.eps_fw[iw].n_span() {
                    let rate = core_radius_rate(self.opts, x.eps_fw[iw].get(age, j))?;
                    dx.eps_fw[iw].set(age, j, rate);
                }
            }
        }

        Ok(dx)
    }

    fn add(&self, a: &WakeOdeState, b: &WakeOdeState) -> WakeOdeState {
        a.add(b)
    }

    fn scale(&self, a: &WakeOdeState, scale: f64) -> WakeOdeState {
        a.scale(scale)
    }
}
