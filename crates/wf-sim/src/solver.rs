//! Top-level wake solver: state update orchestration and output calculation.
//!
//! `update_states` advances the coupled wake/circulation state across one
//! aerodynamic time step, in a strict sequence: shed/reevaluation decision,
//! input distribution, circulation solve at `t`, unsteady-aero update,
//! position integration, wake growth, input/circulation refresh at
//! `t + dt`, ground clamp, and wind-request publication. `calc_output`
//! recomputes circulation and reported induced velocity without touching
//! the integrated state.

use tracing::{debug, warn};
use wf_aero::{BladeMotion, CirculationSolver, LiftingLine, PolarSet, UaHarness, UaInputs};
use wf_core::{Real, WakeOptions};
use wf_induction::{SegmentBuffer, induced_velocities};
use wf_wake::packer::{GroundMirror, PackSelection, pack_segments, segment_capacity};
use wf_wake::{Vec3, WakeGeometry, WakeLifecycle, WindSamples};

use crate::error::{SimError, SimResult};
use crate::integrator::step_with;
use crate::snapshot::{SnapshotSchedule, WakeSink, WakeSnapshot};
use crate::state::WakeOdeState;
use crate::wake_model::WakeConvectionModel;

/// External ambient-wind field.
pub trait WindProvider {
    /// One velocity per query point, matching order exactly.
    fn sample(&mut self, points: &[Vec3]) -> SimResult<Vec<Vec3>>;
}

/// Spatially uniform, steady inflow.
pub struct UniformWind(pub Vec3);

impl WindProvider for UniformWind {
    fn sample(&mut self, points: &[Vec3]) -> SimResult<Vec<Vec3>> {
        Ok(vec![self.0; points.len()])
    }
}

/// Reported aerodynamic output of `calc_output`.
#[derive(Clone, Debug)]
pub struct AeroOutput {
    /// Lifting-line circulation per wing per span panel
    pub gamma_ll: Vec<Vec<Real>>,
    /// Induced velocity at the control points, lifting line included
    pub v_ind_cp: Vec<Vec<Vec3>>,
    /// Induced velocity at the configured output grid points
    pub v_ind_grid: Vec<Vec3>,
}

/// One free-vortex-wake solver instance. Owns all of its state; concurrent
/// instances share nothing.
pub struct WakeSolver {
    opts: WakeOptions,
    geometry: WakeGeometry,
    scratch_geom: WakeGeometry,
    lifecycle: WakeLifecycle,
    lines: Vec<LiftingLine>,
    polars: PolarSet,
    circulation: CirculationSolver,
    gamma_ll: Vec<Vec<Real>>,
    eps_ll: Vec<Vec<Real>>,
    wind: WindSamples,
    seg_buf: SegmentBuffer,
    ua: Option<UaHarness>,
    sinks: Vec<Box<dyn WakeSink>>,
    snapshot_schedule: Option<SnapshotSchedule>,
}

impl WakeSolver {
    /// Build a solver. Configuration is validated before any state is
    /// allocated; an invalid selection aborts here.
    pub fn new(
        opts: WakeOptions,
        polars: PolarSet,
        polar_index: Vec<usize>,
        grid_points: Vec<Vec3>,
    ) -> SimResult<Self> {
        opts.validate()?;

        let lines = (0..opts.n_wings)
            .map(|_| LiftingLine::new(opts.n_span, polar_index.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let (seg_cap, pt_cap) = segment_capacity(&opts);

        let geometry = WakeGeometry::new(&opts);
        Ok(Self {
            scratch_geom: geometry.clone(),
            geometry,
            lifecycle: WakeLifecycle::new(&opts),
            lines,
            polars,
            circulation: CirculationSolver::new(&opts),
            gamma_ll: vec![vec![0.0; opts.n_span]; opts.n_wings],
            eps_ll: vec![vec![opts.wake_reg_param; opts.n_span]; opts.n_wings],
            wind: WindSamples::new(&opts, grid_points),
            seg_buf: SegmentBuffer::with_capacity(seg_cap, pt_cap),
            ua: None,
            sinks: Vec::new(),
            snapshot_schedule: None,
            opts,
        })
    }

    /// Attach an unsteady-aerodynamics harness.
    pub fn set_ua(&mut self, ua: UaHarness) {
        self.ua = Some(ua);
    }

    /// Impose a prescribed circulation distribution (used with
    /// `CirculationMethod::Prescribed`).
    pub fn set_prescribed_circulation(&mut self, gamma: Vec<Vec<Real>>) {
        self.circulation.set_prescribed(gamma);
    }

    /// Attach a snapshot sink, rate-limited by `dt_out`.
    pub fn add_sink(&mut self, sink: Box<dyn WakeSink>, dt_out: Real) {
        self.sinks.push(sink);
        if self.snapshot_schedule.is_none() {
            self.snapshot_schedule = Some(SnapshotSchedule::new(dt_out));
        }
    }

    pub fn options(&self) -> &WakeOptions {
        &self.opts
    }

    pub fn lifecycle(&self) -> &WakeLifecycle {
        &self.lifecycle
    }

    pub fn geometry(&self) -> &WakeGeometry {
        &self.geometry
    }

    pub fn gamma_ll(&self) -> &[Vec<Real>] {
        &self.gamma_ll
    }

    pub fn ua(&self) -> Option<&UaHarness> {
        self.ua.as_ref()
    }

    /// Wind query points the provider must answer before the next update
    /// (all control points and active wake nodes, plus grid points).
    pub fn requested_wind_points(&self) -> Vec<Vec3> {
        let cps: Vec<Vec<Vec3>> = self.lines.iter().map(|l| l.cp.clone()).collect();
        self.wind.request_points(
            &self.geometry,
            &cps,
            self.lifecycle.n_nw(),
            self.lifecycle.n_fw(),
        )
    }

    /// Advance the wake and circulation state from `t` to `t + dt_aero`.
    ///
    /// `motions_t` / `motions_next` are the blade-motion inputs at the two
    /// interval ends, one per wing. On error nothing is committed: the
    /// previously valid state stays externally visible.
    pub fn update_states(
        &mut self,
        t: Real,
        motions_t: &[BladeMotion],
        motions_next: &[BladeMotion],
        wind_provider: &mut dyn WindProvider,
    ) -> SimResult<()> {
        let dt = self.opts.dt_aero;
        self.check_motion_count(motions_t)?;
        self.check_motion_count(motions_next)?;

        // 1. Shed / reevaluation decision. A repeated call for the same
        //    target time rolls back the previous speculative growth; a
        //    regular call makes it permanent.
        if self.lifecycle.is_reevaluation(t) {
            debug!(t, "reevaluation: rolling back previous wake growth");
            self.lifecycle.shrink();
        } else {
            self.lifecycle.commit();
        }
        let shed = self.lifecycle.should_shed(t);
        self.lifecycle.record_update(t);

        // 2. Inputs at t: repanel the wings, bind the age-0 row, distribute
        //    ambient wind onto all current evaluation points.
        self.repanel(motions_t)?;
        self.sample_wind(wind_provider)?;

        // 3. Circulation at t (warm start), remap at full shed scale.
        self.solve_circulation(t)?;
        self.remap(1.0);

        // 4. Unsteady aero across [t, t+dt] (per-node failures degrade).
        if self.ua.is_some() {
            self.advance_ua(t, dt)?;
        }

        // 5. Integrate wake positions and core radii across [t, t+dt].
        self.integrate(t, dt)?;
        self.remap(1.0);

        // 6. Shed step: grow by one ring and age the wake downstream.
        if shed {
            self.lifecycle.grow();
            self.age_wake();
            self.lifecycle.mark_shed(t);
        }

        // 7. Inputs at t+dt, remap with the partial shed weighting.
        self.repanel(motions_next)?;
        let scale = self.shed_scale(t + dt);
        self.remap(scale);

        // 8. Circulation at t+dt, remap a third time.
        self.sample_wind(wind_provider)?;
        self.solve_circulation(t + dt)?;
        self.remap(scale);

        // 9. Ground clamp, only when the ground model is on.
        if self.opts.ground_effect {
            self.clamp_to_ground();
        }

        // 10. Snapshots for the diagnostics sinks (their own schedule).
        self.emit_snapshots(t + dt);

        Ok(())
    }

    /// Recompute circulation and reported induced velocity at `t` without
    /// mutating the integrated wake state or the warm-start circulation.
    pub fn calc_output(
        &mut self,
        t: Real,
        motions: &[BladeMotion],
        wind_provider: &mut dyn WindProvider,
    ) -> SimResult<AeroOutput> {
        self.check_motion_count(motions)?;
        for (line, motion) in self.lines.iter_mut().zip(motions) {
            line.repanel(motion)?;
        }
        self.sample_wind(wind_provider)?;

        // Circulation against the frozen wake, not stored back
        self.pack_wake(false)?;
        let gamma = self.circulation.solve(
            t,
            &self.lines,
            &self.polars,
            &self.seg_buf,
            &self.wind.ll,
            &self.gamma_ll,
        )?;

        // Reported induced velocity includes the lifting line itself
        let sel = PackSelection {
            include_bound: true,
            n_nw: self.lifecycle.n_nw(),
            n_fw: self.lifecycle.n_fw(),
        };
        pack_segments(
            &self.geometry,
            &gamma,
            &self.eps_ll,
            sel,
            self.mirror(),
            &mut self.seg_buf,
        )?;

        let cps: Vec<Vec3> = self.lines.iter().flat_map(|l| l.cp.iter().copied()).collect();
        let mut v_flat = vec![Vec3::zeros(); cps.len()];
        induced_velocities(
            &self.seg_buf,
            self.opts.reg_function,
            self.opts.induction_accel,
            &cps,
            &mut v_flat,
        )?;
        let mut v_ind_cp = Vec::with_capacity(self.lines.len());
        let mut k = 0;
        for line in &self.lines {
            v_ind_cp.push(v_flat[k..k + line.n_span()].to_vec());
            k += line.n_span();
        }

        let grid_points = self.wind.grid_points().to_vec();
        let mut v_ind_grid = vec![Vec3::zeros(); grid_points.len()];
        if !grid_points.is_empty() {
            induced_velocities(
                &self.seg_buf,
                self.opts.reg_function,
                self.opts.induction_accel,
                &grid_points,
                &mut v_ind_grid,
            )?;
        }

        Ok(AeroOutput {
            gamma_ll: gamma,
            v_ind_cp,
            v_ind_grid,
        })
    }

    // ---- internals -----------------------------------------------------

    fn check_motion_count(&self, motions: &[BladeMotion]) -> SimResult<()> {
        if motions.len() != self.lines.len() {
            return Err(SimError::InvalidArg {
                what: "one blade motion per wing required",
            });
        }
        Ok(())
    }

    fn mirror(&self) -> Option<GroundMirror> {
        self.opts
            .ground_effect
            .then_some(GroundMirror { z: self.opts.ground_z })
    }

    /// Repanel all wings and bind the age-0 near-wake row to the new
    /// lifting-line nodes.
    fn repanel(&mut self, motions: &[BladeMotion]) -> SimResult<()> {
        for (iw, (line, motion)) in self.lines.iter_mut().zip(motions).enumerate() {
            line.repanel(motion)?;
            let wing = self.geometry.wing_mut(iw);
            for (j, &p) in line.nodes.iter().enumerate() {
                wing.r_nw.set(0, j, p);
            }
            for j in 0..line.n_span() {
                self.eps_ll[iw][j] = self.opts.initial_core_radius(line.chord[j]);
            }
        }
        Ok(())
    }

    /// Publish the current wind-point request and distribute the answers.
    fn sample_wind(&mut self, provider: &mut dyn WindProvider) -> SimResult<()> {
        let pts = self.requested_wind_points();
        let velocities = provider.sample(&pts)?;
        if velocities.len() != pts.len() {
            return Err(SimError::Invariant {
                what: "wind provider returned wrong sample count",
            });
        }
        self.wind
            .ingest(self.lifecycle.n_nw(), self.lifecycle.n_fw(), &velocities)?;
        Ok(())
    }

    /// Pack the current wake (optionally with the bound row) into the
    /// shared segment buffer.
    fn pack_wake(&mut self, include_bound: bool) -> SimResult<()> {
        let sel = PackSelection {
            include_bound,
            n_nw: self.lifecycle.n_nw(),
            n_fw: self.lifecycle.n_fw(),
        };
        pack_segments(
            &self.geometry,
            &self.gamma_ll,
            &self.eps_ll,
            sel,
            self.mirror(),
            &mut self.seg_buf,
        )?;
        Ok(())
    }

    /// Solve circulation at `t`, warm started from (and stored back into)
    /// the previous solution.
    fn solve_circulation(&mut self, t: Real) -> SimResult<()> {
        self.pack_wake(false)?;
        let gamma = self.circulation.solve(
            t,
            &self.lines,
            &self.polars,
            &self.seg_buf,
            &self.wind.ll,
            &self.gamma_ll,
        )?;
        self.gamma_ll = gamma;
        Ok(())
    }

    /// Map lifting-line circulation onto the youngest near-wake row
    /// (weighted by `scale`), and the near-wake trailing edge onto the
    /// adjacent far-wake row. Pure data movement; repeated after every
    /// solve and integration step because downstream indices shift.
    fn remap(&mut self, scale: Real) {
        let n_nw = self.lifecycle.n_nw();
        let n_span = self.opts.n_span;
        let fw_n_span = self.opts.fw_n_span;

        for iw in 0..self.geometry.n_wings() {
            // LL -> NW
            let wing = self.geometry.wing_mut(iw);
            for j in 0..n_span {
                wing.gamma_nw.set(0, j, scale * self.gamma_ll[iw][j]);
                wing.eps_nw.set(0, j, self.eps_ll[iw][j]);
            }

            // NW -> FW seam: positions always, circulation once the near
            // wake has panels to propagate. Skipped entirely for a
            // near-wake-only configuration.
            if n_nw >= 1 && wing.gamma_fw.n_age() > 0 {
                for jf in 0..=fw_n_span {
                    let js = jf * n_span / fw_n_span;
                    let p = wing.r_nw.get(n_nw, js);
                    wing.r_fw.set(0, jf, p);
                }
                for jf in 0..fw_n_span {
                    let j0 = jf * n_span / fw_n_span;
                    let j1 = ((jf + 1) * n_span / fw_n_span).max(j0 + 1);
                    let mut g = 0.0;
                    let mut e = 0.0;
                    for j in j0..j1 {
                        g += wing.gamma_nw.get(n_nw - 1, j);
                        e += wing.eps_nw.get(n_nw - 1, j);
                    }
                    let count = (j1 - j0) as Real;
                    wing.gamma_fw.set(0, jf, g / count);
                    wing.eps_fw.set(0, jf, e / count);
                }
            }
        }
    }

    /// Shed-scale weighting for a remap at `t_target`: 1.0 for a full wake
    /// step, fractional when sub-cycling between sheds.
    fn shed_scale(&self, t_target: Real) -> Real {
        let dt_wake = self.opts.dt_wake();
        ((t_target - self.lifecycle.t_last_shed()) / dt_wake).clamp(0.0, 1.0)
    }

    /// Advance the unsteady-aero states across `[t, t+dt]` from inputs
    /// derived at the control points (induction with the bound row).
    fn advance_ua(&mut self, t: Real, dt: Real) -> SimResult<()> {
        self.pack_wake(true)?;
        let cps: Vec<Vec3> = self.lines.iter().flat_map(|l| l.cp.iter().copied()).collect();
        let mut v_ind = vec![Vec3::zeros(); cps.len()];
        if !self.seg_buf.is_empty() {
            induced_velocities(
                &self.seg_buf,
                self.opts.reg_function,
                self.opts.induction_accel,
                &cps,
                &mut v_ind,
            )?;
        }

        let mut inputs: Vec<Vec<UaInputs>> = Vec::with_capacity(self.lines.len());
        let mut k = 0;
        for (iw, line) in self.lines.iter().enumerate() {
            let mut wing_inputs = Vec::with_capacity(line.n_span());
            for j in 0..line.n_span() {
                let v_rel = self.wind.ll[iw][j] - line.cp_vel[j] + v_ind[k];
                let vx = v_rel.dot(&line.chord_dir[j]);
                let vn = v_rel.dot(&line.normal[j]);
                let speed = (vx * vx + vn * vn).sqrt();
                wing_inputs.push(UaInputs {
                    alpha: vn.atan2(vx),
                    v_rel: speed,
                    re: speed * line.chord[j] / self.opts.kinematic_viscosity,
                });
                k += 1;
            }
            inputs.push(wing_inputs);
        }

        if let Some(ua) = self.ua.as_mut() {
            ua.advance(&inputs, t, dt);
        }
        Ok(())
    }

    /// One integrator step over the active wake rows. Nothing is written
    /// back unless the whole step succeeds.
    fn integrate(&mut self, t: Real, dt: Real) -> SimResult<()> {
        self.scratch_geom.copy_circulation_from(&self.geometry);
        let x = WakeOdeState::from_geometry(&self.geometry);

        let x_next = {
            let mut model = WakeConvectionModel {
                opts: &self.opts,
                wind: &self.wind,
                n_nw: self.lifecycle.n_nw(),
                n_fw: self.lifecycle.n_fw(),
                scratch: &mut self.scratch_geom,
                seg_buf: &mut self.seg_buf,
            };
            step_with(self.opts.integration_method, &mut model, t, &x, dt)?
        };

        x_next.write_to(&mut self.geometry);
        Ok(())
    }

    /// Age the wake by one row after a shed: far wake first (its youngest
    /// row inherits the near-wake trailing content via the maintained
    /// seam), then the near wake.
    fn age_wake(&mut self) {
        let n_nw = self.lifecycle.n_nw();
        let n_fw = self.lifecycle.n_fw();
        for iw in 0..self.geometry.n_wings() {
            if n_fw > 0 {
                self.geometry.age_far_wake(iw, n_fw);
            }
            self.geometry.age_near_wake(iw, n_nw);
        }
    }

    /// Force any wake point below ground back to ground level.
    fn clamp_to_ground(&mut self) {
        let n_nw = self.lifecycle.n_nw();
        let n_fw = self.lifecycle.n_fw();
        let ground_z = self.opts.ground_z;
        for iw in 0..self.geometry.n_wings() {
            let wing = self.geometry.wing_mut(iw);
            for age in 1..=n_nw {
                for p in wing.r_nw.row_mut(age) {
                    if p.z < ground_z {
                        p.z = ground_z;
                    }
                }
            }
            if n_fw > 0 {
                for age in 0..=n_fw {
                    for p in wing.r_fw.row_mut(age) {
                        if p.z < ground_z {
                            p.z = ground_z;
                        }
                    }
                }
            }
        }
    }

    /// Offer a snapshot to the sinks if their schedule is due. Sink
    /// failures are logged and ignored.
    fn emit_snapshots(&mut self, t: Real) {
        let Some(schedule) = self.snapshot_schedule.as_mut() else {
            return;
        };
        if self.sinks.is_empty() || !schedule.due(t) {
            return;
        }
        schedule.mark(t);
        let snapshot = WakeSnapshot::capture(
            t,
            &self.geometry,
            self.lifecycle.n_nw(),
            self.lifecycle.n_fw(),
        );
        for sink in &mut self.sinks {
            if let Err(e) = sink.emit(&snapshot) {
                warn!(error = %e, "wake snapshot sink failed");
            }
        }
    }
}
