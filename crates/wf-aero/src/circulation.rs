//! Lifting-line circulation resolution.
//!
//! The circulation is an algebraic unknown, not an integrated state: it is
//! re-solved from scratch at both ends of every coupling interval, warm
//! started from the previous solution. The wake's induction at the control
//! points is frozen during the solve (the wake geometry does not move);
//! only the bound segments are re-packed with the current iterate.

use nalgebra::DVector;
use tracing::debug;
use wf_core::{CirculationMethod, WakeOptions};
use wf_induction::{SegmentBuffer, induced_velocities};

use crate::Vec3;
use crate::error::{AeroError, AeroResult};
use crate::geometry::LiftingLine;
use crate::polar::PolarSet;

/// Resolves the spanwise bound circulation per wing.
pub struct CirculationSolver {
    opts: WakeOptions,
    /// Imposed distribution for `CirculationMethod::Prescribed`
    prescribed: Option<Vec<Vec<f64>>>,
    /// Scratch buffer for the bound segments, capacity fixed at creation
    bound_buf: SegmentBuffer,
}

impl CirculationSolver {
    pub fn new(opts: &WakeOptions) -> Self {
        let n_bound = opts.n_wings * opts.n_span;
        let n_bound_pts = opts.n_wings * (opts.n_span + 1);
        Self {
            opts: opts.clone(),
            prescribed: None,
            bound_buf: SegmentBuffer::with_capacity(n_bound, n_bound_pts),
        }
    }

    /// Impose a fixed distribution (used with `CirculationMethod::Prescribed`).
    pub fn set_prescribed(&mut self, gamma: Vec<Vec<f64>>) {
        self.prescribed = Some(gamma);
    }

    /// Solve for the lifting-line circulation at one instant.
    ///
    /// `wake_segments` holds the packed free wake (bound row excluded);
    /// `wind_at_cp` is the ambient wind at each control point. `guess`
    /// seeds the fixed-point iteration.
    pub fn solve(
        &mut self,
        t: f64,
        lines: &[LiftingLine],
        polars: &PolarSet,
        wake_segments: &SegmentBuffer,
        wind_at_cp: &[Vec<Vec3>],
        guess: &[Vec<f64>],
    ) -> AeroResult<Vec<Vec<f64>>> {
        match self.opts.circulation.method {
            CirculationMethod::Prescribed => {
                self.prescribed.clone().ok_or(AeroError::InvalidArg {
                    what: "prescribed circulation selected but no distribution was set",
                })
            }
            CirculationMethod::PolarData => {
                self.solve_polar(t, lines, polars, wake_segments, wind_at_cp, guess)
            }
        }
    }

    fn solve_polar(
        &mut self,
        t: f64,
        lines: &[LiftingLine],
        polars: &PolarSet,
        wake_segments: &SegmentBuffer,
        wind_at_cp: &[Vec<Vec3>],
        guess: &[Vec<f64>],
    ) -> AeroResult<Vec<Vec<f64>>> {
        let settings = self.opts.circulation;

        // Control points, flattened across wings
        let cps: Vec<Vec3> = lines.iter().flat_map(|l| l.cp.iter().copied()).collect();
        let n_cp = cps.len();

        // Wake induction at the control points is constant across iterations
        let mut v_wake = vec![Vec3::zeros(); n_cp];
        if !wake_segments.is_empty() {
            induced_velocities(
                wake_segments,
                self.opts.reg_function,
                self.opts.induction_accel,
                &cps,
                &mut v_wake,
            )?;
        }

        let mut gamma: Vec<DVector<f64>> = guess
            .iter()
            .map(|g| DVector::from_column_slice(g))
            .collect();
        let mut v_bound = vec![Vec3::zeros(); n_cp];

        for iter in 0..settings.max_iterations {
            self.pack_bound(lines, &gamma)?;
            induced_velocities(
                &self.bound_buf,
                self.opts.reg_function,
                self.opts.induction_accel,
                &cps,
                &mut v_bound,
            )?;

            let mut delta_max: f64 = 0.0;
            let mut k = 0;
            for (iw, line) in lines.iter().enumerate() {
                for j in 0..line.n_span() {
                    let v_rel =
                        wind_at_cp[iw][j] - line.cp_vel[j] + v_wake[k] + v_bound[k];
                    let vx = v_rel.dot(&line.chord_dir[j]);
                    let vn = v_rel.dot(&line.normal[j]);
                    let alpha = vn.atan2(vx);
                    let speed = (vx * vx + vn * vn).sqrt();

                    let polar = polars.get(line.polar_index[j])?;
                    let cl = polar.lookup(alpha).cl;
                    let target = 0.5 * speed * line.chord[j] * cl;

                    let old = gamma[iw][j];
                    let new = old + settings.relaxation * (target - old);
                    delta_max = delta_max.max((target - old).abs());
                    gamma[iw][j] = new;
                    k += 1;
                }
            }

            if delta_max < settings.tolerance {
                debug!(t, iterations = iter + 1, delta_max, "circulation converged");
                return Ok(gamma.iter().map(|g| g.as_slice().to_vec()).collect());
            }
        }

        Err(AeroError::ConvergenceFailed {
            what: format!(
                "circulation solve at t={t}: {} iterations without reaching {}",
                settings.max_iterations, settings.tolerance
            ),
        })
    }

    /// Pack the bound lifting-line segments with the current iterate.
    fn pack_bound(&mut self, lines: &[LiftingLine], gamma: &[DVector<f64>]) -> AeroResult<()> {
        self.bound_buf.clear();
        for (line, g) in lines.iter().zip(gamma) {
            let mut idx = Vec::with_capacity(line.nodes.len());
            for &p in &line.nodes {
                idx.push(self.bound_buf.push_point(p)?);
            }
            for j in 0..line.n_span() {
                let eps = self.opts.initial_core_radius(line.chord[j]);
                self.bound_buf.push_segment(idx[j], idx[j + 1], g[j], eps)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BladeMotion;
    use crate::polar::AirfoilPolar;
    use wf_core::CirculationSettings;

    fn one_wing(n_span: usize) -> Vec<LiftingLine> {
        let n_nodes = n_span + 1;
        let motion = BladeMotion {
            nodes: (0..n_nodes)
                .map(|i| Vec3::new(0.0, i as f64, 0.0))
                .collect(),
            chord_dirs: vec![Vec3::x(); n_nodes],
            normals: vec![Vec3::z(); n_nodes],
            chords: vec![1.0; n_nodes],
            velocities: vec![Vec3::zeros(); n_nodes],
        };
        let mut line = LiftingLine::new(n_span, vec![0; n_span]).unwrap();
        line.repanel(&motion).unwrap();
        vec![line]
    }

    fn opts(n_span: usize, method: CirculationMethod) -> WakeOptions {
        WakeOptions {
            n_wings: 1,
            n_span,
            fw_n_span: 1,
            circulation: CirculationSettings {
                method,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn prescribed_mode_returns_the_imposed_distribution() {
        let lines = one_wing(3);
        let polars = PolarSet::new(vec![AirfoilPolar::thin_airfoil(64)]).unwrap();
        let mut solver = CirculationSolver::new(&opts(3, CirculationMethod::Prescribed));
        solver.set_prescribed(vec![vec![1.0, 2.0, 3.0]]);

        let wake = SegmentBuffer::with_capacity(0, 0);
        let wind = vec![vec![Vec3::new(10.0, 0.0, 0.0); 3]];
        let out = solver
            .solve(0.0, &lines, &polars, &wake, &wind, &[vec![0.0; 3]])
            .unwrap();
        assert_eq!(out[0], vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn prescribed_mode_without_distribution_is_an_error() {
        let lines = one_wing(2);
        let polars = PolarSet::new(vec![AirfoilPolar::thin_airfoil(64)]).unwrap();
        let mut solver = CirculationSolver::new(&opts(2, CirculationMethod::Prescribed));
        let wake = SegmentBuffer::with_capacity(0, 0);
        let wind = vec![vec![Vec3::zeros(); 2]];
        assert!(
            solver
                .solve(0.0, &lines, &polars, &wake, &wind, &[vec![0.0; 2]])
                .is_err()
        );
    }

    #[test]
    fn zero_alpha_inflow_gives_zero_circulation() {
        // Wind straight along the chord: alpha = 0 everywhere, Cl = 0
        let lines = one_wing(4);
        let polars = PolarSet::new(vec![AirfoilPolar::thin_airfoil(256)]).unwrap();
        let mut solver = CirculationSolver::new(&opts(4, CirculationMethod::PolarData));
        let wake = SegmentBuffer::with_capacity(0, 0);
        let wind = vec![vec![Vec3::new(10.0, 0.0, 0.0); 4]];

        let out = solver
            .solve(0.0, &lines, &polars, &wake, &wind, &[vec![0.0; 4]])
            .unwrap();
        for g in &out[0] {
            assert!(g.abs() < 1e-9, "expected zero circulation, got {g}");
        }
    }

    #[test]
    fn pitched_inflow_converges_to_the_thin_airfoil_value() {
        // Single panel: no trailing wake packed, no cross-panel coupling,
        // so gamma must approach 0.5 * V * c * Cl(alpha) exactly.
        let lines = one_wing(1);
        let polars = PolarSet::new(vec![AirfoilPolar::thin_airfoil(2001)]).unwrap();
        let mut solver = CirculationSolver::new(&opts(1, CirculationMethod::PolarData));
        let wake = SegmentBuffer::with_capacity(0, 0);

        let alpha = 0.05_f64;
        let speed = 10.0;
        let wind = vec![vec![Vec3::new(
            speed * alpha.cos(),
            0.0,
            speed * alpha.sin(),
        ); 1]];

        let out = solver
            .solve(0.0, &lines, &polars, &wake, &wind, &[vec![0.0]])
            .unwrap();
        let expected = 0.5 * speed * 1.0 * (2.0 * PI_F * alpha.sin() * alpha.cos());
        assert!(
            (out[0][0] - expected).abs() < 0.02 * expected.abs(),
            "gamma {} vs expected {expected}",
            out[0][0]
        );
    }

    #[test]
    fn warm_start_converges_immediately_at_the_fixed_point() {
        let lines = one_wing(1);
        let polars = PolarSet::new(vec![AirfoilPolar::thin_airfoil(2001)]).unwrap();
        let mut solver = CirculationSolver::new(&opts(1, CirculationMethod::PolarData));
        let wake = SegmentBuffer::with_capacity(0, 0);
        let wind = vec![vec![Vec3::new(10.0, 0.0, 0.5); 1]];

        let first = solver
            .solve(0.0, &lines, &polars, &wake, &wind, &[vec![0.0]])
            .unwrap();
        let second = solver
            .solve(0.0, &lines, &polars, &wake, &wind, &[first[0].clone()])
            .unwrap();
        // One warm-started iteration moves the solution by at most
        // relaxation * tolerance
        assert!((first[0][0] - second[0][0]).abs() < 1e-4);
    }

    const PI_F: f64 = std::f64::consts::PI;
}
