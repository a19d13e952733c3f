//! Fixed-step time integrators.

use wf_core::IntegrationMethod;

use crate::error::SimResult;
use crate::model::OdeModel;

/// Trait for time integrators.
pub trait Integrator {
    /// Advance state by one time step using the model's derivative.
    fn step<M: OdeModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State>;
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
#[derive(Clone, Debug)]
pub struct Rk4;

impl Integrator for Rk4 {
    fn step<M: OdeModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let k1 = model.rhs(t, x)?;

        let x2 = model.add(x, &model.scale(&k1, 0.5 * dt));
        let k2 = model.rhs(t + 0.5 * dt, &x2)?;

        let x3 = model.add(x, &model.scale(&k2, 0.5 * dt));
        let k3 = model.rhs(t + 0.5 * dt, &x3)?;

        let x4 = model.add(x, &model.scale(&k3, dt));
        let k4 = model.rhs(t + dt, &x4)?;

        // Combine: x_new = x + (dt/6) * (k1 + 2*k2 + 2*k3 + k4)
        let k_sum = model.add(
            &model.add(&k1, &model.scale(&k2, 2.0)),
            &model.add(&model.scale(&k3, 2.0), &k4),
        );

        Ok(model.add(x, &model.scale(&k_sum, dt / 6.0)))
    }
}

/// Forward Euler (explicit, 1st order).
/// Calls rhs() once per step instead of 4 times (RK4).
#[derive(Clone, Debug)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn step<M: OdeModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let xdot = model.rhs(t, x)?;
        Ok(model.add(x, &model.scale(&xdot, dt)))
    }
}

/// Advance one step with the configured scheme.
pub fn step_with<M: OdeModel>(
    method: IntegrationMethod,
    model: &mut M,
    t: f64,
    x: &M::State,
    dt: f64,
) -> SimResult<M::State> {
    match method {
        IntegrationMethod::Euler1 => ForwardEuler.step(model, t, x, dt),
        IntegrationMethod::Rk4 => Rk4.step(model, t, x, dt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scalar model with a time-dependent derivative, for accuracy checks.
    struct CosineModel {
        omega: f64,
    }

    impl OdeModel for CosineModel {
        type State = f64;

        fn rhs(&mut self, t: f64, _x: &f64) -> SimResult<f64> {
            Ok((self.omega * t).cos())
        }

        fn add(&self, a: &f64, b: &f64) -> f64 {
            a + b
        }

        fn scale(&self, a: &f64, scale: f64) -> f64 {
            a * scale
        }
    }

    /// Constant-derivative model: both schemes must be exact.
    struct ConstantModel {
        v: f64,
    }

    impl OdeModel for ConstantModel {
        type State = f64;

        fn rhs(&mut self, _t: f64, _x: &f64) -> SimResult<f64> {
            Ok(self.v)
        }

        fn add(&self, a: &f64, b: &f64) -> f64 {
            a + b
        }

        fn scale(&self, a: &f64, scale: f64) -> f64 {
            a * scale
        }
    }

    #[test]
    fn constant_field_is_exact_for_both_schemes() {
        let mut model = ConstantModel { v: 3.0 };
        let dt = 0.125;
        let euler = ForwardEuler.step(&mut model, 0.0, &1.0, dt).unwrap();
        let rk4 = Rk4.step(&mut model, 0.0, &1.0, dt).unwrap();
        assert_eq!(euler, 1.0 + 3.0 * dt);
        // RK4 collapses to the same update when f has no t/x dependence
        assert_eq!(rk4, euler);
    }

    #[test]
    fn rk4_error_shrinks_much_faster_than_euler() {
        // x' = cos(2 t), exact integral over one step from 0:
        // (sin(2 dt)) / 2
        let omega = 2.0;
        let exact = |dt: f64| (omega * dt).sin() / omega;

        let mut worst_ratio: f64 = 0.0;
        for &dt in &[0.2, 0.1, 0.05] {
            let mut model = CosineModel { omega };
            let e = (ForwardEuler.step(&mut model, 0.0, &0.0, dt).unwrap() - exact(dt)).abs();
            let r = (Rk4.step(&mut model, 0.0, &0.0, dt).unwrap() - exact(dt)).abs();
            assert!(r < e, "rk4 ({r}) should beat euler ({e}) at dt={dt}");
            worst_ratio = worst_ratio.max(r / e);
        }
        assert!(worst_ratio < 1e-3);
    }

    #[test]
    fn rk4_is_fifth_order_in_local_error() {
        let omega = 2.0;
        let exact = |dt: f64| (omega * dt).sin() / omega;
        let err = |dt: f64| {
            let mut model = CosineModel { omega };
            (Rk4.step(&mut model, 0.0, &0.0, dt).unwrap() - exact(dt)).abs()
        };
        // Halving dt must shrink the one-step error by ~2^5
        let ratio = err(0.2) / err(0.1);
        assert!(
            ratio > 16.0,
            "local error ratio {ratio} too small for 4th-order scheme"
        );
    }

    #[test]
    fn euler_is_second_order_in_local_error() {
        let omega = 2.0;
        let exact = |dt: f64| (omega * dt).sin() / omega;
        let err = |dt: f64| {
            let mut model = CosineModel { omega };
            (ForwardEuler.step(&mut model, 0.0, &0.0, dt).unwrap() - exact(dt)).abs()
        };
        let ratio = err(0.2) / err(0.1);
        assert!(ratio > 3.0 && ratio < 5.0, "unexpected ratio {ratio}");
    }
}
