//! Vortex-core growth models emulating viscous diffusion.

use wf_core::{DiffusionMethod, Real, WakeOptions};

use crate::error::{WakeError, WakeResult};

/// Rate of change of a panel's core radius.
///
/// * `Constant` freezes the shed core size.
/// * `AgeBased` grows the core with filament age: with spreading rate
///   `k = 2 * alpha * delta * nu`, the radius obeys
///   `d(eps)/dt = k / sqrt(eps^2 + 2 k dt_wake)`, the closed-form rate of
///   the Lamb-Oseen core-spreading law evaluated one wake step ahead.
/// * `Stretching` has no implemented update rule; selecting it is a fatal
///   configuration error (also rejected by `WakeOptions::validate`).
pub fn core_radius_rate(opts: &WakeOptions, eps: Real) -> WakeResult<Real> {
    match opts.diffusion_method {
        DiffusionMethod::Constant => Ok(0.0),
        DiffusionMethod::AgeBased => {
            let k = 2.0 * opts.core_spread_alpha * opts.eddy_viscosity * opts.kinematic_viscosity;
            Ok(k / (eps * eps + 2.0 * k * opts.dt_wake()).sqrt())
        }
        DiffusionMethod::Stretching => Err(WakeError::Unsupported {
            what: "stretching diffusion model has no implemented update rule",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_model_freezes_the_core() {
        let opts = WakeOptions::default();
        assert_eq!(core_radius_rate(&opts, 0.3).unwrap(), 0.0);
    }

    #[test]
    fn age_based_rate_is_positive_and_decreasing_in_eps() {
        let opts = WakeOptions {
            diffusion_method: DiffusionMethod::AgeBased,
            ..Default::default()
        };
        let r_small = core_radius_rate(&opts, 0.01).unwrap();
        let r_large = core_radius_rate(&opts, 1.0).unwrap();
        assert!(r_small > 0.0);
        assert!(r_large > 0.0);
        assert!(r_small > r_large);
    }

    #[test]
    fn age_based_rate_is_finite_at_zero_core() {
        // The 2 k dt_wake term keeps the rate bounded for a fresh filament
        let opts = WakeOptions {
            diffusion_method: DiffusionMethod::AgeBased,
            ..Default::default()
        };
        assert!(core_radius_rate(&opts, 0.0).unwrap().is_finite());
    }

    #[test]
    fn stretching_is_fatal() {
        let opts = WakeOptions {
            diffusion_method: DiffusionMethod::Stretching,
            ..Default::default()
        };
        assert!(core_radius_rate(&opts, 0.1).is_err());
    }
}
