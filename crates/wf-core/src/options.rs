//! Solver configuration surface.
//!
//! Every sizing constant and model selection is an explicit field threaded
//! through the solver at construction time; nothing is read from ambient
//! globals. `WakeOptions::validate` runs once before any state is allocated
//! and rejects unsupported selections up front.

use crate::error::{CoreError, CoreResult};
use crate::numeric::Real;

/// Time integration scheme for the wake convection equations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum IntegrationMethod {
    /// Explicit Euler, one derivative evaluation per step.
    Euler1,
    /// Classical 4th-order Runge-Kutta, four derivative evaluations per step.
    #[default]
    Rk4,
}

/// Evolution law for the vortex-core (regularization) radius.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DiffusionMethod {
    /// Core radius is frozen at its shed value.
    #[default]
    Constant,
    /// Viscous core spreading with filament age (eddy-viscosity model).
    AgeBased,
    /// Recognized but unimplemented; selecting it is a configuration error.
    Stretching,
}

/// How the lifting-line circulation is obtained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CirculationMethod {
    /// Caller supplies the spanwise distribution; no solve.
    Prescribed,
    /// Iterative fixed-point solve against airfoil polar data.
    #[default]
    PolarData,
}

/// Regularized Biot-Savart kernel variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegFunction {
    /// Singular kernel, no smoothing.
    None,
    Rankine,
    #[default]
    LambOseen,
    /// Vatistas n=2 profile.
    Vatistas,
    /// Denominator offset by the core radius.
    Offset,
}

/// How the core radius of freshly shed wake panels is determined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum WakeRegMethod {
    /// One fixed core radius everywhere, `wake_reg_param` in meters.
    #[default]
    Constant,
    /// Core radius is `wake_reg_param` times the local chord.
    ChordScaled,
}

/// Acceleration strategy for the induction evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InductionAccel {
    /// Direct O(segments x points) summation.
    #[default]
    Dense,
    /// Barnes-Hut style octree with the given branch-opening ratio.
    Tree { branch_ratio: Real },
}

/// Settings for the iterative circulation solve.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CirculationSettings {
    pub method: CirculationMethod,
    /// Maximum fixed-point iterations
    pub max_iterations: usize,
    /// Convergence tolerance on the max circulation change (m^2/s)
    pub tolerance: Real,
    /// Under-relaxation factor in (0, 1]
    pub relaxation: Real,
}

impl Default for CirculationSettings {
    fn default() -> Self {
        Self {
            method: CirculationMethod::default(),
            max_iterations: 100,
            tolerance: 1e-4,
            relaxation: 0.3,
        }
    }
}

/// Complete wake-solver configuration.
///
/// Counts size the fixed-capacity wake arenas; the arenas are never
/// reallocated after construction.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WakeOptions {
    /// Number of wings (blades) sharing the wake
    pub n_wings: usize,
    /// Near-wake spanwise panel count per wing
    pub n_span: usize,
    /// Far-wake spanwise panel count per wing (coarser, at most `n_span`)
    pub fw_n_span: usize,
    /// Maximum near-wake panel rows
    pub n_nw_max: usize,
    /// Maximum far-wake panel rows
    pub n_fw_max: usize,
    /// Far-wake rows convected with fully resolved induction; rows beyond
    /// this drift at the averaged free-wake velocity
    pub n_fw_free: usize,
    /// Aerodynamic (coupling) time step (s)
    pub dt_aero: Real,
    /// Wake time step as an integer multiple of `dt_aero`
    pub dt_wake_factor: usize,
    /// Before this time the wake convects with ambient wind only (s)
    pub free_wake_start_time: Real,
    pub integration_method: IntegrationMethod,
    pub diffusion_method: DiffusionMethod,
    pub circulation: CirculationSettings,
    pub reg_function: RegFunction,
    pub wake_reg_method: WakeRegMethod,
    /// Core radius (m) or chord fraction, per `wake_reg_method`
    pub wake_reg_param: Real,
    /// Core-spreading constant alpha for the age-based diffusion model
    pub core_spread_alpha: Real,
    /// Eddy-viscosity multiplier for the age-based diffusion model
    pub eddy_viscosity: Real,
    /// Kinematic viscosity of air (m^2/s)
    pub kinematic_viscosity: Real,
    /// Mirror the wake about the ground plane and clamp nodes to it
    pub ground_effect: bool,
    /// Ground plane height (m), used only when `ground_effect` is set
    pub ground_z: Real,
    pub induction_accel: InductionAccel,
}

impl Default for WakeOptions {
    fn default() -> Self {
        Self {
            n_wings: 3,
            n_span: 20,
            fw_n_span: 4,
            n_nw_max: 60,
            n_fw_max: 120,
            n_fw_free: 120,
            dt_aero: 0.01,
            dt_wake_factor: 1,
            free_wake_start_time: 0.0,
            integration_method: IntegrationMethod::default(),
            diffusion_method: DiffusionMethod::default(),
            circulation: CirculationSettings::default(),
            reg_function: RegFunction::default(),
            wake_reg_method: WakeRegMethod::default(),
            wake_reg_param: 0.25,
            core_spread_alpha: 1.256_43,
            eddy_viscosity: 100.0,
            kinematic_viscosity: 1.46e-5,
            ground_effect: false,
            ground_z: 0.0,
            induction_accel: InductionAccel::default(),
        }
    }
}

impl WakeOptions {
    /// Wake (shedding) time step in seconds.
    pub fn dt_wake(&self) -> Real {
        self.dt_wake_factor as Real * self.dt_aero
    }

    /// Core radius assigned to bound segments and freshly shed panels at a
    /// station with the given chord.
    pub fn initial_core_radius(&self, chord: Real) -> Real {
        match self.wake_reg_method {
            WakeRegMethod::Constant => self.wake_reg_param,
            WakeRegMethod::ChordScaled => self.wake_reg_param * chord,
        }
    }

    /// Reject unsupported or inconsistent selections before any state is
    /// allocated.
    pub fn validate(&self) -> CoreResult<()> {
        if self.n_wings == 0 {
            return Err(CoreError::InvalidArg {
                what: "n_wings must be positive",
            });
        }
        if self.n_span == 0 {
            return Err(CoreError::InvalidArg {
                what: "n_span must be positive",
            });
        }
        if self.fw_n_span == 0 || self.fw_n_span > self.n_span {
            return Err(CoreError::InvalidConfig {
                what: format!(
                    "fw_n_span={} must be in 1..=n_span ({})",
                    self.fw_n_span, self.n_span
                ),
            });
        }
        if self.n_nw_max == 0 {
            return Err(CoreError::InvalidArg {
                what: "n_nw_max must be positive",
            });
        }
        if self.n_fw_free > self.n_fw_max {
            return Err(CoreError::InvalidConfig {
                what: format!(
                    "n_fw_free={} exceeds n_fw_max={}",
                    self.n_fw_free, self.n_fw_max
                ),
            });
        }
        if self.dt_aero <= 0.0 {
            return Err(CoreError::InvalidArg {
                what: "dt_aero must be positive",
            });
        }
        if self.dt_wake_factor == 0 {
            return Err(CoreError::InvalidArg {
                what: "dt_wake_factor must be positive",
            });
        }
        if self.diffusion_method == DiffusionMethod::Stretching {
            return Err(CoreError::InvalidConfig {
                what: "diffusion_method=Stretching has no implemented update rule".to_string(),
            });
        }
        if self.wake_reg_param <= 0.0 {
            return Err(CoreError::InvalidArg {
                what: "wake_reg_param must be positive",
            });
        }
        let c = &self.circulation;
        if c.max_iterations == 0 {
            return Err(CoreError::InvalidArg {
                what: "circulation.max_iterations must be positive",
            });
        }
        if !(c.relaxation > 0.0 && c.relaxation <= 1.0) {
            return Err(CoreError::InvalidArg {
                what: "circulation.relaxation must be in (0, 1]",
            });
        }
        if let InductionAccel::Tree { branch_ratio } = self.induction_accel {
            if branch_ratio <= 0.0 {
                return Err(CoreError::InvalidArg {
                    what: "tree branch_ratio must be positive",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        WakeOptions::default().validate().unwrap();
    }

    #[test]
    fn stretching_is_rejected() {
        let opts = WakeOptions {
            diffusion_method: DiffusionMethod::Stretching,
            ..Default::default()
        };
        let err = opts.validate().unwrap_err();
        assert!(format!("{err}").contains("Stretching"));
    }

    #[test]
    fn fw_free_bounded_by_fw_max() {
        let opts = WakeOptions {
            n_fw_max: 10,
            n_fw_free: 11,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn fw_span_cannot_exceed_nw_span() {
        let opts = WakeOptions {
            n_span: 8,
            fw_n_span: 9,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn wake_dt_is_a_multiple_of_aero_dt() {
        let opts = WakeOptions {
            dt_aero: 0.02,
            dt_wake_factor: 5,
            ..Default::default()
        };
        assert!((opts.dt_wake() - 0.1).abs() < 1e-15);
    }
}
