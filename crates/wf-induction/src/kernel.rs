//! Regularized Biot-Savart kernel for a straight vortex line segment.

use std::f64::consts::PI;

use wf_core::RegFunction;

use crate::Vec3;

/// Lamb-Oseen core-spreading exponent constant.
const LAMB_OSEEN_ALPHA: f64 = 1.256_43;

/// Denominators below this are treated as singular and return zero velocity.
const MIN_DENOM: f64 = 1e-15;

/// Induced velocity at `x` from a straight segment `p0 -> p1` carrying
/// circulation `gamma` with core radius `eps`.
///
/// Uses the two-leg formulation
///
/// ```text
/// v = K * gamma/(4 pi) * (|r1| + |r2|) / (|r1||r2| (|r1||r2| + r1.r2)) * (r1 x r2)
/// ```
///
/// where `r1 = x - p0`, `r2 = x - p1` and `K` is the regularization factor
/// evaluated at the perpendicular distance from the segment axis. Evaluation
/// points on (or numerically indistinguishable from) the filament axis get
/// zero velocity rather than a singular value.
pub fn segment_velocity(p0: Vec3, p1: Vec3, gamma: f64, eps: f64, x: Vec3, reg: RegFunction) -> Vec3 {
    let r1 = x - p0;
    let r2 = x - p1;
    let r0 = p1 - p0;

    let n1 = r1.norm();
    let n2 = r2.norm();
    let n0_sq = r0.norm_squared();
    if n0_sq < MIN_DENOM {
        // Degenerate segment
        return Vec3::zeros();
    }

    let cross = r1.cross(&r2);
    let cross_sq = cross.norm_squared();

    let mut denom = n1 * n2 * (n1 * n2 + r1.dot(&r2));
    if let RegFunction::Offset = reg {
        denom += eps * eps * n0_sq;
    }
    if denom.abs() < MIN_DENOM || cross_sq < MIN_DENOM {
        return Vec3::zeros();
    }

    // Perpendicular distance from the segment axis
    let h_sq = cross_sq / n0_sq;
    let factor = reg_factor(reg, h_sq, eps);

    cross * (factor * gamma * (n1 + n2) / (4.0 * PI * denom))
}

/// Regularization factor at squared axis distance `h_sq` for core radius
/// `eps`. All variants tend to 1 far from the core and to 0 on the axis
/// (except the singular and offset kernels, which stay at 1).
fn reg_factor(reg: RegFunction, h_sq: f64, eps: f64) -> f64 {
    let eps_sq = eps * eps;
    match reg {
        RegFunction::None | RegFunction::Offset => 1.0,
        RegFunction::Rankine => {
            if h_sq < eps_sq {
                h_sq / eps_sq
            } else {
                1.0
            }
        }
        RegFunction::LambOseen => 1.0 - (-LAMB_OSEEN_ALPHA * h_sq / eps_sq).exp(),
        RegFunction::Vatistas => h_sq / (eps_sq * eps_sq + h_sq * h_sq).sqrt(),
    }
}
