//! Continuous wake state as seen by the integrators.
//!
//! A `WakeOdeState` is a full-capacity snapshot of the position and
//! core-radius arrays. Derivative states built by the model are zero
//! outside the active age rows (and on the bound age-0 near-wake row), so
//! the element-wise `add`/`scale` algebra the integrators use leaves
//! inactive rows bit-identical — including debug-build poison fills.

use wf_core::Real;
use wf_wake::{AgeSpanGrid, Vec3, WakeGeometry};

/// Integrated wake state: filament node positions and panel core radii.
#[derive(Clone, Debug)]
pub struct WakeOdeState {
    pub r_nw: Vec<AgeSpanGrid<Vec3>>,
    pub r_fw: Vec<AgeSpanGrid<Vec3>>,
    pub eps_nw: Vec<AgeSpanGrid<Real>>,
    pub eps_fw: Vec<AgeSpanGrid<Real>>,
}

impl WakeOdeState {
    /// Snapshot the integrated arrays out of the geometry arenas.
    pub fn from_geometry(geom: &WakeGeometry) -> Self {
        Self {
            r_nw: geom.wings().iter().map(|w| w.r_nw.clone()).collect(),
            r_fw: geom.wings().iter().map(|w| w.r_fw.clone()).collect(),
            eps_nw: geom.wings().iter().map(|w| w.eps_nw.clone()).collect(),
            eps_fw: geom.wings().iter().map(|w| w.eps_fw.clone()).collect(),
        }
    }

    /// Zero state with the same shape (used for derivatives).
    pub fn zeros_like(&self) -> Self {
        let zero3 = |g: &AgeSpanGrid<Vec3>| AgeSpanGrid::new(g.n_age(), g.n_span(), Vec3::zeros());
        let zero1 = |g: &AgeSpanGrid<Real>| AgeSpanGrid::new(g.n_age(), g.n_span(), 0.0);
        Self {
            r_nw: self.r_nw.iter().map(zero3).collect(),
            r_fw: self.r_fw.iter().map(zero3).collect(),
            eps_nw: self.eps_nw.iter().map(zero1).collect(),
            eps_fw: self.eps_fw.iter().map(zero1).collect(),
        }
    }

    /// Write the integrated arrays back into the geometry arenas.
    pub fn write_to(&self, geom: &mut WakeGeometry) {
        for (iw, wing) in geom.wings_mut().iter_mut().enumerate() {
            wing.r_nw.as_mut_slice().copy_from_slice(self.r_nw[iw].as_slice());
            wing.r_fw.as_mut_slice().copy_from_slice(self.r_fw[iw].as_slice());
            wing.eps_nw
                .as_mut_slice()
                .copy_from_slice(self.eps_nw[iw].as_slice());
            wing.eps_fw
                .as_mut_slice()
                .copy_from_slice(self.eps_fw[iw].as_slice());
        }
    }

    pub fn n_wings(&self) -> usize {
        self.r_nw.len()
    }

    /// Element-wise sum (integrator state algebra).
    pub fn add(&self, other: &Self) -> Self {
        let add3 = |a: &AgeSpanGrid<Vec3>, b: &AgeSpanGrid<Vec3>| {
            let mut out = a.clone();
            for (o, x) in out.as_mut_slice().iter_mut().zip(b.as_slice()) {
                *o += *x;
            }
            out
        };
        let add1 = |a: &AgeSpanGrid<Real>, b: &AgeSpanGrid<Real>| {
            let mut out = a.clone();
            for (o, x) in out.as_mut_slice().iter_mut().zip(b.as_slice()) {
                *o += *x;
            }
            out
        };
        Self {
            r_nw: self.r_nw.iter().zip(&other.r_nw).map(|(a, b)| add3(a, b)).collect(),
            r_fw: self.r_fw.iter().zip(&other.r_fw).map(|(a, b)| add3(a, b)).collect(),
            eps_nw: self
                .eps_nw
                .iter()
                .zip(&other.eps_nw)
                .map(|(a, b)| add1(a, b))
                .collect(),
            eps_fw: self
                .eps_fw
                .iter()
                .zip(&other.eps_fw)
                .map(|(a, b)| add1(a, b))
                .collect(),
        }
    }

    /// Element-wise scaling (integrator state algebra).
    pub fn scale(&self, k: Real) -> Self {
        let scale3 = |a: &AgeSpanGrid<Vec3>| {
            let mut out = a.clone();
            for o in out.as_mut_slice().iter_mut() {
                *o *= k;
            }
            out
        };
        let scale1 = |a: &AgeSpanGrid<Real>| {
            let mut out = a.clone();
            for o in out.as_mut_slice().iter_mut() {
                *o *= k;
            }
            out
        };
        Self {
            r_nw: self.r_nw.iter().map(scale3).collect(),
            r_fw: self.r_fw.iter().map(scale3).collect(),
            eps_nw: self.eps_nw.iter().map(scale1).collect(),
            eps_fw: self.eps_fw.iter().map(scale1).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_core::WakeOptions;

    fn geom() -> WakeGeometry {
        let mut g = WakeGeometry::new(&WakeOptions {
            n_wings: 1,
            n_span: 2,
            fw_n_span: 1,
            n_nw_max: 2,
            n_fw_max: 1,
            n_fw_free: 1,
            ..Default::default()
        });
        let w = g.wing_mut(0);
        for age in 0..w.r_nw.n_age() {
            for j in 0..w.r_nw.n_span() {
                w.r_nw.set(age, j, Vec3::new(age as f64, j as f64, 0.0));
            }
        }
        for age in 0..w.r_fw.n_age() {
            for j in 0..w.r_fw.n_span() {
                w.r_fw.set(age, j, Vec3::zeros());
            }
        }
        g
    }

    #[test]
    fn round_trip_through_geometry() {
        let mut g = geom();
        let mut s = WakeOdeState::from_geometry(&g);
        s.r_nw[0].set(1, 1, Vec3::new(9.0, 9.0, 9.0));
        s.write_to(&mut g);
        assert_eq!(g.wing(0).r_nw.get(1, 1), Vec3::new(9.0, 9.0, 9.0));
        assert_eq!(g.wing(0).r_nw.get(2, 1), Vec3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn algebra_is_element_wise() {
        let g = geom();
        let s = WakeOdeState::from_geometry(&g);
        let mut d = s.zeros_like();
        d.r_nw[0].set(0, 0, Vec3::new(1.0, 0.0, 0.0));

        let sum = s.add(&d.scale(2.0));
        assert_eq!(
            sum.r_nw[0].get(0, 0),
            s.r_nw[0].get(0, 0) + Vec3::new(2.0, 0.0, 0.0)
        );
        // Untouched entries unchanged
        assert_eq!(sum.r_nw[0].get(2, 1), s.r_nw[0].get(2, 1));
    }
}
