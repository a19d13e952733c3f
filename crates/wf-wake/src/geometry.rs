//! Fixed-capacity wake geometry arenas.
//!
//! Every array is sized once from (`n_nw_max`, `n_fw_max`, span counts) and
//! never reallocated during a run; how many age rows are actually live is
//! tracked separately by [`crate::lifecycle::WakeLifecycle`].
//!
//! Node grids bound panel grids, so position arrays carry one more age row
//! (and one more span column) than the circulation / core-radius arrays.
//! The age-0 near-wake row is the lifting line itself and never moves under
//! convection.

use wf_core::{Real, WakeOptions};

use crate::Vec3;
use crate::grid::AgeSpanGrid;

/// Array dimensions shared by all wings.
#[derive(Clone, Copy, Debug)]
pub struct WakeDims {
    /// Near-wake spanwise panel count
    pub n_span: usize,
    /// Far-wake spanwise panel count
    pub fw_n_span: usize,
    /// Near-wake panel-row capacity
    pub n_nw_max: usize,
    /// Far-wake panel-row capacity
    pub n_fw_max: usize,
}

impl WakeDims {
    pub fn from_options(opts: &WakeOptions) -> Self {
        Self {
            n_span: opts.n_span,
            fw_n_span: opts.fw_n_span,
            n_nw_max: opts.n_nw_max,
            n_fw_max: opts.n_fw_max,
        }
    }

    /// Near-wake node rows (one more than panel rows).
    pub fn nw_node_rows(&self) -> usize {
        self.n_nw_max + 1
    }

    /// Far-wake node rows.
    pub fn fw_node_rows(&self) -> usize {
        self.n_fw_max + 1
    }

    /// Near-wake nodes per row.
    pub fn nw_node_span(&self) -> usize {
        self.n_span + 1
    }

    /// Far-wake nodes per row.
    pub fn fw_node_span(&self) -> usize {
        self.fw_n_span + 1
    }
}

/// Per-wing wake state arrays.
#[derive(Clone, Debug)]
pub struct WingWake {
    /// Near-wake filament node positions, (n_nw_max + 1) x (n_span + 1)
    pub r_nw: AgeSpanGrid<Vec3>,
    /// Far-wake filament node positions, (n_fw_max + 1) x (fw_n_span + 1)
    pub r_fw: AgeSpanGrid<Vec3>,
    /// Near-wake panel circulation, n_nw_max x n_span
    pub gamma_nw: AgeSpanGrid<Real>,
    /// Far-wake panel circulation, n_fw_max x fw_n_span
    pub gamma_fw: AgeSpanGrid<Real>,
    /// Near-wake panel core radius, n_nw_max x n_span
    pub eps_nw: AgeSpanGrid<Real>,
    /// Far-wake panel core radius, n_fw_max x fw_n_span
    pub eps_fw: AgeSpanGrid<Real>,
}

impl WingWake {
    fn new(dims: &WakeDims) -> Self {
        let mut wing = Self {
            r_nw: AgeSpanGrid::new(dims.nw_node_rows(), dims.nw_node_span(), Vec3::zeros()),
            r_fw: AgeSpanGrid::new(dims.fw_node_rows(), dims.fw_node_span(), Vec3::zeros()),
            gamma_nw: AgeSpanGrid::new(dims.n_nw_max, dims.n_span, 0.0),
            gamma_fw: AgeSpanGrid::new(dims.n_fw_max, dims.fw_n_span, 0.0),
            eps_nw: AgeSpanGrid::new(dims.n_nw_max, dims.n_span, 0.0),
            eps_fw: AgeSpanGrid::new(dims.n_fw_max, dims.fw_n_span, 0.0),
        };
        wing.poison();
        wing
    }

    /// Debug builds fill fresh arenas with a sentinel so a read of a row
    /// that was never initialized is detectable. Release builds skip this.
    #[cfg(debug_assertions)]
    fn poison(&mut self) {
        use wf_core::POISON;
        self.r_nw.fill(Vec3::repeat(POISON));
        self.r_fw.fill(Vec3::repeat(POISON));
        // Circulation and core radius start physically zero: inactive panels
        // must contribute nothing if they are ever packed by mistake.
        self.gamma_nw.fill(0.0);
        self.gamma_fw.fill(0.0);
        self.eps_nw.fill(0.0);
        self.eps_fw.fill(0.0);
    }

    #[cfg(not(debug_assertions))]
    fn poison(&mut self) {}
}

/// Wake geometry for all wings.
#[derive(Clone, Debug)]
pub struct WakeGeometry {
    wings: Vec<WingWake>,
    dims: WakeDims,
}

impl WakeGeometry {
    pub fn new(opts: &WakeOptions) -> Self {
        let dims = WakeDims::from_options(opts);
        Self {
            wings: (0..opts.n_wings).map(|_| WingWake::new(&dims)).collect(),
            dims,
        }
    }

    pub fn dims(&self) -> &WakeDims {
        &self.dims
    }

    pub fn n_wings(&self) -> usize {
        self.wings.len()
    }

    pub fn wing(&self, iw: usize) -> &WingWake {
        &self.wings[iw]
    }

    pub fn wing_mut(&mut self, iw: usize) -> &mut WingWake {
        &mut self.wings[iw]
    }

    pub fn wings(&self) -> &[WingWake] {
        &self.wings
    }

    pub fn wings_mut(&mut self) -> &mut [WingWake] {
        &mut self.wings
    }

    /// Copy the panel circulation arrays from a geometry of identical
    /// shape (used to keep a scratch geometry in sync without
    /// reallocating).
    pub fn copy_circulation_from(&mut self, other: &WakeGeometry) {
        debug_assert_eq!(self.wings.len(), other.wings.len());
        for (dst, src) in self.wings.iter_mut().zip(&other.wings) {
            dst.gamma_nw
                .as_mut_slice()
                .copy_from_slice(src.gamma_nw.as_slice());
            dst.gamma_fw
                .as_mut_slice()
                .copy_from_slice(src.gamma_fw.as_slice());
        }
    }

    /// Shift near-wake ages by one: row k takes row k-1's nodes, panel rows
    /// likewise, freeing row 0/panel 0 for the fresh shed. Only rows up to
    /// `n_nw` (post-growth active count) are touched.
    pub fn age_near_wake(&mut self, iw: usize, n_nw: usize) {
        let wing = &mut self.wings[iw];
        for age in (1..=n_nw).rev() {
            wing.r_nw.copy_row(age - 1, age);
        }
        for age in (1..n_nw).rev() {
            wing.gamma_nw.copy_row(age - 1, age);
            wing.eps_nw.copy_row(age - 1, age);
        }
    }

    /// Shift far-wake ages by one and pull the near-wake trailing row in as
    /// the youngest far-wake row (spanwise-coarsened by the caller).
    pub fn age_far_wake(&mut self, iw: usize, n_fw: usize) {
        let wing = &mut self.wings[iw];
        for age in (1..=n_fw).rev() {
            wing.r_fw.copy_row(age - 1, age);
        }
        for age in (1..n_fw).rev() {
            wing.gamma_fw.copy_row(age - 1, age);
            wing.eps_fw.copy_row(age - 1, age);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_opts() -> WakeOptions {
        WakeOptions {
            n_wings: 2,
            n_span: 4,
            fw_n_span: 2,
            n_nw_max: 3,
            n_fw_max: 2,
            n_fw_free: 2,
            ..Default::default()
        }
    }

    #[test]
    fn node_grids_have_one_more_row_and_column_than_panel_grids() {
        let geom = WakeGeometry::new(&small_opts());
        let w = geom.wing(0);
        assert_eq!(w.r_nw.n_age(), w.gamma_nw.n_age() + 1);
        assert_eq!(w.r_nw.n_span(), w.gamma_nw.n_span() + 1);
        assert_eq!(w.r_fw.n_age(), w.gamma_fw.n_age() + 1);
        assert_eq!(w.r_fw.n_span(), w.gamma_fw.n_span() + 1);
        assert_eq!(w.eps_nw.n_age(), w.gamma_nw.n_age());
    }

    #[test]
    fn aging_shifts_rows_downstream() {
        let mut geom = WakeGeometry::new(&small_opts());
        let n_span_nodes = geom.dims().nw_node_span();
        {
            let w = geom.wing_mut(0);
            for j in 0..n_span_nodes {
                w.r_nw.set(0, j, Vec3::new(j as f64, 0.0, 0.0));
                w.r_nw.set(1, j, Vec3::new(j as f64, 1.0, 0.0));
            }
            for j in 0..w.gamma_nw.n_span() {
                w.gamma_nw.set(0, j, 5.0);
            }
        }
        geom.age_near_wake(0, 2);
        let w = geom.wing(0);
        // Row 1's old content moved to row 2; row 0's to row 1
        assert_eq!(w.r_nw.get(2, 1).y, 1.0);
        assert_eq!(w.r_nw.get(1, 1).y, 0.0);
        assert_eq!(w.gamma_nw.get(1, 0), 5.0);
    }
}
