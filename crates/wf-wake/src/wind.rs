//! Ambient-wind sample bookkeeping.
//!
//! The solver never queries a wind field directly: it publishes the flat
//! list of points it needs wind at (control points, active wake nodes,
//! optional output-grid points), and the external provider returns one
//! velocity per point in exactly that order. This module owns the
//! per-node storage and the order contract between the two calls.

use wf_core::WakeOptions;

use crate::Vec3;
use crate::error::{WakeError, WakeResult};
use crate::geometry::WakeGeometry;
use crate::grid::AgeSpanGrid;

/// Ambient wind distributed onto every solver evaluation point.
#[derive(Clone, Debug)]
pub struct WindSamples {
    /// Wind at lifting-line control points, one per span panel per wing
    pub ll: Vec<Vec<Vec3>>,
    /// Wind at near-wake nodes (full-capacity grids, active rows valid)
    pub nw: Vec<AgeSpanGrid<Vec3>>,
    /// Wind at far-wake nodes
    pub fw: Vec<AgeSpanGrid<Vec3>>,
    /// Wind at the caller-configured output grid points
    pub grid: Vec<Vec3>,
    /// Extra output-grid query positions (diagnostics only)
    grid_points: Vec<Vec3>,
}

impl WindSamples {
    pub fn new(opts: &WakeOptions, grid_points: Vec<Vec3>) -> Self {
        let n_grid = grid_points.len();
        Self {
            ll: vec![vec![Vec3::zeros(); opts.n_span]; opts.n_wings],
            nw: (0..opts.n_wings)
                .map(|_| AgeSpanGrid::new(opts.n_nw_max + 1, opts.n_span + 1, Vec3::zeros()))
                .collect(),
            fw: (0..opts.n_wings)
                .map(|_| AgeSpanGrid::new(opts.n_fw_max + 1, opts.fw_n_span + 1, Vec3::zeros()))
                .collect(),
            grid: vec![Vec3::zeros(); n_grid],
            grid_points,
        }
    }

    /// Extra diagnostic query positions configured at construction.
    pub fn grid_points(&self) -> &[Vec3] {
        &self.grid_points
    }

    /// Set the same wind vector everywhere (uniform inflow).
    pub fn set_uniform(&mut self, v: Vec3) {
        for w in &mut self.ll {
            w.fill(v);
        }
        for g in &mut self.nw {
            g.fill(v);
        }
        for g in &mut self.fw {
            g.fill(v);
        }
        self.grid.fill(v);
    }

    /// Points the external wind provider must evaluate for the current
    /// wake extent, in the order `ingest` expects them back.
    pub fn request_points(
        &self,
        geom: &WakeGeometry,
        ll_cp: &[Vec<Vec3>],
        n_nw: usize,
        n_fw: usize,
    ) -> Vec<Vec3> {
        let mut pts = Vec::new();
        for wing_cp in ll_cp {
            pts.extend_from_slice(wing_cp);
        }
        for iw in 0..geom.n_wings() {
            for age in 0..=n_nw {
                pts.extend_from_slice(geom.wing(iw).r_nw.row(age));
            }
        }
        if n_fw > 0 {
            for iw in 0..geom.n_wings() {
                for age in 0..=n_fw {
                    pts.extend_from_slice(geom.wing(iw).r_fw.row(age));
                }
            }
        }
        pts.extend_from_slice(&self.grid_points);
        pts
    }

    /// Distribute provider results onto the internal per-node arrays.
    /// `velocities` must match the last `request_points` call exactly.
    pub fn ingest(
        &mut self,
        n_nw: usize,
        n_fw: usize,
        velocities: &[Vec3],
    ) -> WakeResult<()> {
        let mut k = 0;
        let mut take = |k: &mut usize| -> WakeResult<Vec3> {
            let v = velocities.get(*k).copied().ok_or(WakeError::Invariant {
                what: "wind provider returned fewer samples than requested",
            })?;
            *k += 1;
            Ok(v)
        };

        for wing in &mut self.ll {
            for v in wing.iter_mut() {
                *v = take(&mut k)?;
            }
        }
        for g in &mut self.nw {
            for age in 0..=n_nw {
                for v in g.row_mut(age) {
                    *v = take(&mut k)?;
                }
            }
        }
        if n_fw > 0 {
            for g in &mut self.fw {
                for age in 0..=n_fw {
                    for v in g.row_mut(age) {
                        *v = take(&mut k)?;
                    }
                }
            }
        }
        for v in &mut self.grid {
            *v = take(&mut k)?;
        }

        if k != velocities.len() {
            return Err(WakeError::Invariant {
                what: "wind provider returned more samples than requested",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> WakeOptions {
        WakeOptions {
            n_wings: 1,
            n_span: 2,
            fw_n_span: 1,
            n_nw_max: 2,
            n_fw_max: 1,
            n_fw_free: 1,
            ..Default::default()
        }
    }

    fn filled_geometry(o: &WakeOptions) -> WakeGeometry {
        let mut geom = WakeGeometry::new(o);
        for iw in 0..geom.n_wings() {
            let wing = geom.wing_mut(iw);
            for age in 0..wing.r_nw.n_age() {
                for j in 0..wing.r_nw.n_span() {
                    wing.r_nw.set(age, j, Vec3::new(age as f64, j as f64, 0.0));
                }
            }
            for age in 0..wing.r_fw.n_age() {
                for j in 0..wing.r_fw.n_span() {
                    wing.r_fw.set(age, j, Vec3::new(100.0 + age as f64, j as f64, 0.0));
                }
            }
        }
        geom
    }

    #[test]
    fn request_and_ingest_round_trip() {
        let o = opts();
        let geom = filled_geometry(&o);
        let mut wind = WindSamples::new(&o, vec![Vec3::new(50.0, 0.0, 0.0)]);
        let ll_cp = vec![vec![Vec3::zeros(); o.n_span]];

        let pts = wind.request_points(&geom, &ll_cp, 1, 1);
        // 2 CPs + NW rows 0..=1 (2*3 nodes) + FW rows 0..=1 (2*2 nodes) + 1 grid
        assert_eq!(pts.len(), 2 + 6 + 4 + 1);

        // Provider echoes positions as velocities; check they land in order
        wind.ingest(1, 1, &pts).unwrap();
        assert_eq!(wind.nw[0].get(1, 2), Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(wind.fw[0].get(1, 1), Vec3::new(101.0, 1.0, 0.0));
        assert_eq!(wind.grid[0], Vec3::new(50.0, 0.0, 0.0));
    }

    #[test]
    fn sample_count_mismatch_is_an_error() {
        let o = opts();
        let geom = filled_geometry(&o);
        let mut wind = WindSamples::new(&o, vec![]);
        let ll_cp = vec![vec![Vec3::zeros(); o.n_span]];
        let pts = wind.request_points(&geom, &ll_cp, 1, 0);

        assert!(wind.ingest(1, 0, &pts[..pts.len() - 1]).is_err());

        let mut extra = pts.clone();
        extra.push(Vec3::zeros());
        assert!(wind.ingest(1, 0, &extra).is_err());
    }

    #[test]
    fn uniform_fill_reaches_every_array() {
        let o = opts();
        let mut wind = WindSamples::new(&o, vec![Vec3::zeros()]);
        let v = Vec3::new(10.0, 0.0, 0.0);
        wind.set_uniform(v);
        assert_eq!(wind.ll[0][1], v);
        assert_eq!(wind.nw[0].get(2, 2), v);
        assert_eq!(wind.fw[0].get(1, 1), v);
        assert_eq!(wind.grid[0], v);
    }
}
