//! Flattening of the structured wake into the induction segment buffer.
//!
//! Spanwise vortex segments are emitted for every active age row of the
//! near and far wake plus the bound lifting-line row, per wing. With the
//! ground model on, every real segment gets a mirrored twin (geometry
//! reflected about the ground plane, circulation negated) so the combined
//! field satisfies no-penetration at the ground.

use tracing::debug;
use wf_core::WakeOptions;
use wf_induction::SegmentBuffer;

use crate::Vec3;
use crate::error::WakeResult;
use crate::geometry::WakeGeometry;

/// Worst-case (segments, points) a buffer must hold for `opts`, for one
/// fully grown wake including bound segments, doubled under mirroring.
/// This bound is established once at initialization; exceeding it at pack
/// time is a fatal internal-consistency error.
pub fn segment_capacity(opts: &WakeOptions) -> (usize, usize) {
    let per_wing_segs =
        opts.n_span * (opts.n_nw_max + 1) // bound row + NW rows 1..=max
        + opts.fw_n_span * opts.n_fw_max;
    let per_wing_pts = (opts.n_nw_max + 1) * (opts.n_span + 1) + opts.n_fw_max * (opts.fw_n_span + 1);

    let mut segs = opts.n_wings * per_wing_segs;
    let mut pts = opts.n_wings * per_wing_pts;
    if opts.ground_effect {
        segs *= 2;
        pts *= 2;
    }
    (segs, pts)
}

/// What the packer should include.
#[derive(Clone, Copy, Debug)]
pub struct PackSelection {
    /// Include the bound lifting-line segments (age-0 row). Wake
    /// self-induction for convection excludes them; reported induced
    /// velocity includes them.
    pub include_bound: bool,
    /// Active near-wake panel rows
    pub n_nw: usize,
    /// Active far-wake panel rows
    pub n_fw: usize,
}

/// Mirror plane for the ground model.
#[derive(Clone, Copy, Debug)]
pub struct GroundMirror {
    pub z: f64,
}

impl GroundMirror {
    fn reflect(&self, p: Vec3) -> Vec3 {
        Vec3::new(p.x, p.y, 2.0 * self.z - p.z)
    }
}

/// Pack all selected wake rows of every wing into `buf`.
///
/// `gamma_ll` is the current lifting-line circulation (one entry per
/// near-wake span panel per wing) used for the bound segments; `eps_ll`
/// the matching core radii. Both are read only when `include_bound` is
/// set.
pub fn pack_segments(
    geom: &WakeGeometry,
    gamma_ll: &[Vec<f64>],
    eps_ll: &[Vec<f64>],
    sel: PackSelection,
    mirror: Option<GroundMirror>,
    buf: &mut SegmentBuffer,
) -> WakeResult<()> {
    buf.clear();

    for iw in 0..geom.n_wings() {
        let wing = geom.wing(iw);

        // Near wake: node rows 0..=n_nw. Row 0 is the lifting line; its
        // spanwise segments are the bound vortex and are only emitted when
        // requested.
        for age in 0..=sel.n_nw {
            if age == 0 && !sel.include_bound {
                continue;
            }
            let row = wing.r_nw.row(age);
            let mut idx = Vec::with_capacity(row.len());
            for &p in row {
                idx.push(buf.push_point(p)?);
            }
            for j in 0..row.len() - 1 {
                let (gamma, eps) = if age == 0 {
                    (gamma_ll[iw][j], eps_ll[iw][j])
                } else {
                    (wing.gamma_nw.get(age - 1, j), wing.eps_nw.get(age - 1, j))
                };
                buf.push_segment(idx[j], idx[j + 1], gamma, eps)?;
            }
        }

        // Far wake: node rows 1..=n_fw carry panel (age-1) strength. Row 0
        // duplicates the near-wake trailing row and emits nothing itself.
        for age in 1..=sel.n_fw {
            let row = wing.r_fw.row(age);
            let mut idx = Vec::with_capacity(row.len());
            for &p in row {
                idx.push(buf.push_point(p)?);
            }
            for j in 0..row.len() - 1 {
                buf.push_segment(
                    idx[j],
                    idx[j + 1],
                    wing.gamma_fw.get(age - 1, j),
                    wing.eps_fw.get(age - 1, j),
                )?;
            }
        }
    }

    // Mirrored images of everything packed so far
    if let Some(mirror) = mirror {
        let n_seg = buf.n_active();
        for i in 0..n_seg {
            let (p0, p1) = buf.endpoints(i);
            let gamma = buf.gamma(i);
            let eps = buf.epsilon(i);
            let m0 = buf.push_point(mirror.reflect(p0))?;
            let m1 = buf.push_point(mirror.reflect(p1))?;
            buf.push_segment(m0, m1, -gamma, eps)?;
        }
    }

    debug!(
        segments = buf.n_active(),
        points = buf.n_active_points(),
        "wake packed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use wf_core::WakeOptions;

    fn opts(n_wings: usize, n_span: usize, fw_n_span: usize, nw: usize, fw: usize) -> WakeOptions {
        WakeOptions {
            n_wings,
            n_span,
            fw_n_span,
            n_nw_max: nw,
            n_fw_max: fw,
            n_fw_free: fw,
            ..Default::default()
        }
    }

    fn zero_ll(opts: &WakeOptions) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        (
            vec![vec![0.0; opts.n_span]; opts.n_wings],
            vec![vec![0.1; opts.n_span]; opts.n_wings],
        )
    }

    /// Fill node rows so poisoned values never reach the packer.
    fn init_geometry(geom: &mut WakeGeometry, n_nw: usize, n_fw: usize) {
        let nw_span = geom.dims().nw_node_span();
        let fw_span = geom.dims().fw_node_span();
        for iw in 0..geom.n_wings() {
            let wing = geom.wing_mut(iw);
            for age in 0..=n_nw {
                for j in 0..nw_span {
                    wing.r_nw.set(age, j, Vec3::new(age as f64, j as f64, 1.0));
                }
            }
            for age in 0..=n_fw {
                for j in 0..fw_span {
                    wing.r_fw.set(age, j, Vec3::new(10.0 + age as f64, j as f64, 1.0));
                }
            }
        }
    }

    #[test]
    fn segment_count_matches_active_rows() {
        let o = opts(2, 4, 2, 5, 3);
        let mut geom = WakeGeometry::new(&o);
        init_geometry(&mut geom, 3, 2);
        let (gamma_ll, eps_ll) = zero_ll(&o);
        let (cap_s, cap_p) = segment_capacity(&o);
        let mut buf = SegmentBuffer::with_capacity(cap_s, cap_p);

        let sel = PackSelection {
            include_bound: true,
            n_nw: 3,
            n_fw: 2,
        };
        pack_segments(&geom, &gamma_ll, &eps_ll, sel, None, &mut buf).unwrap();

        // Per wing: bound 4 + NW 3*4 + FW 2*2 = 20
        assert_eq!(buf.n_active(), 2 * 20);
    }

    #[test]
    fn excluding_bound_drops_one_row_per_wing() {
        let o = opts(1, 4, 2, 5, 3);
        let mut geom = WakeGeometry::new(&o);
        init_geometry(&mut geom, 2, 0);
        let (gamma_ll, eps_ll) = zero_ll(&o);
        let (cap_s, cap_p) = segment_capacity(&o);
        let mut buf = SegmentBuffer::with_capacity(cap_s, cap_p);

        let with_bound = PackSelection {
            include_bound: true,
            n_nw: 2,
            n_fw: 0,
        };
        pack_segments(&geom, &gamma_ll, &eps_ll, with_bound, None, &mut buf).unwrap();
        let n_with = buf.n_active();

        let without_bound = PackSelection {
            include_bound: false,
            ..with_bound
        };
        pack_segments(&geom, &gamma_ll, &eps_ll, without_bound, None, &mut buf).unwrap();
        assert_eq!(buf.n_active(), n_with - o.n_span);
    }

    #[test]
    fn mirroring_doubles_counts_and_negates_circulation() {
        let o = WakeOptions {
            ground_effect: true,
            ground_z: 0.0,
            ..opts(1, 3, 2, 4, 2)
        };
        let mut geom = WakeGeometry::new(&o);
        init_geometry(&mut geom, 2, 1);
        let mut gamma_ll = vec![vec![1.5; o.n_span]];
        gamma_ll[0][0] = -0.5;
        let eps_ll = vec![vec![0.1; o.n_span]];
        let (cap_s, cap_p) = segment_capacity(&o);
        let mut buf = SegmentBuffer::with_capacity(cap_s, cap_p);

        let sel = PackSelection {
            include_bound: true,
            n_nw: 2,
            n_fw: 1,
        };
        pack_segments(&geom, &gamma_ll, &eps_ll, sel, None, &mut buf).unwrap();
        let unmirrored = buf.n_active();

        pack_segments(
            &geom,
            &gamma_ll,
            &eps_ll,
            sel,
            Some(GroundMirror { z: 0.0 }),
            &mut buf,
        )
        .unwrap();
        assert_eq!(buf.n_active(), 2 * unmirrored);

        // Image of segment i is segment unmirrored + i: reflected z, -gamma
        for i in 0..unmirrored {
            let (p0, _) = buf.endpoints(i);
            let (m0, _) = buf.endpoints(unmirrored + i);
            assert_eq!(m0.z, -p0.z);
            assert_eq!(buf.gamma(unmirrored + i), -buf.gamma(i));
        }
    }

    proptest! {
        /// Capacity computed at initialization holds for every valid
        /// active-count combination, mirrored or not.
        #[test]
        fn capacity_bound_is_never_exceeded(
            n_wings in 1usize..4,
            n_span in 1usize..8,
            fw_ratio in 1usize..8,
            n_nw_max in 1usize..6,
            n_fw_max in 0usize..5,
            ground in any::<bool>(),
        ) {
            let fw_n_span = fw_ratio.min(n_span);
            let o = WakeOptions {
                ground_effect: ground,
                ..opts(n_wings, n_span, fw_n_span, n_nw_max, n_fw_max)
            };
            let (cap_s, cap_p) = segment_capacity(&o);
            let mut buf = SegmentBuffer::with_capacity(cap_s, cap_p);
            let (gamma_ll, eps_ll) = zero_ll(&o);
            let mut geom = WakeGeometry::new(&o);
            init_geometry(&mut geom, n_nw_max, n_fw_max);

            let mirror = ground.then_some(GroundMirror { z: 0.0 });
            for n_nw in 0..=n_nw_max {
                for n_fw in 0..=n_fw_max {
                    let sel = PackSelection { include_bound: true, n_nw, n_fw };
                    pack_segments(&geom, &gamma_ll, &eps_ll, sel, mirror, &mut buf).unwrap();
                    prop_assert!(buf.n_active() <= cap_s);
                    prop_assert!(buf.n_active_points() <= cap_p);
                }
            }
        }
    }
}
