//! Lifting-line paneling from blade motion.
//!
//! The external geometry provider hands over node positions, section
//! frames, chord, and structural velocities at the blade stations; the
//! lifting line keeps per-panel quantities (control point at mid-panel,
//! averaged section frame) that the circulation solve consumes. Paneling
//! is repeated at both ends of every coupling interval, so `repanel`
//! overwrites in place and never reallocates.

use crate::Vec3;
use crate::error::{AeroError, AeroResult};

/// Blade-motion input at one instant, one entry per lifting-line node.
#[derive(Clone, Debug)]
pub struct BladeMotion {
    /// Node positions along the blade axis
    pub nodes: Vec<Vec3>,
    /// Chordwise unit vector (leading edge toward trailing edge)
    pub chord_dirs: Vec<Vec3>,
    /// Section normal unit vector (suction side positive)
    pub normals: Vec<Vec3>,
    /// Chord length (m)
    pub chords: Vec<f64>,
    /// Structural velocity of the node (m/s)
    pub velocities: Vec<Vec3>,
}

impl BladeMotion {
    /// Linear interpolation between two motion snapshots, `frac` in [0, 1]
    /// (values outside extrapolate).
    pub fn interpolate(a: &Self, b: &Self, frac: f64) -> Self {
        let lerp3 = |x: &[Vec3], y: &[Vec3]| -> Vec<Vec3> {
            x.iter().zip(y).map(|(p, q)| p + frac * (q - p)).collect()
        };
        let lerp = |x: &[f64], y: &[f64]| -> Vec<f64> {
            x.iter().zip(y).map(|(p, q)| p + frac * (q - p)).collect()
        };
        Self {
            nodes: lerp3(&a.nodes, &b.nodes),
            chord_dirs: lerp3(&a.chord_dirs, &b.chord_dirs)
                .into_iter()
                .map(|v| v.normalize())
                .collect(),
            normals: lerp3(&a.normals, &b.normals)
                .into_iter()
                .map(|v| v.normalize())
                .collect(),
            chords: lerp(&a.chords, &b.chords),
            velocities: lerp3(&a.velocities, &b.velocities),
        }
    }

    fn check(&self, n_nodes: usize) -> AeroResult<()> {
        for (what, len) in [
            ("blade motion nodes", self.nodes.len()),
            ("blade motion chord_dirs", self.chord_dirs.len()),
            ("blade motion normals", self.normals.len()),
            ("blade motion chords", self.chords.len()),
            ("blade motion velocities", self.velocities.len()),
        ] {
            if len != n_nodes {
                return Err(AeroError::MismatchedLengths {
                    what,
                    expected: n_nodes,
                    got: len,
                });
            }
        }
        Ok(())
    }
}

/// Paneled lifting line for one wing.
#[derive(Clone, Debug)]
pub struct LiftingLine {
    /// Node positions, `n_span + 1`
    pub nodes: Vec<Vec3>,
    /// Panel control points (mid-panel), `n_span`
    pub cp: Vec<Vec3>,
    /// Panel chord (m)
    pub chord: Vec<f64>,
    /// Panel chordwise unit vector
    pub chord_dir: Vec<Vec3>,
    /// Panel normal unit vector
    pub normal: Vec<Vec3>,
    /// Structural velocity at the control point
    pub cp_vel: Vec<Vec3>,
    /// Airfoil polar table index per panel
    pub polar_index: Vec<usize>,
}

impl LiftingLine {
    /// An unpaneled lifting line with `n_span` panels; call `repanel`
    /// before first use.
    pub fn new(n_span: usize, polar_index: Vec<usize>) -> AeroResult<Self> {
        if n_span == 0 {
            return Err(AeroError::InvalidArg {
                what: "lifting line needs at least one span panel",
            });
        }
        if polar_index.len() != n_span {
            return Err(AeroError::MismatchedLengths {
                what: "polar_index",
                expected: n_span,
                got: polar_index.len(),
            });
        }
        Ok(Self {
            nodes: vec![Vec3::zeros(); n_span + 1],
            cp: vec![Vec3::zeros(); n_span],
            chord: vec![0.0; n_span],
            chord_dir: vec![Vec3::x(); n_span],
            normal: vec![Vec3::z(); n_span],
            cp_vel: vec![Vec3::zeros(); n_span],
            polar_index,
        })
    }

    pub fn n_span(&self) -> usize {
        self.cp.len()
    }

    /// Recompute panel quantities from a motion snapshot.
    pub fn repanel(&mut self, motion: &BladeMotion) -> AeroResult<()> {
        let n_nodes = self.nodes.len();
        motion.check(n_nodes)?;

        self.nodes.copy_from_slice(&motion.nodes);
        for j in 0..self.n_span() {
            self.cp[j] = 0.5 * (motion.nodes[j] + motion.nodes[j + 1]);
            self.chord[j] = 0.5 * (motion.chords[j] + motion.chords[j + 1]);
            self.chord_dir[j] = (motion.chord_dirs[j] + motion.chord_dirs[j + 1]).normalize();
            self.normal[j] = (motion.normals[j] + motion.normals[j + 1]).normalize();
            self.cp_vel[j] = 0.5 * (motion.velocities[j] + motion.velocities[j + 1]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_motion(n_nodes: usize, y_shift: f64) -> BladeMotion {
        BladeMotion {
            nodes: (0..n_nodes)
                .map(|i| Vec3::new(0.0, i as f64 + y_shift, 0.0))
                .collect(),
            chord_dirs: vec![Vec3::x(); n_nodes],
            normals: vec![Vec3::z(); n_nodes],
            chords: vec![1.0; n_nodes],
            velocities: vec![Vec3::zeros(); n_nodes],
        }
    }

    #[test]
    fn repanel_places_control_points_mid_panel() {
        let mut ll = LiftingLine::new(3, vec![0; 3]).unwrap();
        ll.repanel(&straight_motion(4, 0.0)).unwrap();
        assert_eq!(ll.cp[0], Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(ll.cp[2], Vec3::new(0.0, 2.5, 0.0));
        assert_eq!(ll.chord[1], 1.0);
    }

    #[test]
    fn repanel_rejects_wrong_node_count() {
        let mut ll = LiftingLine::new(3, vec![0; 3]).unwrap();
        let err = ll.repanel(&straight_motion(5, 0.0)).unwrap_err();
        assert!(matches!(err, AeroError::MismatchedLengths { .. }));
    }

    #[test]
    fn interpolation_is_linear_in_positions() {
        let a = straight_motion(3, 0.0);
        let b = straight_motion(3, 1.0);
        let mid = BladeMotion::interpolate(&a, &b, 0.25);
        assert!((mid.nodes[0].y - 0.25).abs() < 1e-15);
        // frac beyond 1 extrapolates
        let beyond = BladeMotion::interpolate(&a, &b, 2.0);
        assert!((beyond.nodes[0].y - 2.0).abs() < 1e-15);
    }
}
