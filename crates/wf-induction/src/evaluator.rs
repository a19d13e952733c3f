//! Induction evaluation over a packed segment buffer.
//!
//! Evaluation points are independent, so the point loop is the one
//! sanctioned parallel region in the solver: read-only segment data,
//! write-disjoint output slots.

use rayon::prelude::*;
use tracing::debug;
use wf_core::{InductionAccel, RegFunction};

use crate::Vec3;
use crate::error::{InductionError, InductionResult};
use crate::kernel::segment_velocity;
use crate::segments::SegmentBuffer;
use crate::tree::SegmentTree;

/// Below this point count the rayon dispatch overhead is not worth it.
const PAR_THRESHOLD: usize = 64;

/// Direct O(segments x points) Biot-Savart summation.
///
/// Adds the induced velocity of every active segment to `out[i]` for each
/// `points[i]`; `out` is overwritten, not accumulated into.
pub fn induced_velocities_dense(
    segments: &SegmentBuffer,
    reg: RegFunction,
    points: &[Vec3],
    out: &mut [Vec3],
) -> InductionResult<()> {
    if points.len() != out.len() {
        return Err(InductionError::MismatchedLengths {
            what: "induction output",
            expected: points.len(),
            got: out.len(),
        });
    }

    let eval = |x: &Vec3| -> Vec3 {
        let mut v = Vec3::zeros();
        for (p0, p1, gamma, eps) in segments.iter_active() {
            v += segment_velocity(p0, p1, gamma, eps, *x, reg);
        }
        v
    };

    if points.len() >= PAR_THRESHOLD {
        out.par_iter_mut()
            .zip(points.par_iter())
            .for_each(|(o, x)| *o = eval(x));
    } else {
        for (o, x) in out.iter_mut().zip(points.iter()) {
            *o = eval(x);
        }
    }
    Ok(())
}

/// Evaluate induced velocities with the configured acceleration strategy.
pub fn induced_velocities(
    segments: &SegmentBuffer,
    reg: RegFunction,
    accel: InductionAccel,
    points: &[Vec3],
    out: &mut [Vec3],
) -> InductionResult<()> {
    match accel {
        InductionAccel::Dense => induced_velocities_dense(segments, reg, points, out),
        InductionAccel::Tree { branch_ratio } => {
            if segments.is_empty() {
                out.fill(Vec3::zeros());
                return Ok(());
            }
            let tree = SegmentTree::build(segments);
            debug!(
                segments = segments.n_active(),
                points = points.len(),
                branch_ratio,
                "tree induction"
            );
            if points.len() != out.len() {
                return Err(InductionError::MismatchedLengths {
                    what: "induction output",
                    expected: points.len(),
                    got: out.len(),
                });
            }
            if points.len() >= PAR_THRESHOLD {
                out.par_iter_mut()
                    .zip(points.par_iter())
                    .for_each(|(o, x)| *o = tree.velocity_at(segments, reg, branch_ratio, *x));
            } else {
                for (o, x) in out.iter_mut().zip(points.iter()) {
                    *o = tree.velocity_at(segments, reg, branch_ratio, *x);
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_segment_buffer() -> SegmentBuffer {
        let mut buf = SegmentBuffer::with_capacity(2, 4);
        let a = buf.push_point(Vec3::new(0.0, -1.0, 0.0)).unwrap();
        let b = buf.push_point(Vec3::new(0.0, 0.0, 0.0)).unwrap();
        let c = buf.push_point(Vec3::new(0.0, 1.0, 0.0)).unwrap();
        buf.push_segment(a, b, 1.0, 0.05).unwrap();
        buf.push_segment(b, c, 1.0, 0.05).unwrap();
        buf
    }

    #[test]
    fn dense_sums_both_segments() {
        let buf = two_segment_buffer();
        let x = Vec3::new(1.0, 0.0, 0.0);
        let points = [x];
        let mut out = [Vec3::zeros()];
        induced_velocities_dense(&buf, RegFunction::None, &points, &mut out).unwrap();

        let (p0, p1) = buf.endpoints(0);
        let (q0, q1) = buf.endpoints(1);
        let direct = segment_velocity(p0, p1, 1.0, 0.05, x, RegFunction::None)
            + segment_velocity(q0, q1, 1.0, 0.05, x, RegFunction::None);
        assert!((out[0] - direct).norm() < 1e-14);
    }

    #[test]
    fn output_length_mismatch_is_an_error() {
        let buf = two_segment_buffer();
        let points = [Vec3::zeros(); 2];
        let mut out = [Vec3::zeros(); 1];
        let err = induced_velocities_dense(&buf, RegFunction::None, &points, &mut out).unwrap_err();
        assert!(matches!(err, InductionError::MismatchedLengths { .. }));
    }

    #[test]
    fn empty_buffer_induces_nothing() {
        let buf = SegmentBuffer::with_capacity(8, 8);
        let points = [Vec3::new(1.0, 2.0, 3.0)];
        let mut out = [Vec3::x()];
        induced_velocities_dense(&buf, RegFunction::LambOseen, &points, &mut out).unwrap();
        assert_eq!(out[0], Vec3::zeros());
    }
}
