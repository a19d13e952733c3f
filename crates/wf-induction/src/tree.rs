//! Barnes-Hut style octree over vortex segments.
//!
//! Distant cells contribute through a single vortex-particle aggregate (the
//! circulation-weighted moment of their segments) instead of segment by
//! segment; near cells descend until the leaf segments are evaluated with
//! the exact kernel. The approximation is controlled by the branch-opening
//! ratio: a cell is "far enough" when `size / distance < branch_ratio`.

use std::f64::consts::PI;

use wf_core::RegFunction;

use crate::Vec3;
use crate::kernel::segment_velocity;
use crate::segments::SegmentBuffer;

/// Segments per leaf before a cell is subdivided.
const LEAF_CAPACITY: usize = 8;

/// Maximum subdivision depth; past this everything stays in one leaf.
const MAX_DEPTH: usize = 24;

struct Cell {
    center: Vec3,
    half_size: f64,
    /// Circulation-weighted segment moment: sum of gamma * (p1 - p0)
    moment: Vec3,
    /// |gamma| * length weighted centroid of the member segments
    centroid: Vec3,
    /// Mean core radius of the member segments (weighted)
    eps: f64,
    children: [Option<usize>; 8],
    /// Segment indices held directly (leaves only)
    segs: Vec<usize>,
    /// Total |gamma| * length of the subtree, filled during aggregation
    weight_cache: f64,
}

/// Octree over the active segments of a buffer.
pub struct SegmentTree {
    cells: Vec<Cell>,
    root: usize,
}

impl SegmentTree {
    /// Build a tree over all active segments (midpoint-sorted).
    pub fn build(segments: &SegmentBuffer) -> Self {
        let n = segments.n_active();
        debug_assert!(n > 0);

        // Cubic root cell around all midpoints
        let mut lo = Vec3::repeat(f64::INFINITY);
        let mut hi = Vec3::repeat(f64::NEG_INFINITY);
        for i in 0..n {
            let m = midpoint(segments, i);
            lo = lo.inf(&m);
            hi = hi.sup(&m);
        }
        let center = 0.5 * (lo + hi);
        let half_size = 0.5 * (hi - lo).amax().max(1e-6) * 1.0001;

        let mut tree = Self {
            cells: vec![Cell::empty(center, half_size)],
            root: 0,
        };
        for i in 0..n {
            tree.insert(tree.root, i, 0, segments);
        }
        tree.aggregate(tree.root, segments);
        tree
    }

    fn insert(&mut self, cell: usize, seg: usize, depth: usize, segments: &SegmentBuffer) {
        let is_leaf = self.cells[cell].children.iter().all(Option::is_none);
        if is_leaf && (self.cells[cell].segs.len() < LEAF_CAPACITY || depth >= MAX_DEPTH) {
            self.cells[cell].segs.push(seg);
            return;
        }
        if is_leaf {
            // Split: push existing members down
            let members = std::mem::take(&mut self.cells[cell].segs);
            for m in members {
                let child = self.child_for(cell, midpoint(segments, m));
                self.insert(child, m, depth + 1, segments);
            }
        }
        let child = self.child_for(cell, midpoint(segments, seg));
        self.insert(child, seg, depth + 1, segments);
    }

    /// Child cell index for a position, creating the octant on demand.
    fn child_for(&mut self, cell: usize, p: Vec3) -> usize {
        let c = self.cells[cell].center;
        let octant = (usize::from(p.x >= c.x)) | (usize::from(p.y >= c.y) << 1) | (usize::from(p.z >= c.z) << 2);
        if let Some(idx) = self.cells[cell].children[octant] {
            return idx;
        }
        let h = 0.5 * self.cells[cell].half_size;
        let offset = Vec3::new(
            if octant & 1 != 0 { h } else { -h },
            if octant & 2 != 0 { h } else { -h },
            if octant & 4 != 0 { h } else { -h },
        );
        let child = Cell::empty(c + offset, h);
        self.cells.push(child);
        let idx = self.cells.len() - 1;
        self.cells[cell].children[octant] = Some(idx);
        idx
    }

    /// Bottom-up moment, centroid, and mean core radius per cell.
    fn aggregate(&mut self, cell: usize, segments: &SegmentBuffer) {
        let children = self.cells[cell].children;
        let mut moment = Vec3::zeros();
        let mut centroid = Vec3::zeros();
        let mut eps_acc = 0.0;
        let mut weight = 0.0;

        for &seg in &self.cells[cell].segs {
            let (p0, p1) = segments.endpoints(seg);
            let gamma = segments.gamma(seg);
            let w = gamma.abs() * (p1 - p0).norm();
            moment += gamma * (p1 - p0);
            centroid += w * 0.5 * (p0 + p1);
            eps_acc += w * segments.epsilon(seg);
            weight += w;
        }
        for child in children.into_iter().flatten() {
            self.aggregate(child, segments);
            let c = &self.cells[child];
            let w = c.weight();
            moment += c.moment;
            centroid += w * c.centroid;
            eps_acc += w * c.eps;
            weight += w;
        }

        let cell = &mut self.cells[cell];
        cell.moment = moment;
        if weight > 0.0 {
            cell.centroid = centroid / weight;
            cell.eps = eps_acc / weight;
        } else {
            cell.centroid = cell.center;
        }
        cell.weight_cache = weight;
    }

    /// Induced velocity at `x` with the given branch-opening ratio.
    pub fn velocity_at(
        &self,
        segments: &SegmentBuffer,
        reg: RegFunction,
        branch_ratio: f64,
        x: Vec3,
    ) -> Vec3 {
        self.cell_velocity(self.root, segments, reg, branch_ratio, x)
    }

    fn cell_velocity(
        &self,
        cell: usize,
        segments: &SegmentBuffer,
        reg: RegFunction,
        branch_ratio: f64,
        x: Vec3,
    ) -> Vec3 {
        let c = &self.cells[cell];
        let r = x - c.centroid;
        let dist = r.norm();
        let size = 2.0 * c.half_size;

        // Far cell: single vortex-particle aggregate
        if dist > 0.0 && size / dist < branch_ratio {
            let d_sq = dist * dist + c.eps * c.eps;
            return c.moment.cross(&r) / (4.0 * PI * d_sq * d_sq.sqrt());
        }

        let mut v = Vec3::zeros();
        for &seg in &c.segs {
            let (p0, p1) = segments.endpoints(seg);
            v += segment_velocity(p0, p1, segments.gamma(seg), segments.epsilon(seg), x, reg);
        }
        for child in c.children.into_iter().flatten() {
            v += self.cell_velocity(child, segments, reg, branch_ratio, x);
        }
        v
    }
}

impl Cell {
    fn empty(center: Vec3, half_size: f64) -> Self {
        Self {
            center,
            half_size,
            moment: Vec3::zeros(),
            centroid: center,
            eps: 0.0,
            children: [None; 8],
            segs: Vec::new(),
            weight_cache: 0.0,
        }
    }

    fn weight(&self) -> f64 {
        self.weight_cache
    }
}

fn midpoint(segments: &SegmentBuffer, i: usize) -> Vec3 {
    let (p0, p1) = segments.endpoints(i);
    0.5 * (p0 + p1)
}
