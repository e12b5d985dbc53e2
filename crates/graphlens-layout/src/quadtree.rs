//! Barnes-Hut quadtree for O(n log n) repulsion approximation.
//!
//! The tree is rebuilt from scratch every tick into a flat, index-addressed
//! arena that keeps its allocation between builds. Each node aggregates the
//! mass (body count) and center of mass of its subtree; both are updated
//! incrementally as bodies descend during insertion.

use graphlens_core::Point;
use rand::Rng;

use crate::config::{DEFAULT_MAX_TREE_DEPTH, DEFAULT_THETA};

/// Fractional padding added around the bodies' bounding box.
const BOUNDS_PADDING: f32 = 0.05;
/// Absolute padding added on top of the fractional one.
const MIN_PADDING: f32 = 1.0;
/// Squared distances below this are treated as coincident.
const MIN_DISTANCE_SQ: f32 = 1e-6;

/// A single cell of the tree.
#[derive(Debug, Clone, Copy)]
pub struct QuadNode {
    /// Lower-left corner of the cell.
    pub min: Point,
    /// Side length of the (square) cell.
    pub size: f32,
    /// Mass-weighted mean of the bodies in this subtree.
    pub center_of_mass: Point,
    /// Number of bodies in this subtree.
    pub mass: f32,
    /// Child cell indices, by quadrant (SW, SE, NW, NE).
    pub children: [Option<u32>; 4],
    /// Body held by a leaf. Bodies folded in by the depth guard are not listed.
    pub body: Option<usize>,
}

impl QuadNode {
    fn new(min: Point, size: f32) -> Self {
        Self {
            min,
            size,
            center_of_mass: Point::ZERO,
            mass: 0.0,
            children: [None; 4],
            body: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    fn midpoint(&self) -> Point {
        Point::new(self.min.x + self.size * 0.5, self.min.y + self.size * 0.5)
    }

    fn quadrant_for(&self, point: Point) -> usize {
        let mid = self.midpoint();
        let east = point.x >= mid.x;
        let north = point.y >= mid.y;
        match (east, north) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }

    fn child_bounds(&self, quadrant: usize) -> (Point, f32) {
        let half = self.size * 0.5;
        let offset = match quadrant {
            0 => Point::new(0.0, 0.0),
            1 => Point::new(half, 0.0),
            2 => Point::new(0.0, half),
            _ => Point::new(half, half),
        };
        (self.min + offset, half)
    }

    fn contains(&self, point: Point) -> bool {
        point.x >= self.min.x
            && point.y >= self.min.y
            && point.x < self.min.x + self.size
            && point.y < self.min.y + self.size
    }

    fn accumulate(&mut self, point: Point) {
        self.mass += 1.0;
        self.center_of_mass += (point - self.center_of_mass) / self.mass;
    }
}

/// A Barnes-Hut quadtree over point bodies.
#[derive(Debug)]
pub struct QuadTree {
    nodes: Vec<QuadNode>,
    max_depth: usize,
    theta: f32,
    stack: Vec<u32>,
}

impl Default for QuadTree {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TREE_DEPTH, DEFAULT_THETA)
    }
}

impl QuadTree {
    /// Create an empty tree with the given depth guard and accuracy parameter.
    pub fn new(max_depth: usize, theta: f32) -> Self {
        Self {
            nodes: Vec::new(),
            max_depth: max_depth.max(1),
            theta: theta.max(0.0),
            stack: Vec::new(),
        }
    }

    pub fn set_theta(&mut self, theta: f32) {
        self.theta = theta.max(0.0);
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth.max(1);
    }

    pub fn theta(&self) -> f32 {
        self.theta
    }

    /// Rebuild the tree over `positions`, reusing the arena.
    ///
    /// Non-finite positions are skipped; the caller is expected to have healed them.
    pub fn build(&mut self, positions: &[Point]) {
        self.nodes.clear();

        let mut min = Point::new(f32::INFINITY, f32::INFINITY);
        let mut max = Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in positions.iter().filter(|p| p.is_finite()) {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        if !min.is_finite() || !max.is_finite() {
            return;
        }

        let span = (max.x - min.x).max(max.y - min.y);
        let padding = span * BOUNDS_PADDING + MIN_PADDING;
        let size = span + padding * 2.0;
        let center = (min + max) * 0.5;
        let root_min = center - Point::new(size * 0.5, size * 0.5);
        self.nodes.push(QuadNode::new(root_min, size));

        for (body, &point) in positions.iter().enumerate() {
            if point.is_finite() {
                self.insert(body, point, positions);
            }
        }
    }

    fn insert(&mut self, body: usize, point: Point, positions: &[Point]) {
        let mut idx = 0usize;
        let mut depth = 0usize;

        loop {
            let was_empty = self.nodes[idx].mass == 0.0;
            self.nodes[idx].accumulate(point);

            if was_empty {
                self.nodes[idx].body = Some(body);
                return;
            }

            if self.nodes[idx].is_leaf() {
                if depth >= self.max_depth {
                    // Depth guard: fold the body into this leaf's aggregate.
                    return;
                }
                if let Some(existing) = self.nodes[idx].body.take() {
                    let existing_point = positions[existing];
                    let quadrant = self.nodes[idx].quadrant_for(existing_point);
                    let child = self.child_or_create(idx, quadrant);
                    self.nodes[child].accumulate(existing_point);
                    self.nodes[child].body = Some(existing);
                } else {
                    // Leaf saturated by earlier folds; keep folding.
                    return;
                }
            }

            let quadrant = self.nodes[idx].quadrant_for(point);
            idx = self.child_or_create(idx, quadrant);
            depth += 1;
        }
    }

    fn child_or_create(&mut self, parent: usize, quadrant: usize) -> usize {
        if let Some(child) = self.nodes[parent].children[quadrant] {
            return child as usize;
        }
        let (min, size) = self.nodes[parent].child_bounds(quadrant);
        let child = self.nodes.len();
        self.nodes.push(QuadNode::new(min, size));
        self.nodes[parent].children[quadrant] = Some(child as u32);
        child
    }

    /// Root cell, if any body was inserted.
    pub fn root(&self) -> Option<&QuadNode> {
        self.nodes.first().filter(|n| n.mass > 0.0)
    }

    /// All cells in arena order.
    pub fn nodes(&self) -> &[QuadNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest cell (root = 1, empty tree = 0).
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut deepest = 0;
        let mut pending = vec![(0usize, 1usize)];
        while let Some((idx, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            for child in self.nodes[idx].children.iter().flatten() {
                pending.push((*child as usize, depth + 1));
            }
        }
        deepest
    }

    /// Approximate repulsion on `body` from every other body.
    ///
    /// Magnitude is `strength * mass / distance`, pointing away from the source.
    /// Coincident sources get a small random displacement instead of a division by zero.
    pub fn repulsion<R: Rng + ?Sized>(
        &mut self,
        body: usize,
        positions: &[Point],
        strength: f32,
        rng: &mut R,
    ) -> Point {
        let mut force = Point::ZERO;
        if self.nodes.is_empty() || strength == 0.0 {
            return force;
        }
        let point = positions[body];
        let theta_sq = self.theta * self.theta;

        self.stack.clear();
        self.stack.push(0);
        while let Some(idx) = self.stack.pop() {
            let node = &self.nodes[idx as usize];
            if node.mass == 0.0 {
                continue;
            }

            let is_leaf = node.is_leaf();
            let (mut mass, mut center) = (node.mass, node.center_of_mass);
            // Cancel self-interaction. A leaf cell containing the body holds it,
            // either as its recorded body or folded in by the depth guard.
            if is_leaf && (node.body == Some(body) || node.contains(point)) {
                if mass <= 1.0 {
                    continue;
                }
                center = (center * mass - point) / (mass - 1.0);
                mass -= 1.0;
            }

            let mut delta = point - center;
            let mut dist_sq = delta.length_squared();

            // A cell holding the body itself is always opened.
            let far = !node.contains(point) && node.size * node.size < theta_sq * dist_sq;
            if is_leaf || far {
                if dist_sq < MIN_DISTANCE_SQ {
                    delta = jitter(rng);
                    dist_sq = delta.length_squared().max(MIN_DISTANCE_SQ);
                }
                force += delta * (strength * mass / dist_sq);
            } else {
                self.stack.extend(node.children.iter().flatten().copied());
            }
        }

        force
    }
}

/// Small random displacement used to separate coincident bodies.
pub(crate) fn jitter<R: Rng + ?Sized>(rng: &mut R) -> Point {
    Point::new(rng.random_range(-0.5..0.5), rng.random_range(-0.5..0.5)) * 0.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tree_for(positions: &[Point]) -> QuadTree {
        let mut tree = QuadTree::default();
        tree.build(positions);
        tree
    }

    #[test]
    fn test_empty_tree() {
        let tree = tree_for(&[]);
        assert!(tree.root().is_none());
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn test_single_body() {
        let tree = tree_for(&[Point::new(3.0, 4.0)]);
        let root = tree.root().expect("root");
        assert_eq!(root.mass, 1.0);
        assert_eq!(root.body, Some(0));
        assert_eq!(root.center_of_mass, Point::new(3.0, 4.0));
    }

    #[test]
    fn test_mass_conservation() {
        let positions: Vec<Point> = (0..137)
            .map(|i| {
                let t = i as f32;
                Point::new((t * 13.37).sin() * 400.0, (t * 7.13).cos() * 250.0 + t)
            })
            .collect();
        let tree = tree_for(&positions);
        let root = tree.root().expect("root");

        let mean = positions.iter().fold(Point::ZERO, |acc, &p| acc + p) / positions.len() as f32;
        assert_eq!(root.mass, positions.len() as f32);
        assert!((root.center_of_mass.x - mean.x).abs() < 1e-2);
        assert!((root.center_of_mass.y - mean.y).abs() < 1e-2);

        // Every internal cell's mass equals the sum of its children.
        for node in tree.nodes() {
            if !node.is_leaf() {
                let child_mass: f32 = node
                    .children
                    .iter()
                    .flatten()
                    .map(|&c| tree.nodes()[c as usize].mass)
                    .sum();
                assert_eq!(node.mass, child_mass);
            }
        }
    }

    #[test]
    fn test_coincident_points_respect_depth_guard() {
        let positions = vec![Point::new(10.0, 10.0); 50];
        let mut tree = QuadTree::new(20, 0.8);
        tree.build(&positions);

        assert!(tree.depth() <= 21);
        assert_eq!(tree.root().expect("root").mass, 50.0);
    }

    #[test]
    fn test_arena_is_reused() {
        let mut tree = QuadTree::default();
        let positions: Vec<Point> = (0..64).map(|i| Point::new(i as f32, (i * i) as f32)).collect();
        tree.build(&positions);
        let first = tree.node_count();
        tree.build(&positions);
        assert_eq!(tree.node_count(), first);
    }

    #[test]
    fn test_exact_mode_force_symmetry() {
        let positions = vec![Point::new(0.0, 0.0), Point::new(30.0, 40.0)];
        let mut tree = QuadTree::new(20, 0.0);
        tree.build(&positions);
        let mut rng = StdRng::seed_from_u64(1);

        let a = tree.repulsion(0, &positions, 100.0, &mut rng);
        let b = tree.repulsion(1, &positions, 100.0, &mut rng);
        assert!((a.x + b.x).abs() < 1e-5);
        assert!((a.y + b.y).abs() < 1e-5);
        // Magnitude is strength / distance.
        assert!((a.length() - 100.0 / 50.0).abs() < 1e-4);
        // A is pushed away from B.
        assert!(a.x < 0.0 && a.y < 0.0);
    }

    #[test]
    fn test_coincident_bodies_get_finite_force() {
        let positions = vec![Point::new(5.0, 5.0), Point::new(5.0, 5.0)];
        let mut tree = QuadTree::default();
        tree.build(&positions);
        let mut rng = StdRng::seed_from_u64(9);

        let force = tree.repulsion(0, &positions, 10.0, &mut rng);
        assert!(force.is_finite());
        assert!(force.length() > 0.0);
    }

    #[test]
    fn test_approximation_close_to_exact() {
        let mut positions: Vec<Point> = (0..200)
            .map(|i| {
                let t = i as f32;
                Point::new((t * 1.7).sin() * 300.0, (t * 2.3).cos() * 300.0)
            })
            .collect();
        positions[0] = Point::new(2000.0, 100.0);
        let mut rng = StdRng::seed_from_u64(3);

        let mut exact = QuadTree::new(20, 0.0);
        exact.build(&positions);
        let mut approx = QuadTree::new(20, 0.8);
        approx.build(&positions);

        let far = exact.repulsion(0, &positions, 50.0, &mut rng);
        let near = approx.repulsion(0, &positions, 50.0, &mut rng);
        let error = (far - near).length() / far.length().max(1e-3);
        assert!(error < 0.25, "relative error {error}");
    }

    #[test]
    fn test_folded_body_excludes_itself() {
        // Depth 1 forces bodies 0 and 1 to share one leaf; only 0 is recorded.
        let positions = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(100.0, 100.0),
        ];
        let mut tree = QuadTree::new(1, 0.0);
        tree.build(&positions);
        let mut rng = StdRng::seed_from_u64(4);

        for body in 0..positions.len() {
            let mut exact = Point::ZERO;
            for (other, &p) in positions.iter().enumerate() {
                if other != body {
                    let delta = positions[body] - p;
                    exact += delta * (10.0 / delta.length_squared());
                }
            }
            let force = tree.repulsion(body, &positions, 10.0, &mut rng);
            assert!((force - exact).length() < 1e-4, "body {body}: {force:?} vs {exact:?}");
        }
    }
}
