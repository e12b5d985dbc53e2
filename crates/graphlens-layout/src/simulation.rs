//! Incremental force-directed simulation.
//!
//! Every node gets a dense [`NodeIndex`] into a flat state arena when it joins
//! the simulation; identifiers are only resolved at the API boundary. One tick
//! composes Barnes-Hut repulsion, optional class repulsion, hub-aware springs,
//! center gravity, grid collisions and an optional timeline axis, then
//! integrates damped velocities under an annealed temperature (alpha).

use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;

use graphlens_core::{GraphEdge, NodeId, NodeIndex, Point, Viewport};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::collision::CollisionGrid;
use crate::quadtree::{jitter, QuadTree};
use crate::{LayoutError, Result, SimulationConfig};

/// Seed circle radius per square root of the node count.
const SEED_RADIUS_PER_SQRT_NODE: f32 = 12.0;
/// Spread of re-seeded points around the viewport center.
const HEAL_SPREAD: f32 = 20.0;
/// Growth of the ideal edge length per square root of extra degree.
const HUB_GROWTH: f32 = 0.35;
/// Distances below this are replaced by a random displacement.
const MIN_DISTANCE: f32 = 1e-3;
/// Warmup budget per natural log of the node count.
const WARMUP_PER_LOG_NODE: f32 = 40.0;
/// Upper bound on warmup iterations.
const MAX_WARMUP_ITERATIONS: u32 = 300;

const INACTIVE: u32 = u32::MAX;

/// Per-node simulation state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodePosition {
    pub position: Point,
    pub velocity: Point,
    pub pinned: bool,
}

/// Direction of a timeline axis line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisOrientation {
    /// Members are pulled onto the line `y = coordinate`.
    #[default]
    Horizontal,
    /// Members are pulled onto the line `x = coordinate`.
    Vertical,
}

/// Pulls a set of nodes onto a fixed line and damps their cross-axis motion.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineAxis {
    pub orientation: AxisOrientation,
    pub coordinate: f32,
    /// Pull strength in `[0, 1]`; also the fraction of cross-axis velocity removed per tick.
    pub strength: f32,
    pub members: HashSet<NodeId>,
}

/// Ideal-length multiplier for an edge whose busiest endpoint has `degree` edges.
pub fn hub_length_scale(degree: u32, max_scale: f32) -> f32 {
    let extra = degree.saturating_sub(1) as f32;
    (1.0 + extra.sqrt() * HUB_GROWTH).min(max_scale.max(1.0))
}

/// Warmup budget for a graph of `node_count` nodes: logarithmic in size, capped.
pub fn recommended_warmup_iterations(node_count: usize) -> u32 {
    if node_count == 0 {
        return 0;
    }
    let budget = (WARMUP_PER_LOG_NODE * ((node_count + 1) as f32).ln()).ceil() as u32;
    budget.min(MAX_WARMUP_ITERATIONS)
}

/// Flat per-tick buffers, reused between ticks.
#[derive(Debug, Default)]
struct Scratch {
    /// Local slot -> arena index.
    active: Vec<usize>,
    /// Arena index -> local slot, or `INACTIVE`.
    local: Vec<u32>,
    positions: Vec<Point>,
    forces: Vec<Point>,
    degrees: Vec<u32>,
    springs: Vec<(usize, usize, f32)>,
    class_members: Vec<usize>,
    on_axis: Vec<bool>,
}

/// Force-directed layout engine.
pub struct ForceSimulation {
    config: SimulationConfig,
    ids: Vec<NodeId>,
    index: HashMap<NodeId, NodeIndex>,
    state: Vec<NodePosition>,
    alpha: f32,
    iteration: u32,
    viewport: Viewport,
    class_nodes: HashSet<NodeId>,
    timeline: Option<TimelineAxis>,
    rng: StdRng,
    tree: QuadTree,
    grid: CollisionGrid,
    scratch: Scratch,
}

impl Default for ForceSimulation {
    fn default() -> Self {
        Self::from_parts(SimulationConfig::default())
    }
}

impl std::fmt::Debug for ForceSimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForceSimulation")
            .field("nodes", &self.ids.len())
            .field("alpha", &self.alpha)
            .field("iteration", &self.iteration)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

impl ForceSimulation {
    /// Create an empty simulation. Call [`initialize`](Self::initialize) before ticking.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config))
    }

    fn from_parts(config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            tree: QuadTree::new(config.max_tree_depth, config.theta),
            alpha: config.alpha,
            config,
            ids: Vec::new(),
            index: HashMap::new(),
            state: Vec::new(),
            iteration: 0,
            viewport: Viewport::default(),
            class_nodes: HashSet::new(),
            timeline: None,
            rng,
            grid: CollisionGrid::new(),
            scratch: Scratch::default(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Replace the parameters. Positions and temperature are kept.
    pub fn set_config(&mut self, config: SimulationConfig) -> Result<()> {
        config.validate()?;
        self.tree.set_theta(config.theta);
        self.tree.set_max_depth(config.max_tree_depth);
        self.config = config;
        Ok(())
    }

    /// Reset the node set.
    ///
    /// Nodes found in `prior` (with a finite position) keep that position so that
    /// switching views interpolates instead of jumping; the rest are seeded on a
    /// jittered circle around the viewport center whose radius grows with √n.
    pub fn initialize(
        &mut self,
        node_ids: &[NodeId],
        viewport: Viewport,
        prior: Option<&HashMap<NodeId, Point>>,
    ) {
        let viewport = self.accept_viewport(viewport);
        self.ids.clear();
        self.index.clear();
        self.state.clear();

        for id in node_ids {
            if self.index.contains_key(id) {
                continue;
            }
            self.index.insert(id.clone(), NodeIndex::from(self.ids.len()));
            self.ids.push(id.clone());
        }

        let count = self.ids.len();
        let center = viewport.center();
        let radius = SEED_RADIUS_PER_SQRT_NODE * (count as f32).sqrt();
        let mut reused = 0usize;

        for (i, id) in self.ids.iter().enumerate() {
            let carried = prior
                .and_then(|positions| positions.get(id))
                .copied()
                .filter(|p| p.is_finite());
            let position = match carried {
                Some(p) => {
                    reused += 1;
                    p
                }
                None => circle_point(&mut self.rng, i, count, center, radius),
            };
            self.state.push(NodePosition {
                position,
                velocity: Point::ZERO,
                pinned: false,
            });
        }

        self.alpha = self.config.alpha;
        self.iteration = 0;

        tracing::info!(
            "Simulation initialized: {} nodes ({} carried over)",
            count,
            reused
        );
    }

    /// Whether another tick would do work.
    pub fn is_running(&self) -> bool {
        !self.ids.is_empty()
            && self.iteration < self.config.max_iterations
            && self.alpha >= self.config.alpha_min
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Identifiers in arena order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn index_of(&self, id: &NodeId) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node_state(&self, id: &NodeId) -> Option<&NodePosition> {
        self.index_of(id).map(|idx| &self.state[idx.index()])
    }

    pub fn position(&self, id: &NodeId) -> Option<Point> {
        self.node_state(id).map(|s| s.position)
    }

    pub fn is_pinned(&self, id: &NodeId) -> bool {
        self.node_state(id).is_some_and(|s| s.pinned)
    }

    /// Current position of every node.
    pub fn positions(&self) -> HashMap<NodeId, Point> {
        self.ids
            .iter()
            .zip(&self.state)
            .map(|(id, s)| (id.clone(), s.position))
            .collect()
    }

    /// Designate the nodes that repel each other with the extra class force.
    pub fn set_class_nodes<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.class_nodes = ids.into_iter().collect();
    }

    pub fn set_timeline_axis(&mut self, axis: Option<TimelineAxis>) {
        self.timeline = axis;
    }

    /// Freeze a node at `point`; its velocity is zeroed.
    pub fn pin(&mut self, id: &NodeId, point: Point) -> Result<()> {
        let idx = self.require(id)?;
        let position = if point.is_finite() {
            point
        } else {
            heal_point(&mut self.rng, self.viewport.center())
        };
        let state = &mut self.state[idx];
        state.position = position;
        state.velocity = Point::ZERO;
        state.pinned = true;
        Ok(())
    }

    /// Release a pinned node.
    pub fn unpin(&mut self, id: &NodeId) -> Result<()> {
        let idx = self.require(id)?;
        self.state[idx].pinned = false;
        Ok(())
    }

    /// Move a node without pinning it.
    pub fn set_position(&mut self, id: &NodeId, point: Point) -> Result<()> {
        let idx = self.require(id)?;
        if point.is_finite() {
            let state = &mut self.state[idx];
            state.position = point;
            state.velocity = Point::ZERO;
        }
        Ok(())
    }

    /// Zero all velocities and restart annealing from `target_alpha`, keeping positions.
    pub fn reheat(&mut self, target_alpha: f32) {
        for state in &mut self.state {
            state.velocity = Point::ZERO;
        }
        self.alpha = if target_alpha.is_finite() {
            target_alpha.clamp(0.0, 1.0)
        } else {
            self.config.alpha
        };
        self.iteration = 0;
        tracing::debug!("Simulation reheated to alpha {:.3}", self.alpha);
    }

    /// Add nodes near the centroid of the existing ones. Returns how many were new.
    pub fn add_nodes(&mut self, ids: &[NodeId]) -> usize {
        let anchor = self.centroid().unwrap_or_else(|| self.viewport.center());
        let spread = (self.config.ideal_length * 0.5).max(1.0);
        let mut added = 0;

        for id in ids {
            if self.index.contains_key(id) {
                continue;
            }
            let angle = self.rng.random_range(0.0..TAU);
            let radius = spread * self.rng.random::<f32>().sqrt();
            self.index.insert(id.clone(), NodeIndex::from(self.ids.len()));
            self.ids.push(id.clone());
            self.state.push(NodePosition {
                position: anchor + Point::new(angle.cos(), angle.sin()) * radius,
                velocity: Point::ZERO,
                pinned: false,
            });
            added += 1;
        }

        if added > 0 {
            tracing::debug!("Added {} nodes ({} total)", added, self.ids.len());
        }
        added
    }

    /// Remove nodes. Unknown ids are ignored. Returns how many were removed.
    pub fn remove_nodes(&mut self, ids: &[NodeId]) -> usize {
        let mut removed = 0;
        for id in ids {
            let Some(idx) = self.index.remove(id) else {
                continue;
            };
            let i = idx.index();
            self.ids.swap_remove(i);
            self.state.swap_remove(i);
            if let Some(moved) = self.ids.get(i) {
                self.index.insert(moved.clone(), idx);
            }
            removed += 1;
        }
        if removed > 0 {
            tracing::debug!("Removed {} nodes ({} left)", removed, self.ids.len());
        }
        removed
    }

    /// Run up to `iterations` ticks back to back. Returns the number of ticks that did work.
    pub fn warmup(
        &mut self,
        nodes: &[NodeId],
        edges: &[GraphEdge],
        viewport: Viewport,
        iterations: u32,
    ) -> u32 {
        let mut ran = 0;
        while ran < iterations && self.is_running() {
            self.tick(nodes, edges, viewport);
            ran += 1;
        }
        if ran > 0 {
            tracing::info!(
                "Warmup finished: {} ticks, alpha {:.4}, {} nodes",
                ran,
                self.alpha,
                self.ids.len()
            );
        }
        ran
    }

    /// Advance one step over the nodes in `nodes`.
    ///
    /// Ids not yet in the simulation are added near the centroid; simulated nodes
    /// missing from `nodes` neither move nor exert force this tick. Returns `false`
    /// once the iteration cap is reached or alpha falls below its floor.
    pub fn tick(&mut self, nodes: &[NodeId], edges: &[GraphEdge], viewport: Viewport) -> bool {
        if !self.is_running() {
            return false;
        }
        let viewport = self.accept_viewport(viewport);
        if nodes.iter().any(|id| !self.index.contains_key(id)) {
            self.add_nodes(nodes);
        }

        let count = self.collect_active(nodes);
        if count == 0 {
            return false;
        }

        let alpha = self.alpha;
        let center = viewport.center();
        let Self {
            config,
            index,
            ids,
            state,
            class_nodes,
            timeline,
            rng,
            tree,
            grid,
            scratch,
            ..
        } = self;
        let Scratch {
            active,
            local,
            positions,
            forces,
            degrees,
            springs,
            class_members,
            on_axis,
        } = scratch;

        forces.clear();
        forces.resize(count, Point::ZERO);

        // Barnes-Hut repulsion.
        tree.build(positions);
        let repulsion = config.repulsion * alpha;
        for (k, force) in forces.iter_mut().enumerate() {
            *force += tree.repulsion(k, positions, repulsion, rng);
        }

        // Class repulsion, O(C²) over the designated subset.
        class_members.clear();
        if config.class_repulsion > 0.0 && !class_nodes.is_empty() {
            class_members.extend((0..count).filter(|&k| class_nodes.contains(&ids[active[k]])));
            let strength = config.class_repulsion * alpha;
            for (n, &a) in class_members.iter().enumerate() {
                for &b in &class_members[n + 1..] {
                    let (delta, dist_sq) = separation(positions[a] - positions[b], rng);
                    let push = delta * (strength / dist_sq);
                    forces[a] += push;
                    forces[b] -= push;
                }
            }
        }

        // Springs, with the ideal length stretched around hubs.
        springs.clear();
        degrees.clear();
        degrees.resize(count, 0);
        for edge in edges.iter() {
            if edge.is_self_loop() {
                continue;
            }
            let (Some(s), Some(t)) = (
                local_slot(index, local, &edge.source),
                local_slot(index, local, &edge.target),
            ) else {
                continue;
            };
            let weight = edge
                .weight
                .map(|w| w as f32)
                .filter(|w| w.is_finite())
                .map_or(1.0, |w| w.clamp(0.1, 5.0));
            degrees[s] += 1;
            degrees[t] += 1;
            springs.push((s, t, weight));
        }
        for &(s, t, weight) in springs.iter() {
            let ideal = config.ideal_length
                * hub_length_scale(degrees[s].max(degrees[t]), config.max_hub_scale);
            let (delta, dist_sq) = separation(positions[t] - positions[s], rng);
            let distance = dist_sq.sqrt();
            let stretch = (distance - ideal) * config.spring_strength * weight * alpha;
            let pull = delta * (stretch / distance);
            forces[s] += pull;
            forces[t] -= pull;
        }

        // Center gravity.
        let gravity = config.gravity * alpha;
        for (force, &p) in forces.iter_mut().zip(positions.iter()) {
            *force += (center - p) * gravity;
        }

        // Minimum separation.
        grid.resolve(
            positions,
            forces,
            config.collision_distance,
            config.collision_strength,
            rng,
        );

        // Timeline axis.
        on_axis.clear();
        on_axis.resize(count, false);
        if let Some(axis) = timeline.as_ref() {
            let pull = axis.strength.clamp(0.0, 1.0) * alpha;
            for k in 0..count {
                if !axis.members.contains(&ids[active[k]]) {
                    continue;
                }
                on_axis[k] = true;
                match axis.orientation {
                    AxisOrientation::Horizontal => {
                        forces[k].y += (axis.coordinate - positions[k].y) * pull
                    }
                    AxisOrientation::Vertical => {
                        forces[k].x += (axis.coordinate - positions[k].x) * pull
                    }
                }
            }
        }

        // Integrate.
        let bound = viewport.extent() * config.world_scale;
        let cross_axis_keep = timeline
            .as_ref()
            .map_or(1.0, |axis| 1.0 - axis.strength.clamp(0.0, 1.0));
        let orientation = timeline.as_ref().map(|axis| axis.orientation);
        for k in 0..count {
            let node = &mut state[active[k]];
            if node.pinned {
                node.velocity = Point::ZERO;
                continue;
            }

            let mut velocity = (node.velocity + forces[k]) * config.damping;
            if on_axis[k] {
                match orientation {
                    Some(AxisOrientation::Horizontal) => velocity.y *= cross_axis_keep,
                    Some(AxisOrientation::Vertical) => velocity.x *= cross_axis_keep,
                    None => {}
                }
            }
            let speed = velocity.length();
            if speed > config.max_velocity {
                velocity = velocity * (config.max_velocity / speed);
            }

            let mut position = node.position + velocity;
            if !position.is_finite() || !velocity.is_finite() {
                tracing::warn!("Non-finite state for node {}, re-seeding", ids[active[k]]);
                position = heal_point(rng, center);
                velocity = Point::ZERO;
            }
            position.x = position.x.clamp(center.x - bound, center.x + bound);
            position.y = position.y.clamp(center.y - bound, center.y + bound);

            node.position = position;
            node.velocity = velocity;
        }

        self.alpha *= 1.0 - self.config.alpha_decay;
        self.iteration += 1;

        let running = self.is_running();
        if !running {
            tracing::info!(
                "Simulation converged after {} iterations (alpha {:.4})",
                self.iteration,
                self.alpha
            );
        }
        running
    }

    /// Adopt `viewport` if both dimensions are finite; otherwise keep the last good one.
    fn accept_viewport(&mut self, viewport: Viewport) -> Viewport {
        if viewport.width.is_finite() && viewport.height.is_finite() {
            self.viewport = viewport;
        } else {
            tracing::warn!(
                "Ignoring non-finite viewport {}x{}, keeping {}x{}",
                viewport.width,
                viewport.height,
                self.viewport.width,
                self.viewport.height
            );
        }
        self.viewport
    }

    /// Fill the flat buffers for the nodes listed in `nodes`, healing non-finite state.
    fn collect_active(&mut self, nodes: &[NodeId]) -> usize {
        let center = self.viewport.center();
        let scratch = &mut self.scratch;
        scratch.local.clear();
        scratch.local.resize(self.state.len(), INACTIVE);
        scratch.active.clear();
        scratch.positions.clear();

        for id in nodes {
            let Some(idx) = self.index.get(id) else {
                continue;
            };
            let i = idx.index();
            if scratch.local[i] != INACTIVE {
                continue;
            }
            scratch.local[i] = scratch.active.len() as u32;
            scratch.active.push(i);

            let node = &mut self.state[i];
            if !node.position.is_finite() || !node.velocity.is_finite() {
                tracing::warn!("Non-finite state for node {}, re-seeding", id);
                node.position = heal_point(&mut self.rng, center);
                node.velocity = Point::ZERO;
            }
            scratch.positions.push(node.position);
        }

        scratch.active.len()
    }

    fn centroid(&self) -> Option<Point> {
        let mut sum = Point::ZERO;
        let mut count = 0usize;
        for state in self.state.iter().filter(|s| s.position.is_finite()) {
            sum += state.position;
            count += 1;
        }
        (count > 0).then(|| sum / count as f32)
    }

    fn require(&self, id: &NodeId) -> Result<usize> {
        self.index_of(id)
            .map(NodeIndex::index)
            .ok_or_else(|| LayoutError::NodeNotFound(id.clone()))
    }

    /// Overwrite a node's raw state. Used to exercise the self-healing path.
    #[cfg(test)]
    pub(crate) fn corrupt(&mut self, id: &NodeId, position: Point) {
        if let Some(idx) = self.index_of(id) {
            self.state[idx.index()].position = position;
        }
    }
}

fn local_slot(index: &HashMap<NodeId, NodeIndex>, local: &[u32], id: &NodeId) -> Option<usize> {
    let idx = index.get(id)?.index();
    match local.get(idx) {
        Some(&slot) if slot != INACTIVE => Some(slot as usize),
        _ => None,
    }
}

/// Offset and squared distance, replacing near-coincident offsets with a random one.
fn separation<R: Rng + ?Sized>(delta: Point, rng: &mut R) -> (Point, f32) {
    let dist_sq = delta.length_squared();
    if dist_sq >= MIN_DISTANCE * MIN_DISTANCE {
        return (delta, dist_sq);
    }
    let delta = jitter(rng);
    (delta, delta.length_squared().max(MIN_DISTANCE * MIN_DISTANCE))
}

fn circle_point<R: Rng + ?Sized>(
    rng: &mut R,
    i: usize,
    count: usize,
    center: Point,
    radius: f32,
) -> Point {
    let step = TAU / count.max(1) as f32;
    let angle = step * i as f32 + rng.random_range(-0.5f32..0.5) * step;
    let r = radius * rng.random_range(0.8f32..1.2);
    center + Point::new(angle.cos(), angle.sin()) * r
}

fn heal_point<R: Rng + ?Sized>(rng: &mut R, center: Point) -> Point {
    center
        + Point::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)) * HEAL_SPREAD
}
