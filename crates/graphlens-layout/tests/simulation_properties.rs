//! Behavioral tests for the layout engine through its public API.

use std::collections::HashMap;

use graphlens_core::{GraphDocumentBuilder, GraphEdge, NodeId, Point, Viewport};
use graphlens_layout::{
    recommended_warmup_iterations, ForceSimulation, QuadTree, SimulationConfig,
};

// ============================================================================
// Fixtures
// ============================================================================

fn ring(count: usize) -> (Vec<NodeId>, Vec<GraphEdge>) {
    let nodes: Vec<NodeId> = (0..count).map(|i| NodeId::new(format!("n{i}"))).collect();
    let edges = (0..count)
        .map(|i| GraphEdge::new(nodes[i].clone(), nodes[(i + 1) % count].clone()))
        .collect();
    (nodes, edges)
}

fn star(leaves: usize) -> (Vec<NodeId>, Vec<GraphEdge>) {
    let mut builder = GraphDocumentBuilder::new().node("hub");
    for i in 0..leaves {
        builder = builder.edge("hub", format!("leaf{i}").as_str());
    }
    let doc = builder.build();
    (doc.node_ids(), doc.edges)
}

fn simulation(seed: u64) -> ForceSimulation {
    ForceSimulation::new(SimulationConfig::default().with_seed(seed)).expect("valid config")
}

const VIEWPORT: Viewport = Viewport::new(1000.0, 800.0);

// ============================================================================
// Convergence
// ============================================================================

#[test]
fn ticks_eventually_stop_and_respect_caps() {
    let (nodes, edges) = ring(40);
    let mut sim = simulation(1);
    sim.initialize(&nodes, VIEWPORT, None);

    let cap = sim.config().max_iterations;
    let floor = sim.config().alpha_min;
    let mut previous_alpha = sim.alpha();
    let mut calls = 0;

    while sim.tick(&nodes, &edges, VIEWPORT) {
        calls += 1;
        assert!(sim.alpha() <= previous_alpha, "alpha must not increase");
        assert!(sim.iteration() <= cap);
        previous_alpha = sim.alpha();
        assert!(calls <= cap, "tick kept returning true past the cap");
    }

    assert!(sim.iteration() <= cap);
    assert!(sim.iteration() >= cap || sim.alpha() < floor);

    // Further ticks are no-ops.
    let frozen = sim.positions();
    let iteration = sim.iteration();
    assert!(!sim.tick(&nodes, &edges, VIEWPORT));
    assert_eq!(sim.iteration(), iteration);
    assert_eq!(sim.positions(), frozen);
}

#[test]
fn alpha_floor_stops_before_iteration_cap() {
    let config = SimulationConfig {
        alpha_decay: 0.5,
        alpha_min: 0.1,
        max_iterations: 1000,
        seed: Some(2),
        ..Default::default()
    };
    let (nodes, edges) = ring(5);
    let mut sim = ForceSimulation::new(config).expect("valid config");
    sim.initialize(&nodes, VIEWPORT, None);

    let mut ticks = 0;
    while sim.tick(&nodes, &edges, VIEWPORT) {
        ticks += 1;
    }
    // 1.0 -> 0.5 -> 0.25 -> 0.125 -> 0.0625
    assert_eq!(sim.iteration(), 4);
    assert_eq!(ticks, 3);
    assert!(sim.alpha() < 0.1);
}

#[test]
fn empty_simulation_is_a_no_op() {
    let mut sim = simulation(3);
    sim.initialize(&[], VIEWPORT, None);
    assert!(!sim.tick(&[], &[], VIEWPORT));
    assert_eq!(sim.warmup(&[], &[], VIEWPORT, 50), 0);
    assert!(sim.positions().is_empty());
}

#[test]
fn zero_iteration_warmup_does_nothing() {
    let (nodes, edges) = ring(8);
    let mut sim = simulation(4);
    sim.initialize(&nodes, VIEWPORT, None);
    let before = sim.positions();

    assert_eq!(sim.warmup(&nodes, &edges, VIEWPORT, 0), 0);
    assert_eq!(sim.positions(), before);
    assert_eq!(sim.iteration(), 0);
}

#[test]
fn warmup_runs_requested_ticks() {
    let (nodes, edges) = ring(30);
    let mut sim = simulation(5);
    sim.initialize(&nodes, VIEWPORT, None);

    let budget = recommended_warmup_iterations(nodes.len());
    assert_eq!(sim.warmup(&nodes, &edges, VIEWPORT, budget), budget);
    assert_eq!(sim.iteration(), budget);
}

// ============================================================================
// Pinning and reheating
// ============================================================================

#[test]
fn pinned_node_does_not_move_until_unpinned() {
    let (nodes, edges) = star(12);
    let hub = NodeId::from("hub");
    let mut sim = simulation(6);
    sim.initialize(&nodes, VIEWPORT, None);

    let anchor = Point::new(100.0, 700.0);
    sim.pin(&hub, anchor).expect("hub exists");
    assert!(sim.is_pinned(&hub));

    for _ in 0..50 {
        sim.tick(&nodes, &edges, VIEWPORT);
        assert_eq!(sim.position(&hub), Some(anchor));
        assert_eq!(sim.node_state(&hub).map(|s| s.velocity), Some(Point::ZERO));
    }

    sim.unpin(&hub).expect("hub exists");
    assert!(!sim.is_pinned(&hub));
    for _ in 0..20 {
        sim.tick(&nodes, &edges, VIEWPORT);
    }
    assert_ne!(sim.position(&hub), Some(anchor));
}

#[test]
fn reheat_keeps_positions_and_restarts_annealing() {
    let (nodes, edges) = ring(10);
    let mut sim = simulation(7);
    sim.initialize(&nodes, VIEWPORT, None);
    while sim.tick(&nodes, &edges, VIEWPORT) {}
    let settled = sim.positions();

    sim.reheat(0.1);
    assert_eq!(sim.alpha(), 0.1);
    assert_eq!(sim.iteration(), 0);
    assert_eq!(sim.positions(), settled);
    assert!(sim
        .node_ids()
        .iter()
        .all(|id| sim.node_state(id).is_some_and(|s| s.velocity == Point::ZERO)));
    assert!(sim.tick(&nodes, &edges, VIEWPORT));
}

// ============================================================================
// Layout quality
// ============================================================================

#[test]
fn connected_nodes_end_closer_than_unconnected() {
    let (nodes, mut edges) = ring(12);
    edges.retain(|e| e.source != NodeId::from("n11"));
    let mut nodes = nodes;
    nodes.push(NodeId::from("loner"));

    let mut sim = simulation(8);
    sim.initialize(&nodes, VIEWPORT, None);
    while sim.tick(&nodes, &edges, VIEWPORT) {}

    let positions = sim.positions();
    let p = |name: &str| positions[&NodeId::from(name)];
    assert!(positions.values().all(|point| point.is_finite()));
    let edge_length = p("n0").distance(p("n1"));
    let far_pair = p("n0").distance(p("n6"));
    assert!(edge_length < far_pair);
}

#[test]
fn collisions_keep_bodies_apart() {
    let config = SimulationConfig {
        repulsion: 0.0,
        gravity: 0.5,
        collision_distance: 30.0,
        collision_strength: 1.0,
        seed: Some(9),
        ..Default::default()
    };
    let nodes: Vec<NodeId> = (0..9).map(|i| NodeId::new(format!("c{i}"))).collect();
    let mut sim = ForceSimulation::new(config).expect("valid config");
    let stacked: HashMap<NodeId, Point> = nodes
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), VIEWPORT.center() + Point::new(i as f32 * 0.5, 0.0)))
        .collect();
    sim.initialize(&nodes, VIEWPORT, Some(&stacked));
    while sim.tick(&nodes, &[], VIEWPORT) {}

    let positions: Vec<Point> = sim.positions().into_values().collect();
    let mut closest = f32::MAX;
    for (i, a) in positions.iter().enumerate() {
        for b in &positions[i + 1..] {
            closest = closest.min(a.distance(*b));
        }
    }
    assert!(closest > 10.0, "closest pair {closest}");
}

#[test]
fn same_seed_reproduces_layout() {
    let (nodes, edges) = star(25);
    let run = || {
        let mut sim = simulation(10);
        sim.set_class_nodes([NodeId::from("leaf0"), NodeId::from("leaf1")]);
        sim.initialize(&nodes, VIEWPORT, None);
        sim.warmup(&nodes, &edges, VIEWPORT, 120);
        sim.positions()
    };
    assert_eq!(run(), run());
}

#[test]
fn class_nodes_are_pushed_further_apart() {
    let nodes: Vec<NodeId> = ["A", "B", "x", "y"].iter().map(|&n| NodeId::from(n)).collect();
    let prior: HashMap<NodeId, Point> = [
        ("A", Point::new(480.0, 400.0)),
        ("B", Point::new(520.0, 400.0)),
        ("x", Point::new(480.0, 300.0)),
        ("y", Point::new(520.0, 300.0)),
    ]
    .into_iter()
    .map(|(n, p)| (NodeId::from(n), p))
    .collect();

    let mut sim = simulation(11);
    sim.set_class_nodes([NodeId::from("A"), NodeId::from("B")]);
    sim.initialize(&nodes, VIEWPORT, Some(&prior));
    sim.warmup(&nodes, &[], VIEWPORT, 30);

    let positions = sim.positions();
    let classes = positions[&NodeId::from("A")].distance(positions[&NodeId::from("B")]);
    let plain = positions[&NodeId::from("x")].distance(positions[&NodeId::from("y")]);
    assert!(classes > plain);
}

#[test]
fn hub_edges_are_longer_than_chain_edges() {
    let (mut nodes, mut edges) = star(16);
    for name in ["p", "q"] {
        nodes.push(NodeId::from(name));
    }
    edges.push(GraphEdge::new("p", "q"));

    let mut sim = simulation(12);
    sim.initialize(&nodes, VIEWPORT, None);
    while sim.tick(&nodes, &edges, VIEWPORT) {}

    let positions = sim.positions();
    let hub = positions[&NodeId::from("hub")];
    let mean_spoke = (0..16)
        .map(|i| hub.distance(positions[&NodeId::new(format!("leaf{i}"))]))
        .sum::<f32>()
        / 16.0;
    let pair = positions[&NodeId::from("p")].distance(positions[&NodeId::from("q")]);
    assert!(mean_spoke > pair);
}

// ============================================================================
// Quadtree through the public API
// ============================================================================

#[test]
fn quadtree_root_aggregates_all_bodies() {
    let positions: Vec<Point> = (0..500)
        .map(|i| {
            let t = i as f32;
            Point::new((t * 0.37).sin() * 900.0 + t, (t * 0.11).cos() * 600.0)
        })
        .collect();
    let mut tree = QuadTree::default();
    tree.build(&positions);

    let root = tree.root().expect("non-empty tree");
    let mean = positions.iter().fold(Point::ZERO, |acc, &p| acc + p) / positions.len() as f32;
    assert_eq!(root.mass, 500.0);
    assert!(root.center_of_mass.distance(mean) < 0.05);
}
