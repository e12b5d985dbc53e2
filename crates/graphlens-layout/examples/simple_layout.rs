//! Lay out a ring with chords: warm up offscreen, then drive frames.
//!
//! Run with: cargo run -p graphlens-layout --example simple_layout

use std::time::{Duration, Instant};

use graphlens_core::{GraphEdge, NodeId, Point, Viewport};
use graphlens_layout::{
    recommended_warmup_iterations, ForceSimulation, FrameStatus, LayoutRunner, SimulationConfig,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let node_count = 400;
    let nodes: Vec<NodeId> = (0..node_count).map(|i| NodeId::new(format!("n{i}"))).collect();

    // Ring plus a chord every 7th node.
    let mut edges: Vec<GraphEdge> = Vec::with_capacity(node_count * 2);
    for i in 0..node_count {
        edges.push(GraphEdge::new(nodes[i].clone(), nodes[(i + 1) % node_count].clone()));
        if i % 7 == 0 {
            let target = (i * 31 + 11) % node_count;
            if target != i {
                edges.push(GraphEdge::new(nodes[i].clone(), nodes[target].clone()));
            }
        }
    }
    println!("Graph: {} nodes, {} edges", nodes.len(), edges.len());

    let viewport = Viewport::new(1280.0, 720.0);
    let config = SimulationConfig::from_json_str(r#"{ "seed": 7, "theta": 0.9 }"#)?;
    let mut simulation = ForceSimulation::new(config)?;
    simulation.initialize(&nodes, viewport, None);

    let budget = recommended_warmup_iterations(nodes.len()) / 2;
    let start = Instant::now();
    let ran = simulation.warmup(&nodes, &edges, viewport, budget);
    println!("Warmup: {} ticks in {:.2?}", ran, start.elapsed());

    let mut runner = LayoutRunner::new(simulation).with_frame_interval(Duration::ZERO);
    let _handle = runner.start();

    let start = Instant::now();
    let mut frames = 0;
    loop {
        match runner.frame(&nodes, &edges, viewport) {
            FrameStatus::Running { ticks } => {
                frames += 1;
                if frames % 20 == 0 {
                    let sim = runner.simulation();
                    println!(
                        "Frame {frames}: {ticks} ticks, alpha {:.4}, iteration {}",
                        sim.alpha(),
                        sim.iteration()
                    );
                }
            }
            status => {
                println!("Stopped after {frames} frames: {status:?}");
                break;
            }
        }
    }
    println!("Frames took {:.2?}", start.elapsed());

    let positions = runner.simulation().positions();
    let (min, max) = positions.values().fold(
        (Point::new(f32::MAX, f32::MAX), Point::new(f32::MIN, f32::MIN)),
        |(min, max), p| {
            (
                Point::new(min.x.min(p.x), min.y.min(p.y)),
                Point::new(max.x.max(p.x), max.y.max(p.y)),
            )
        },
    );
    println!("Bounds: ({:.1}, {:.1}) to ({:.1}, {:.1})", min.x, min.y, max.x, max.y);

    for id in nodes.iter().take(5) {
        if let Some(p) = positions.get(id) {
            println!("  {id}: ({:.2}, {:.2})", p.x, p.y);
        }
    }

    Ok(())
}
