//! Lays out a generated graph with exact and Barnes-Hut gravity and compares
//! the time per step.
//!
//! Run with: cargo run --example simple_layout --release

use std::time::Instant;
use vibe_graph_layout::{Force, Graph, GravityMode, LayoutConfig, LayoutEngine};

fn build_graph(node_count: usize, edge_count: usize) -> Graph {
    let mut graph = Graph::new();
    for i in 0..node_count {
        graph.add_node(i.to_string());
    }
    // A path keeps the graph connected
    for i in 1..node_count {
        graph.add_link((i - 1).to_string(), i.to_string());
    }
    for i in 0..edge_count.saturating_sub(node_count - 1) {
        let source = (i * 17) % node_count;
        let target = (i * 31 + 7) % node_count;
        if source != target {
            graph.add_link(source.to_string(), target.to_string());
        }
    }
    graph
}

fn run(graph: &Graph, mode: GravityMode, steps: u64) {
    let mut engine = LayoutEngine::new(LayoutConfig::default()).with_forces([
        Force::gravity(-50.0, mode).expect("valid gravity"),
        Force::spring(0.02, 20.0).expect("valid spring"),
        Force::drag(0.9).expect("valid drag"),
    ]);
    engine.init(graph).expect("Failed to initialize layout");

    let start = Instant::now();
    let report = engine.run_for(steps).expect("Layout step failed");
    let elapsed = start.elapsed();

    let (min, max) = engine.bodies().iter().fold(
        ([f64::MAX; 3], [f64::MIN; 3]),
        |(mut min, mut max), body| {
            let p = body.position();
            for axis in 0..3 {
                min[axis] = min[axis].min(p.axis(axis));
                max[axis] = max[axis].max(p.axis(axis));
            }
            (min, max)
        },
    );

    println!("{mode:?}");
    println!(
        "  {} steps in {:.2?} ({:.2} ms/step), last movement {:.3}",
        report.steps,
        elapsed,
        elapsed.as_secs_f64() * 1000.0 / steps as f64,
        report.movement
    );
    println!(
        "  bounds ({:.1}, {:.1}, {:.1}) to ({:.1}, {:.1}, {:.1})",
        min[0], min[1], min[2], max[0], max[1], max[2]
    );
}

fn main() {
    tracing_subscriber::fmt::init();

    let node_count = 1000;
    let edge_count = 2000;
    println!("Creating graph with {node_count} nodes and {edge_count} edges...");
    let graph = build_graph(node_count, edge_count);

    let steps = 50;
    run(&graph, GravityMode::Exact, steps);
    run(&graph, GravityMode::BarnesHut { theta: 0.5 }, steps);
    run(&graph, GravityMode::BarnesHut { theta: 1.0 }, steps);
}
