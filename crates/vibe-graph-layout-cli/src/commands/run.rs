//! Run command implementation.
//!
//! Reads a graph document, lays it out and writes the positions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use vibe_graph_layout::{
    ForceConfig, Graph, GravityModeConfig, LayoutConfig, LayoutEngine, Link, RunReport,
    Termination,
};

/// Gravity mode as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Exact,
    BarnesHut,
}

/// Command-line overrides of the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub output: Option<PathBuf>,
    /// Run exactly this many steps instead of seeking stability.
    pub steps: Option<u64>,
    pub mode: Option<ModeArg>,
    pub theta: Option<f64>,
    pub max_steps: Option<u64>,
}

#[derive(Debug, Serialize)]
struct NodePosition<'a> {
    id: &'a str,
    x: f64,
    y: f64,
    z: f64,
}

/// The document written by `vgl run`.
#[derive(Debug, Serialize)]
struct LayoutOutput<'a> {
    status: &'static str,
    steps: u64,
    nodes: Vec<NodePosition<'a>>,
    links: &'a [Link],
}

pub fn status(termination: Termination) -> &'static str {
    match termination {
        Termination::Stable => "stable",
        Termination::StepBudget => "step-budget",
        Termination::TimeBudget => "time-budget",
        Termination::Cancelled => "cancelled",
    }
}

/// Applies gravity mode and θ overrides to every gravity entry.
pub fn apply_overrides(layout: &mut LayoutConfig, options: &RunOptions) {
    if let Some(max_steps) = options.max_steps {
        layout.max_steps = max_steps;
    }
    for force in &mut layout.forces {
        if let ForceConfig::Gravity { mode, theta, .. } = force {
            if let Some(arg) = options.mode {
                *mode = match arg {
                    ModeArg::Exact => GravityModeConfig::Exact,
                    ModeArg::BarnesHut => GravityModeConfig::BarnesHut,
                };
            }
            if let Some(value) = options.theta {
                *theta = value;
            }
        }
    }
}

pub fn load_graph(path: &Path) -> Result<Graph> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse graph document {}", path.display()))
}

pub fn execute(
    mut layout: LayoutConfig,
    pretty: bool,
    graph_path: &Path,
    options: &RunOptions,
) -> Result<RunReport> {
    apply_overrides(&mut layout, options);
    if layout.forces.is_empty() {
        tracing::warn!("No forces configured, bodies will stay at their seed positions");
    }

    let graph = load_graph(graph_path)?;
    let mut engine = LayoutEngine::from_config(layout).context("Invalid layout configuration")?;
    engine.init(&graph).context("Failed to initialize layout")?;

    let report = match options.steps {
        Some(steps) => engine.run_for(steps)?,
        None => engine.run_until_stable()?,
    };
    tracing::info!(
        status = status(report.termination),
        steps = report.steps,
        movement = report.movement,
        "Layout finished"
    );

    let output = LayoutOutput {
        status: status(report.termination),
        steps: report.steps,
        nodes: engine
            .bodies()
            .iter()
            .map(|body| NodePosition {
                id: body.id(),
                x: body.x(),
                y: body.y(),
                z: body.z(),
            })
            .collect(),
        links: engine.links(),
    };
    let json = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };

    match &options.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write layout to {}", path.display()))?;
            tracing::info!(path = %path.display(), "Layout written");
        }
        None => println!("{json}"),
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_touch_only_gravity() {
        let mut layout = LayoutConfig::with_default_forces();
        let options = RunOptions {
            mode: Some(ModeArg::Exact),
            theta: Some(0.9),
            max_steps: Some(12),
            ..RunOptions::default()
        };
        apply_overrides(&mut layout, &options);

        assert_eq!(layout.max_steps, 12);
        assert!(layout.forces.contains(&ForceConfig::Gravity {
            coefficient: -1.0,
            mode: GravityModeConfig::Exact,
            theta: 0.9,
        }));
        assert_eq!(
            layout
                .forces
                .iter()
                .filter(|f| matches!(f, ForceConfig::Gravity { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_run_writes_positions() {
        let dir = tempfile::tempdir().unwrap();
        let graph_path = dir.path().join("graph.json");
        let out_path = dir.path().join("out.json");
        std::fs::write(
            &graph_path,
            r#"{"nodes": [{"id": "a"}, {"id": "b"}, {"id": "c", "weight": 2.0}],
                "links": [{"source": "a", "target": "b"}]}"#,
        )
        .unwrap();

        let options = RunOptions {
            output: Some(out_path.clone()),
            steps: Some(5),
            ..RunOptions::default()
        };
        let report = execute(LayoutConfig::with_default_forces(), false, &graph_path, &options)
            .unwrap();
        assert_eq!(report.steps, 5);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out_path).unwrap()).unwrap();
        assert_eq!(written["status"], "step-budget");
        assert_eq!(written["steps"], 5);
        assert_eq!(written["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(written["nodes"][2]["id"], "c");
        assert_eq!(written["links"][0]["target"], "b");
    }

    #[test]
    fn test_unreadable_graph_is_reported() {
        let err = execute(
            LayoutConfig::default(),
            true,
            Path::new("/no/such/graph.json"),
            &RunOptions::default(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read graph"));
    }
}
