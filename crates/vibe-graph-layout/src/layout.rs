//! Simulation state and the step / run loops.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::body::{Body, BodySet};
use crate::config::LayoutConfig;
use crate::forces::Force;
use crate::graph::{GraphSource, Link};
use crate::{Edge, LayoutError, Result, Vec3};

/// Steps between periodic progress events.
const PROGRESS_INTERVAL: u64 = 1000;

/// Lifecycle of a [`LayoutEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutState {
    /// No graph loaded yet.
    Uninitialized,
    /// Bodies seeded, no step taken.
    Initialized,
    /// At least one step taken since initialization.
    Running,
    /// The last run reached the stability threshold.
    Stable,
    /// The last run ended on a budget or cancellation before stabilizing.
    StoppedAtBudget,
    /// The last step was rejected by a numerical fault.
    Faulted,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Stable,
    StepBudget,
    TimeBudget,
    Cancelled,
}

/// Outcome of [`LayoutEngine::run_for`] or a stable-seeking run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub termination: Termination,
    /// Steps taken by this run.
    pub steps: u64,
    /// Movement metric of the last step, 0 if no step was taken.
    pub movement: f64,
}

impl RunReport {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Stable
    }
}

/// Per-step progress, handed to the observer of [`LayoutEngine::run_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepStats {
    /// Total steps taken since initialization.
    pub iteration: u64,
    /// Sum of displacement magnitudes in this step.
    pub movement: f64,
    /// Change of the movement metric from the previous step, if any.
    pub delta: Option<f64>,
}

/// Cancels a running stable-seeking loop from another thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Limits of a stable-seeking run.
#[derive(Debug, Clone)]
pub struct RunBudget {
    pub max_steps: u64,
    pub max_duration: Option<Duration>,
    pub stop: Option<StopHandle>,
}

impl RunBudget {
    pub fn steps(max_steps: u64) -> Self {
        Self {
            max_steps,
            max_duration: None,
            stop: None,
        }
    }

    pub fn with_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    pub fn with_stop(mut self, stop: StopHandle) -> Self {
        self.stop = Some(stop);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.stop.as_ref().is_some_and(StopHandle::is_stopped)
    }
}

impl From<&LayoutConfig> for RunBudget {
    fn from(config: &LayoutConfig) -> Self {
        Self {
            max_steps: config.max_steps,
            max_duration: config
                .max_duration_secs
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
            stop: None,
        }
    }
}

/// Seed position of the `index`-th node: a spiral with golden-angle roll and
/// a slow yaw, radius growing with the cube root of the index.
pub(crate) fn seed_position(index: usize, spacing: f64) -> Vec3 {
    let i = index as f64;
    let radius = spacing * i.cbrt();
    let roll = i * PI * (3.0 - 5.0_f64.sqrt());
    let yaw = i * PI / 24.0;
    Vec3::new(radius * roll.cos(), radius * roll.sin(), radius * yaw.sin())
}

/// Force-directed 3D layout engine.
///
/// Usage: [`new`](Self::new) or [`from_config`](Self::from_config), then
/// [`init`](Self::init) with a graph, register forces, and drive it with
/// [`step`](Self::step), [`run_for`](Self::run_for) or
/// [`run_until_stable`](Self::run_until_stable).
#[derive(Debug)]
pub struct LayoutEngine {
    config: LayoutConfig,
    state: LayoutState,
    bodies: BodySet,
    links: Vec<Link>,
    edges: Vec<Edge>,
    forces: Vec<Force>,
    iteration: u64,
    last_movement: Option<f64>,
}

impl LayoutEngine {
    /// Creates an engine with no registered forces. `config.forces` is not
    /// read; see [`from_config`](Self::from_config).
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            state: LayoutState::Uninitialized,
            bodies: BodySet::new(),
            links: Vec::new(),
            edges: Vec::new(),
            forces: Vec::new(),
            iteration: 0,
            last_movement: None,
        }
    }

    /// Validates `config` and registers every force it lists.
    pub fn from_config(config: LayoutConfig) -> Result<Self> {
        config.validate()?;
        let forces = config.build_forces()?;
        Ok(Self::new(config).with_forces(forces))
    }

    pub fn with_forces(mut self, forces: impl IntoIterator<Item = Force>) -> Self {
        self.forces.extend(forces);
        self
    }

    /// Reads `graph` once, seeds one body per node and resolves links.
    ///
    /// Re-initializing replaces all bodies and resets the step counter;
    /// registered forces are kept.
    pub fn init(&mut self, graph: &impl GraphSource) -> Result<()> {
        let nodes = graph.nodes();
        if nodes.is_empty() {
            return Err(LayoutError::InvalidGraph("No nodes".into()));
        }

        let mut bodies = BodySet::new();
        for (index, node) in nodes.into_iter().enumerate() {
            let mass = node.weight.unwrap_or(1.0);
            if !mass.is_finite() || mass <= 0.0 {
                return Err(LayoutError::InvalidGraph(format!(
                    "node {} has weight {mass}, expected a positive number",
                    node.id
                )));
            }
            let position = seed_position(index, self.config.seed_spacing);
            let id = node.id;
            if !bodies.insert(Body::new(id.clone(), position).with_mass(mass)) {
                return Err(LayoutError::DuplicateNode(id));
            }
        }

        let links = graph.links();
        let edges = links
            .iter()
            .map(|link| {
                let lookup = |id: &str| {
                    bodies.index_of(id).ok_or_else(|| LayoutError::UnknownNode {
                        source_id: link.source.clone(),
                        target_id: link.target.clone(),
                        missing: id.to_string(),
                    })
                };
                Ok(Edge::new(lookup(&link.source)?, lookup(&link.target)?))
            })
            .collect::<Result<Vec<_>>>()?;

        self.bodies = bodies;
        self.links = links;
        self.edges = edges;
        self.iteration = 0;
        self.last_movement = None;
        self.state = LayoutState::Initialized;

        tracing::info!(
            nodes = self.bodies.len(),
            links = self.links.len(),
            forces = self.forces.len(),
            "Layout initialized"
        );
        Ok(())
    }

    /// Registers a force. Registration order does not affect results.
    pub fn add_force(&mut self, force: Force) {
        tracing::debug!(force = force.name(), "Force registered");
        self.forces.push(force);
    }

    pub fn forces(&self) -> &[Force] {
        &self.forces
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    /// Steps taken since initialization.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn body(&self, id: &str) -> Option<&Body> {
        self.bodies.get(id)
    }

    pub fn bodies(&self) -> &BodySet {
        &self.bodies
    }

    /// The link list exactly as read from the graph.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Links resolved to body indices, in the same order as [`links`](Self::links).
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Moves a body and drops its implied velocity.
    pub fn set_position(&mut self, id: &str, x: f64, y: f64, z: f64) -> Result<()> {
        if self.state == LayoutState::Uninitialized {
            return Err(LayoutError::NotInitialized);
        }
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(LayoutError::config(format!(
                "position of {id} must be finite, got ({x}, {y}, {z})"
            )));
        }
        let body = self
            .bodies
            .get_mut(id)
            .ok_or_else(|| LayoutError::InvalidGraph(format!("Unknown node {id}")))?;
        body.set_position(x, y, z);
        Ok(())
    }

    /// Performs one step and returns the movement metric.
    pub fn step(&mut self) -> Result<f64> {
        Ok(self.advance()?.movement)
    }

    fn advance(&mut self) -> Result<StepStats> {
        if self.state == LayoutState::Uninitialized {
            return Err(LayoutError::NotInitialized);
        }

        self.bodies.reset_forces();
        let applied = self
            .forces
            .iter()
            .try_for_each(|force| force.apply(&mut self.bodies, &self.edges));
        if let Err(err) = applied {
            return Err(self.fault(err));
        }

        let displacements: Vec<Vec3> = self.bodies.iter().map(Body::pending_displacement).collect();
        let step = self.iteration + 1;
        let offender = self
            .bodies
            .iter()
            .zip(&displacements)
            .find(|(body, d)| !(body.position() + **d).is_finite())
            .map(|(body, _)| body.id().to_string());
        if let Some(id) = offender {
            return Err(self.fault(LayoutError::NonFinite { id, step }));
        }

        let movement: f64 = displacements.iter().map(|d| d.length()).sum();
        for (body, displacement) in self.bodies.iter_mut().zip(displacements) {
            body.apply_displacement(displacement);
        }

        let delta = self.last_movement.map(|previous| (movement - previous).abs());
        self.last_movement = Some(movement);
        self.iteration = step;
        self.state = LayoutState::Running;

        tracing::debug!(step, movement, delta, "Layout step");
        Ok(StepStats {
            iteration: step,
            movement,
            delta,
        })
    }

    fn fault(&mut self, err: LayoutError) -> LayoutError {
        tracing::warn!(step = self.iteration + 1, error = %err, "Layout step rejected");
        self.state = LayoutState::Faulted;
        err
    }

    /// Performs exactly `steps` steps, whatever the movement does.
    pub fn run_for(&mut self, steps: u64) -> Result<RunReport> {
        if self.state == LayoutState::Uninitialized {
            return Err(LayoutError::NotInitialized);
        }
        let started = Instant::now();
        let mut movement = 0.0;
        for _ in 0..steps {
            movement = self.advance()?.movement;
            self.log_progress(movement, started);
        }
        self.state = LayoutState::StoppedAtBudget;
        tracing::info!(
            steps,
            movement,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Layout run finished"
        );
        Ok(RunReport {
            termination: Termination::StepBudget,
            steps,
            movement,
        })
    }

    /// Steps until stable, within the step and time budgets of the engine
    /// configuration.
    pub fn run_until_stable(&mut self) -> Result<RunReport> {
        let budget = RunBudget::from(&self.config);
        self.run_with(&budget, |_| {})
    }

    /// Steps until the movement metric changes by less than the stability
    /// threshold between consecutive steps, or until `budget` runs out.
    ///
    /// `on_step` is called after every step and has no effect on the result.
    /// Running out of budget is reported in the returned [`RunReport`], not as
    /// an error.
    pub fn run_with<F>(&mut self, budget: &RunBudget, mut on_step: F) -> Result<RunReport>
    where
        F: FnMut(&StepStats),
    {
        if self.state == LayoutState::Uninitialized {
            return Err(LayoutError::NotInitialized);
        }
        let threshold = self.config.stable_threshold;
        let started = Instant::now();
        let mut steps = 0;
        let mut movement = 0.0;
        // The first step of a run is never compared against an earlier run.
        self.last_movement = None;

        let termination = loop {
            if budget.is_cancelled() {
                break Termination::Cancelled;
            }
            if steps >= budget.max_steps {
                break Termination::StepBudget;
            }
            if budget
                .max_duration
                .is_some_and(|limit| started.elapsed() >= limit)
            {
                break Termination::TimeBudget;
            }

            let stats = self.advance()?;
            steps += 1;
            movement = stats.movement;
            on_step(&stats);
            self.log_progress(movement, started);

            if stats.delta.is_some_and(|delta| delta < threshold) {
                break Termination::Stable;
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if termination == Termination::Stable {
            self.state = LayoutState::Stable;
            tracing::info!(steps, movement, elapsed_ms, "Layout converged");
        } else {
            self.state = LayoutState::StoppedAtBudget;
            tracing::warn!(
                steps,
                movement,
                elapsed_ms,
                termination = ?termination,
                "Layout stopped before converging"
            );
        }

        Ok(RunReport {
            termination,
            steps,
            movement,
        })
    }

    fn log_progress(&self, movement: f64, started: Instant) {
        if self.iteration % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                iteration = self.iteration,
                movement,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Layout progress"
            );
        }
    }
}
