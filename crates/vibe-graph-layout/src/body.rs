//! Simulated bodies, one per graph node.

use std::collections::HashMap;

use crate::Vec3;

/// A point mass standing in for one graph node.
#[derive(Debug, Clone)]
pub struct Body {
    id: String,
    position: Vec3,
    /// Per-step force accumulator, cleared before forces are applied.
    force: Vec3,
    /// Displacement applied in the previous step.
    velocity: Vec3,
    mass: f64,
}

impl Body {
    /// Creates a body of unit mass at rest.
    pub fn new(id: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            position,
            force: Vec3::ZERO,
            velocity: Vec3::ZERO,
            mass: 1.0,
        }
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Overwrites the position. The implied velocity is dropped so the body
    /// starts from rest at its new location.
    pub fn set_position(&mut self, x: f64, y: f64, z: f64) {
        self.position = Vec3::new(x, y, z);
        self.velocity = Vec3::ZERO;
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn z(&self) -> f64 {
        self.position.z
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Force accumulated so far in the current step.
    pub fn force(&self) -> Vec3 {
        self.force
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Adds a contribution to the accumulator.
    pub fn add_force(&mut self, contribution: Vec3) {
        self.force += contribution;
    }

    pub(crate) fn reset_force(&mut self) {
        self.force = Vec3::ZERO;
    }

    /// Displacement this body would receive if integrated now.
    pub(crate) fn pending_displacement(&self) -> Vec3 {
        self.velocity + self.force
    }

    pub(crate) fn apply_displacement(&mut self, displacement: Vec3) {
        self.position += displacement;
        self.velocity = displacement;
    }
}

/// All bodies of a run, addressable by node id or by seed index.
#[derive(Debug, Clone, Default)]
pub struct BodySet {
    bodies: Vec<Body>,
    index: HashMap<String, usize>,
}

impl BodySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a body. Returns `false` (and keeps the existing body) if the id
    /// is already taken.
    pub fn insert(&mut self, body: Body) -> bool {
        if self.index.contains_key(body.id()) {
            return false;
        }
        self.index.insert(body.id.clone(), self.bodies.len());
        self.bodies.push(body);
        true
    }

    pub fn get(&self, id: &str) -> Option<&Body> {
        self.index.get(id).map(|&i| &self.bodies[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Body> {
        self.index.get(id).map(|&i| &mut self.bodies[i])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Bodies in seed order.
    pub fn iter(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Body> {
        self.bodies.iter_mut()
    }

    /// Positions in seed order, copied out so forces can read them while the
    /// accumulators are being written.
    pub fn positions(&self) -> Vec<Vec3> {
        self.bodies.iter().map(Body::position).collect()
    }

    pub fn masses(&self) -> Vec<f64> {
        self.bodies.iter().map(Body::mass).collect()
    }

    /// Adds a contribution to the body at `index`.
    pub fn accumulate(&mut self, index: usize, contribution: Vec3) {
        self.bodies[index].add_force(contribution);
    }

    /// Adds one contribution per body, in seed order.
    pub(crate) fn accumulate_all(&mut self, contributions: &[Vec3]) {
        debug_assert_eq!(contributions.len(), self.bodies.len());
        for (body, contribution) in self.bodies.iter_mut().zip(contributions) {
            body.add_force(*contribution);
        }
    }

    pub(crate) fn reset_forces(&mut self) {
        self.bodies.iter_mut().for_each(Body::reset_force);
    }
}
