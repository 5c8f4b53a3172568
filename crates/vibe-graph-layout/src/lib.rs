//! 3D force-directed graph layout.
//!
//! This crate embeds an arbitrary graph in 3D space by simulating one body per
//! node under a configurable set of forces, stepping the system until the total
//! movement settles or a step budget runs out.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Initialization                        │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ GraphSource │───▶│   BodySet   │───▶│    Edges    │     │
//! │  │ (ids,links) │    │   (seeded)  │    │  (indices)  │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        One step                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │   Reset     │───▶│   Forces    │───▶│  Integrate  │     │
//! │  │ accumulators│    │ (snapshot,  │    │ + movement  │     │
//! │  │             │    │  parallel)  │    │   metric    │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Forces
//!
//! - Gravity, exact: O(n²) per step, every pair evaluated
//! - Gravity, Barnes-Hut: O(n log n) per step via an octree rebuilt each step
//! - Drag: per-body damping of the implied velocity
//! - Spring: Hooke's law along graph links
//!
//! ## Example
//!
//! ```
//! use vibe_graph_layout::{Force, Graph, GravityMode, LayoutConfig, LayoutEngine};
//!
//! let graph = Graph::from_edges([("a", "b"), ("b", "c")]);
//! let mut engine = LayoutEngine::new(LayoutConfig::default());
//! engine.init(&graph).unwrap();
//! engine.add_force(Force::gravity(-1.0, GravityMode::BarnesHut { theta: 0.5 }).unwrap());
//! engine.add_force(Force::spring(0.01, 30.0).unwrap());
//!
//! engine.run_for(50).unwrap();
//! let a = engine.body("a").unwrap();
//! assert!(a.position().is_finite());
//! ```

mod body;
mod config;
mod error;
mod forces;
mod graph;
mod layout;
pub mod octree;

pub use body::{Body, BodySet};
pub use config::{ForceConfig, GravityModeConfig, LayoutConfig};
pub use error::{LayoutError, OctreeError};
pub use forces::{Drag, DragScope, Force, ForceKind, ForceRule, Gravity, GravityMode, Spring};
pub use graph::{Graph, GraphNode, GraphSource, Link};
pub use layout::{
    LayoutEngine, LayoutState, RunBudget, RunReport, StepStats, StopHandle, Termination,
};
pub use octree::Octree;

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// A point or direction in 3D space.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Vec3) -> f64 {
        (other - self).length()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Component by axis index (0 = x, 1 = y, 2 = z).
    pub fn axis(self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl std::iter::Sum for Vec3 {
    fn sum<I: Iterator<Item = Vec3>>(iter: I) -> Vec3 {
        iter.fold(Vec3::ZERO, |acc, v| acc + v)
    }
}

/// A link resolved to body indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
}

impl Edge {
    pub fn new(source: usize, target: usize) -> Self {
        Self { source, target }
    }
}
