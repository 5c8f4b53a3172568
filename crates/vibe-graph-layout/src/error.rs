//! Error types for layout operations.

use thiserror::Error;

/// Errors that can occur while building or stepping a layout.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// Layout not initialized.
    #[error("Layout not initialized")]
    NotInitialized,

    /// Invalid graph data.
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// Two graph nodes share the same id.
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    /// A link references a node id that is not part of the graph.
    #[error("Link {source_id} -> {target_id} references unknown node {missing}")]
    UnknownNode {
        source_id: String,
        target_id: String,
        missing: String,
    },

    /// Invalid force or engine configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A step would have produced a non-finite position.
    #[error("Simulation fault at step {step}: body {id} reached a non-finite position")]
    NonFinite { id: String, step: u64 },

    /// Spatial index failure.
    #[error("Octree error: {0}")]
    Octree(#[from] OctreeError),
}

impl LayoutError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this error is a numerical fault of the simulation itself
    /// rather than bad input or configuration.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            LayoutError::NonFinite { .. }
                | LayoutError::Octree(OctreeError::Degenerate { .. })
                | LayoutError::Octree(OctreeError::OutOfRange { .. })
                | LayoutError::Octree(OctreeError::NonFinite)
        )
    }
}

/// Errors reported by the octree spatial index.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OctreeError {
    /// Lookup of a key that was never inserted into this tree.
    #[error("Leaf not found")]
    NotFound,

    /// The key is already present in this tree.
    #[error("Key already inserted")]
    DuplicateKey,

    /// Points too close together to be separated by subdivision.
    #[error("Degenerate input: cannot separate points near ({x}, {y}, {z}) at depth {depth}")]
    Degenerate { x: f64, y: f64, z: f64, depth: usize },

    /// A point too far from the existing root to be covered by growing it.
    #[error("Point ({x}, {y}, {z}) still outside the root after {doublings} doublings")]
    OutOfRange {
        x: f64,
        y: f64,
        z: f64,
        doublings: usize,
    },

    /// Mass that is not a positive finite number.
    #[error("Invalid mass: {0}")]
    InvalidMass(f64),

    /// Position with NaN or infinite coordinates.
    #[error("Non-finite position")]
    NonFinite,
}
