//! Forces acting on bodies.
//!
//! A [`Force`] is a tagged configuration plus a rule function chosen when the
//! force is constructed. Rules only add contributions into body accumulators;
//! positions are left for the integrator. Because contributions are purely
//! additive, the order in which forces are registered does not matter.
//!
//! # Examples
//!
//! ```
//! use vibe_graph_layout::{Force, GravityMode};
//!
//! let repulsion = Force::gravity(-1.0, GravityMode::Exact).unwrap();
//! let damping = Force::drag(0.3).unwrap();
//!
//! assert!(Force::gravity(-1.0, GravityMode::BarnesHut { theta: 0.0 }).is_err());
//! assert!(Force::drag(0.0).is_err());
//! # let _ = (repulsion, damping);
//! ```

use crate::body::BodySet;
use crate::error::LayoutError;
use crate::{Edge, Result};

mod drag;
mod gravity;
mod spring;

pub use drag::{Drag, DragScope};
pub use gravity::{Gravity, GravityMode};
pub use spring::Spring;

/// Evaluation function of a force: reads the current snapshot and adds
/// contributions into the accumulators of `bodies`.
pub type ForceRule = fn(&Force, &mut BodySet, &[Edge]) -> Result<()>;

/// Configuration of one force variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ForceKind {
    Gravity(Gravity),
    Drag(Drag),
    Spring(Spring),
}

/// A configured force together with its evaluation rule.
#[derive(Clone)]
pub struct Force {
    kind: ForceKind,
    rule: ForceRule,
}

impl std::fmt::Debug for Force {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Force")
            .field("name", &self.name())
            .field("kind", &self.kind)
            .finish()
    }
}

impl Force {
    /// Pairwise gravity. A negative coefficient repels, a positive one attracts.
    pub fn gravity(coefficient: f64, mode: GravityMode) -> Result<Self> {
        let gravity = Gravity::new(coefficient, mode)?;
        let rule: ForceRule = match mode {
            GravityMode::Exact => gravity::each_on_each,
            GravityMode::BarnesHut { .. } => gravity::barnes_hut,
        };
        Ok(Self {
            kind: ForceKind::Gravity(gravity),
            rule,
        })
    }

    /// Linear damping of every body's implied velocity.
    pub fn drag(coefficient: f64) -> Result<Self> {
        Self::drag_with_scope(coefficient, DragScope::EachBody)
    }

    pub fn drag_with_scope(coefficient: f64, scope: DragScope) -> Result<Self> {
        let drag = Drag::new(coefficient, scope)?;
        Ok(Self {
            kind: ForceKind::Drag(drag),
            rule: drag::each_body,
        })
    }

    /// Hooke spring along every link.
    pub fn spring(coefficient: f64, rest_length: f64) -> Result<Self> {
        let spring = Spring::new(coefficient, rest_length)?;
        Ok(Self {
            kind: ForceKind::Spring(spring),
            rule: spring::along_links,
        })
    }

    pub fn kind(&self) -> &ForceKind {
        &self.kind
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match &self.kind {
            ForceKind::Gravity(g) => match g.mode {
                GravityMode::Exact => "gravity/exact",
                GravityMode::BarnesHut { .. } => "gravity/barnes-hut",
            },
            ForceKind::Drag(_) => "drag",
            ForceKind::Spring(_) => "spring",
        }
    }

    /// Runs the rule against `bodies`.
    pub fn apply(&self, bodies: &mut BodySet, edges: &[Edge]) -> Result<()> {
        (self.rule)(self, bodies, edges)
    }
}

fn check_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LayoutError::config(format!("{name} must be finite, got {value}")))
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    check_finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(LayoutError::config(format!("{name} must be positive, got {value}")))
    }
}
