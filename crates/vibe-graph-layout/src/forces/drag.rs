//! Linear damping.

use serde::{Deserialize, Serialize};

use super::{check_positive, Force, ForceKind};
use crate::body::BodySet;
use crate::{Edge, Result};

/// Which bodies drag applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DragScope {
    /// Every body, independently of the others.
    #[default]
    EachBody,
}

/// Opposes each body's implied velocity: `-coefficient * velocity`.
///
/// A coefficient of 1 cancels the carried-over motion completely, so bodies
/// move only by the forces of the current step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drag {
    pub coefficient: f64,
    pub scope: DragScope,
}

impl Drag {
    pub fn new(coefficient: f64, scope: DragScope) -> Result<Self> {
        check_positive("drag coefficient", coefficient)?;
        Ok(Self { coefficient, scope })
    }
}

pub(super) fn each_body(force: &Force, bodies: &mut BodySet, _edges: &[Edge]) -> Result<()> {
    let ForceKind::Drag(drag) = force.kind() else {
        unreachable!("drag rule bound to {:?}", force.kind());
    };
    match drag.scope {
        DragScope::EachBody => {
            for body in bodies.iter_mut() {
                let damping = -body.velocity() * drag.coefficient;
                body.add_force(damping);
            }
        }
    }
    Ok(())
}
