//! Springs along graph links.

use super::{check_finite, check_positive, Force, ForceKind};
use crate::body::BodySet;
use crate::{Edge, Result, Vec3};

/// Hooke's law along each link: `coefficient * (d - rest_length)`, pulling the
/// endpoints together when stretched and apart when compressed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    pub coefficient: f64,
    pub rest_length: f64,
}

impl Spring {
    pub fn new(coefficient: f64, rest_length: f64) -> Result<Self> {
        check_positive("spring coefficient", coefficient)?;
        check_finite("spring rest length", rest_length)?;
        if rest_length < 0.0 {
            return Err(crate::LayoutError::config(format!(
                "spring rest length must not be negative, got {rest_length}"
            )));
        }
        Ok(Self {
            coefficient,
            rest_length,
        })
    }

    /// Contribution on the source of a link from `source` to `target`.
    #[inline]
    pub fn law(&self, source: Vec3, target: Vec3) -> Vec3 {
        let diff = target - source;
        let dist = diff.length();
        if dist == 0.0 {
            return Vec3::ZERO;
        }
        diff * (self.coefficient * (dist - self.rest_length) / dist)
    }
}

pub(super) fn along_links(force: &Force, bodies: &mut BodySet, edges: &[Edge]) -> Result<()> {
    let ForceKind::Spring(spring) = force.kind() else {
        unreachable!("spring rule bound to {:?}", force.kind());
    };
    let positions = bodies.positions();

    let contributions: Vec<(Edge, Vec3)> = edges
        .iter()
        .filter(|edge| edge.source != edge.target)
        .map(|&edge| (edge, spring.law(positions[edge.source], positions[edge.target])))
        .collect();

    for (edge, pull) in contributions {
        bodies.accumulate(edge.source, pull);
        bodies.accumulate(edge.target, -pull);
    }
    Ok(())
}
