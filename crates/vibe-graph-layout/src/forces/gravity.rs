//! Pairwise gravity, exact (O(n²)) or Barnes-Hut approximated (O(n log n)).

use rayon::prelude::*;

use super::{check_finite, check_positive, Force, ForceKind};
use crate::body::BodySet;
use crate::octree::{Octree, OctreePoint};
use crate::{Edge, Result, Vec3};

/// How gravity is evaluated.
///
/// # Opening angle (θ)
///
/// Controls the Barnes-Hut accuracy/speed tradeoff:
/// - θ → 0: every cell is opened, same result as `Exact`
/// - θ = 0.5: good accuracy (default)
/// - θ = 1.0: faster, coarser
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GravityMode {
    /// Every pair of bodies, evaluated directly.
    Exact,
    /// Octree approximation with opening angle `theta`.
    BarnesHut { theta: f64 },
}

impl Default for GravityMode {
    fn default() -> Self {
        GravityMode::BarnesHut { theta: 0.5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gravity {
    pub coefficient: f64,
    pub mode: GravityMode,
}

impl Gravity {
    pub fn new(coefficient: f64, mode: GravityMode) -> Result<Self> {
        check_finite("gravity coefficient", coefficient)?;
        if let GravityMode::BarnesHut { theta } = mode {
            check_positive("Barnes-Hut theta", theta)?;
        }
        Ok(Self { coefficient, mode })
    }

    /// Contribution on a body of mass `from_mass` at `from` due to a mass
    /// `to_mass` at `to`: `coefficient * m1 * m2 / d²`, pointing from `from`
    /// toward `to`. Coincident points contribute nothing.
    #[inline]
    pub fn law(&self, from: Vec3, from_mass: f64, to: Vec3, to_mass: f64) -> Vec3 {
        let diff = to - from;
        let dist_sq = diff.length_squared();
        if dist_sq == 0.0 {
            return Vec3::ZERO;
        }
        let dist = dist_sq.sqrt();
        diff * (self.coefficient * from_mass * to_mass / (dist_sq * dist))
    }
}

fn config(force: &Force) -> &Gravity {
    match force.kind() {
        ForceKind::Gravity(gravity) => gravity,
        other => unreachable!("gravity rule bound to {other:?}"),
    }
}

/// Exact evaluation: every body against every other body.
///
/// The contribution of `j` on `i` is the exact negation of the contribution of
/// `i` on `j`, so pairwise momentum is conserved.
pub(super) fn each_on_each(force: &Force, bodies: &mut BodySet, _edges: &[Edge]) -> Result<()> {
    let gravity = config(force);
    let positions = bodies.positions();
    let masses = bodies.masses();

    let contributions: Vec<Vec3> = (0..positions.len())
        .into_par_iter()
        .map(|i| {
            let (pi, mi) = (positions[i], masses[i]);
            positions
                .iter()
                .zip(&masses)
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, (&pj, &mj))| gravity.law(pi, mi, pj, mj))
                .sum()
        })
        .collect();

    bodies.accumulate_all(&contributions);
    Ok(())
}

/// Barnes-Hut evaluation against an octree rebuilt from the current positions.
pub(super) fn barnes_hut(force: &Force, bodies: &mut BodySet, _edges: &[Edge]) -> Result<()> {
    let gravity = config(force);
    let GravityMode::BarnesHut { theta } = gravity.mode else {
        unreachable!("barnes_hut rule bound to exact gravity");
    };

    let positions = bodies.positions();
    let masses = bodies.masses();
    let tree = Octree::build(
        positions
            .iter()
            .zip(&masses)
            .enumerate()
            .map(|(key, (&position, &mass))| OctreePoint {
                key,
                position,
                mass,
            })
            .collect(),
    )?;

    let contributions: Vec<Vec3> = (0..positions.len())
        .into_par_iter()
        .map(|i| {
            let (pi, mi) = (positions[i], masses[i]);
            tree.approximate(&i, pi, theta, &|to, mass| gravity.law(pi, mi, to, mass))
        })
        .collect();

    bodies.accumulate_all(&contributions);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;

    fn bodies(points: &[(f64, f64, f64)]) -> BodySet {
        let mut set = BodySet::new();
        for (i, &(x, y, z)) in points.iter().enumerate() {
            set.insert(Body::new(i.to_string(), Vec3::new(x, y, z)));
        }
        set
    }

    #[test]
    fn test_law_direction() {
        let repel = Gravity::new(-1.0, GravityMode::Exact).unwrap();
        let attract = Gravity::new(1.0, GravityMode::Exact).unwrap();
        let from = Vec3::ZERO;
        let to = Vec3::new(2.0, 0.0, 0.0);

        assert!(repel.law(from, 1.0, to, 1.0).x < 0.0);
        assert!(attract.law(from, 1.0, to, 1.0).x > 0.0);
        // 1 * 1 * 1 / 2² = 0.25
        assert!((attract.law(from, 1.0, to, 1.0).x - 0.25).abs() < 1e-15);
        assert_eq!(attract.law(from, 1.0, from, 1.0), Vec3::ZERO);
    }

    #[test]
    fn test_law_scales_with_mass() {
        let g = Gravity::new(1.0, GravityMode::Exact).unwrap();
        let to = Vec3::new(0.0, 3.0, 4.0);
        let unit = g.law(Vec3::ZERO, 1.0, to, 1.0);
        let heavy = g.law(Vec3::ZERO, 2.0, to, 3.0);
        assert!((heavy - unit * 6.0).length() < 1e-15);
    }

    #[test]
    fn test_each_on_each_pair_is_antisymmetric() {
        let mut set = bodies(&[(1.0, 1.0, 1.0), (2.0, 2.0, 2.0), (3.0, 3.0, 3.0)]);
        let force = Force::gravity(-10.0, GravityMode::Exact).unwrap();
        force.apply(&mut set, &[]).unwrap();

        let total: Vec3 = set.iter().map(|b| b.force()).sum();
        assert!(total.length() < 1e-12);
        // Middle body is pushed equally from both sides.
        assert!(set.get("1").unwrap().force().length() < 1e-12);
        assert!(set.get("0").unwrap().force().x < 0.0);
        assert!(set.get("2").unwrap().force().x > 0.0);
    }

    #[test]
    fn test_coincident_bodies_are_skipped_in_exact_mode() {
        let mut set = bodies(&[(1.0, 1.0, 1.0), (1.0, 1.0, 1.0)]);
        let force = Force::gravity(-1.0, GravityMode::Exact).unwrap();
        force.apply(&mut set, &[]).unwrap();
        assert!(set.iter().all(|b| b.force() == Vec3::ZERO));
    }

    #[test]
    fn test_coincident_bodies_fault_in_barnes_hut_mode() {
        let mut set = bodies(&[(1.0, 1.0, 1.0), (1.0, 1.0, 1.0)]);
        let force = Force::gravity(-1.0, GravityMode::BarnesHut { theta: 0.5 }).unwrap();
        let err = force.apply(&mut set, &[]).unwrap_err();
        assert!(err.is_fault());
    }

    #[test]
    fn test_barnes_hut_close_to_exact() {
        let points: Vec<(f64, f64, f64)> = (0..200)
            .map(|i| {
                let t = i as f64;
                ((t * 1.3).sin() * 50.0, (t * 0.7).cos() * 50.0, (t * 2.9).sin() * 50.0)
            })
            .collect();

        let mut exact = bodies(&points);
        let mut approx = bodies(&points);
        Force::gravity(-1.0, GravityMode::Exact)
            .unwrap()
            .apply(&mut exact, &[])
            .unwrap();
        Force::gravity(-1.0, GravityMode::BarnesHut { theta: 0.3 })
            .unwrap()
            .apply(&mut approx, &[])
            .unwrap();

        let error: f64 = exact
            .iter()
            .zip(approx.iter())
            .map(|(e, a)| (e.force() - a.force()).length())
            .sum();
        let magnitude: f64 = exact.iter().map(|b| b.force().length()).sum();
        assert!(error / magnitude < 0.05, "relative error {}", error / magnitude);
    }
}
