//! Arena-based octree for Barnes-Hut force approximation.
//!
//! The octree recursively subdivides space into eight octants and keeps, for
//! every internal cell, the total mass and center of mass of everything below
//! it. Distant cells can then stand in for all of their points at once,
//! reducing the O(n²) pairwise evaluation to O(n log n).
//!
//! Cells live contiguously in a `Vec` and refer to their children by
//! [`OctantId`]. A key→leaf table allows O(1) lookup of the leaf holding a
//! given point; it is a secondary index only and is never used for traversal.
//!
//! Octant selection uses half-open intervals: a coordinate equal to a cell's
//! center belongs to the upper half on that axis.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use crate::error::OctreeError;
use crate::Vec3;

/// Subdivision depth at which two points are considered inseparable.
const MAX_DEPTH: usize = 64;

/// Upper bound on root doublings for a single insertion.
const MAX_GROWTH: usize = 2048;

/// Half-width of the root cell created around the first point of an
/// unbounded tree.
const INITIAL_HALF_WIDTH: f64 = 1.0;

/// Extra room added around the points when sizing a tree up front.
const PADDING_FACTOR: f64 = 0.1;

/// An axis-aligned box, `[min, max)` on each axis, split at `mid`.
///
/// Child and grown regions reuse their parent's bounds as their own, so a
/// point routed into a child by [`octant`](Self::octant) is always inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub min: Vec3,
    pub mid: Vec3,
    pub max: Vec3,
}

/// Builds a vector from a per-axis function.
fn per_axis(f: impl Fn(usize) -> f64) -> Vec3 {
    Vec3::new(f(0), f(1), f(2))
}

impl Region {
    /// Cube of half-width `half_width` around `center`.
    pub fn new(center: Vec3, half_width: f64) -> Self {
        let offset = Vec3::new(half_width, half_width, half_width);
        Self {
            min: center - offset,
            mid: center,
            max: center + offset,
        }
    }

    /// Smallest padded cube holding all `points`, or `None` if there are none.
    pub fn bounding(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| {
            (
                Vec3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z)),
                Vec3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z)),
            )
        });

        let center = (min + max) * 0.5;
        let extent = (max.x - min.x).max(max.y - min.y).max(max.z - min.z);
        let half_width = (extent * 0.5 * (1.0 + PADDING_FACTOR)).max(INITIAL_HALF_WIDTH);
        Some(Self::new(center, half_width))
    }

    /// Edge length of the cube (the longest axis).
    pub fn size(&self) -> f64 {
        (0..3)
            .map(|axis| self.max.axis(axis) - self.min.axis(axis))
            .fold(0.0, f64::max)
    }

    pub fn contains(&self, p: Vec3) -> bool {
        (0..3).all(|axis| {
            let v = p.axis(axis);
            v >= self.min.axis(axis) && v < self.max.axis(axis)
        })
    }

    /// Octant (0-7) of `p` relative to `mid`: bit 0 = x, bit 1 = y, bit 2 = z,
    /// set when the coordinate is at or above the split.
    pub fn octant(&self, p: Vec3) -> usize {
        let x_bit = (p.x >= self.mid.x) as usize;
        let y_bit = (p.y >= self.mid.y) as usize;
        let z_bit = (p.z >= self.mid.z) as usize;
        x_bit | (y_bit << 1) | (z_bit << 2)
    }

    /// The box covering octant `octant` of this one.
    pub fn child(&self, octant: usize) -> Self {
        let upper = |axis: usize| octant & (1 << axis) != 0;
        let min = per_axis(|a| if upper(a) { self.mid.axis(a) } else { self.min.axis(a) });
        let max = per_axis(|a| if upper(a) { self.max.axis(a) } else { self.mid.axis(a) });
        Self {
            min,
            mid: (min + max) * 0.5,
            max,
        }
    }

    /// Whether every child would have a split strictly inside its bounds.
    fn can_subdivide(&self) -> bool {
        (0..3).all(|axis| {
            let (lo, mid, hi) = (self.min.axis(axis), self.mid.axis(axis), self.max.axis(axis));
            let (lower, upper) = ((lo + mid) * 0.5, (mid + hi) * 0.5);
            lo < lower && lower < mid && mid < upper && upper < hi
        })
    }

    /// Twice as large, extended toward `p`. Returns the new region and the
    /// octant of the new region that this one occupies; the new split lies
    /// exactly on this region's bounds.
    fn grow_toward(&self, p: Vec3) -> (Self, usize) {
        let toward_upper = |axis: usize| p.axis(axis) >= self.mid.axis(axis);
        let width = |axis: usize| self.max.axis(axis) - self.min.axis(axis);
        let grown = Self {
            min: per_axis(|a| {
                if toward_upper(a) {
                    self.min.axis(a)
                } else {
                    self.min.axis(a) - width(a)
                }
            }),
            mid: per_axis(|a| {
                if toward_upper(a) {
                    self.max.axis(a)
                } else {
                    self.min.axis(a)
                }
            }),
            max: per_axis(|a| {
                if toward_upper(a) {
                    self.max.axis(a) + width(a)
                } else {
                    self.max.axis(a)
                }
            }),
        };
        let octant = grown.octant(self.mid);
        (grown, octant)
    }
}

/// Index into the cell arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OctantId(u32);

impl OctantId {
    fn new(index: usize) -> Self {
        debug_assert!(index < u32::MAX as usize, "OctantId overflow");
        OctantId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A weighted point stored in a leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct OctreePoint<K> {
    pub key: K,
    pub position: Vec3,
    pub mass: f64,
}

/// A cell of the octree.
#[derive(Debug, Clone)]
pub enum Octant<K> {
    /// Exactly one point; its own center of mass.
    Leaf {
        region: Region,
        point: OctreePoint<K>,
    },

    /// Up to eight children plus the aggregate of everything below.
    Internal {
        region: Region,
        children: [Option<OctantId>; 8],
        mass: f64,
        center_of_mass: Vec3,
    },
}

impl<K> Octant<K> {
    pub fn region(&self) -> Region {
        match self {
            Octant::Leaf { region, .. } | Octant::Internal { region, .. } => *region,
        }
    }

    pub fn mass(&self) -> f64 {
        match self {
            Octant::Leaf { point, .. } => point.mass,
            Octant::Internal { mass, .. } => *mass,
        }
    }

    pub fn center_of_mass(&self) -> Vec3 {
        match self {
            Octant::Leaf { point, .. } => point.position,
            Octant::Internal { center_of_mass, .. } => *center_of_mass,
        }
    }
}

/// Where a new point ends up once the descent stops.
enum Target {
    /// Free child slot of an internal cell.
    EmptyChild { parent: OctantId, octant: usize },
    /// Occupied leaf that has to be subdivided.
    Split { leaf: OctantId },
}

/// Octree over weighted points identified by keys of type `K`.
#[derive(Debug, Clone)]
pub struct Octree<K> {
    cells: Vec<Octant<K>>,
    root: Option<OctantId>,
    leaves: HashMap<K, OctantId>,
    initial_region: Option<Region>,
}

impl<K> Default for Octree<K> {
    fn default() -> Self {
        Self {
            cells: Vec::new(),
            root: None,
            leaves: HashMap::new(),
            initial_region: None,
        }
    }
}

impl<K: Clone + Eq + Hash> Octree<K> {
    /// Creates an empty tree whose root is sized around the first point.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty tree whose root covers `region`, if the first point
    /// falls inside it.
    pub fn with_region(region: Region) -> Self {
        Self {
            initial_region: Some(region),
            ..Self::default()
        }
    }

    /// Builds a tree from a snapshot of points, sizing the root so that no
    /// growth is needed.
    pub fn build(points: Vec<OctreePoint<K>>) -> Result<Self, OctreeError> {
        let mut tree = match Region::bounding(points.iter().map(|p| p.position)) {
            Some(region) => Self::with_region(region),
            None => Self::new(),
        };
        tree.cells.reserve(points.len() * 2);
        tree.leaves.reserve(points.len());
        for point in points {
            tree.insert(point.key, point.position, point.mass)?;
        }
        Ok(tree)
    }

    /// Number of points in the tree.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Number of cells in the arena (for diagnostics).
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn root(&self) -> Option<OctantId> {
        self.root
    }

    pub fn octant(&self, id: OctantId) -> &Octant<K> {
        &self.cells[id.index()]
    }

    /// Total mass and center of mass of the whole tree.
    pub fn aggregate(&self) -> Option<(f64, Vec3)> {
        self.root.map(|root| {
            let cell = self.octant(root);
            (cell.mass(), cell.center_of_mass())
        })
    }

    /// Adds a weighted point.
    ///
    /// Fails without adding the point if the key is already present, if the
    /// position or mass is unusable, or if the point cannot be separated from
    /// an existing one by subdivision.
    pub fn insert(&mut self, key: K, position: Vec3, mass: f64) -> Result<OctantId, OctreeError> {
        if !position.is_finite() {
            return Err(OctreeError::NonFinite);
        }
        if !(mass.is_finite() && mass > 0.0) {
            return Err(OctreeError::InvalidMass(mass));
        }
        if self.leaves.contains_key(&key) {
            return Err(OctreeError::DuplicateKey);
        }

        let Some(root) = self.root else {
            let region = match self.initial_region {
                Some(region) if region.contains(position) => region,
                _ => Region::new(position, INITIAL_HALF_WIDTH),
            };
            let id = self.push(Octant::Leaf {
                region,
                point: OctreePoint {
                    key: key.clone(),
                    position,
                    mass,
                },
            });
            self.root = Some(id);
            self.leaves.insert(key, id);
            return Ok(id);
        };

        self.grow_to_contain(root, position)?;

        let (path, target) = self.locate(position)?;

        for &id in &path {
            self.add_to_aggregate(id, position, mass);
        }

        let point = OctreePoint {
            key: key.clone(),
            position,
            mass,
        };
        let id = match target {
            Target::EmptyChild { parent, octant } => self.attach_leaf(parent, octant, point),
            Target::Split { leaf } => self.split(leaf, point),
        };
        self.leaves.insert(key, id);
        Ok(id)
    }

    /// Looks up the point stored under `key`.
    pub fn find_leaf<Q>(&self, key: &Q) -> Result<&OctreePoint<K>, OctreeError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.leaves.get(key).ok_or(OctreeError::NotFound)?;
        match self.octant(*id) {
            Octant::Leaf { point, .. } => Ok(point),
            Octant::Internal { .. } => Err(OctreeError::NotFound),
        }
    }

    /// Id of the leaf holding `key`, if any.
    pub fn leaf_id<Q>(&self, key: &Q) -> Option<OctantId>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.leaves.get(key).copied()
    }

    /// All points stored below `id`, in child order.
    pub fn subtree_points(&self, id: OctantId) -> Vec<&OctreePoint<K>> {
        let mut points = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            match self.octant(id) {
                Octant::Leaf { point, .. } => points.push(point),
                Octant::Internal { children, .. } => {
                    stack.extend(children.iter().rev().flatten().copied());
                }
            }
        }
        points
    }

    /// Ids of every internal cell.
    pub fn internal_ids(&self) -> impl Iterator<Item = OctantId> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| matches!(cell, Octant::Internal { .. }))
            .map(|(i, _)| OctantId::new(i))
    }

    /// Sums `interact(center, mass)` over the tree as seen from the point
    /// stored under `key` at `position`, using the Barnes-Hut criterion.
    ///
    /// A cell that does not contain `position` and satisfies
    /// `size / distance < theta` is treated as a single mass at its center of
    /// mass; otherwise its children are visited. The leaf holding `key` is
    /// skipped.
    pub fn approximate<F>(&self, key: &K, position: Vec3, theta: f64, interact: &F) -> Vec3
    where
        F: Fn(Vec3, f64) -> Vec3,
    {
        match self.root {
            Some(root) => self.approximate_from(root, key, position, theta, interact),
            None => Vec3::ZERO,
        }
    }

    fn approximate_from<F>(
        &self,
        id: OctantId,
        key: &K,
        position: Vec3,
        theta: f64,
        interact: &F,
    ) -> Vec3
    where
        F: Fn(Vec3, f64) -> Vec3,
    {
        match self.octant(id) {
            Octant::Leaf { point, .. } => {
                if point.key == *key {
                    Vec3::ZERO
                } else {
                    interact(point.position, point.mass)
                }
            }

            Octant::Internal {
                region,
                children,
                mass,
                center_of_mass,
            } => {
                if !region.contains(position) {
                    let distance = position.distance(*center_of_mass);
                    if distance > 0.0 && region.size() / distance < theta {
                        return interact(*center_of_mass, *mass);
                    }
                }
                children
                    .iter()
                    .flatten()
                    .map(|&child| self.approximate_from(child, key, position, theta, interact))
                    .sum()
            }
        }
    }

    fn push(&mut self, cell: Octant<K>) -> OctantId {
        let id = OctantId::new(self.cells.len());
        self.cells.push(cell);
        id
    }

    /// Doubles the root toward `position` until it is covered.
    fn grow_to_contain(&mut self, mut root: OctantId, position: Vec3) -> Result<(), OctreeError> {
        let mut grown = 0;
        while !self.octant(root).region().contains(position) {
            if grown >= MAX_GROWTH {
                return Err(OctreeError::OutOfRange {
                    x: position.x,
                    y: position.y,
                    z: position.z,
                    doublings: grown,
                });
            }
            let old = self.octant(root);
            let (region, octant) = old.region().grow_toward(position);
            let (mass, center_of_mass) = (old.mass(), old.center_of_mass());
            let mut children = [None; 8];
            children[octant] = Some(root);
            root = self.push(Octant::Internal {
                region,
                children,
                mass,
                center_of_mass,
            });
            self.root = Some(root);
            grown += 1;
        }
        if grown > 0 {
            tracing::trace!(grown, "octree root grown");
        }
        Ok(())
    }

    /// Read-only descent: the internal cells on the way down and where the
    /// point lands. Fails if landing requires an unbounded split.
    fn locate(&self, position: Vec3) -> Result<(Vec<OctantId>, Target), OctreeError> {
        let mut path = Vec::new();
        let mut current = self.root.ok_or(OctreeError::NotFound)?;
        let mut depth = 0;
        loop {
            match self.octant(current) {
                Octant::Internal {
                    region, children, ..
                } => {
                    path.push(current);
                    let octant = region.octant(position);
                    match children[octant] {
                        Some(child) => {
                            current = child;
                            depth += 1;
                        }
                        None => {
                            return Ok((
                                path,
                                Target::EmptyChild {
                                    parent: current,
                                    octant,
                                },
                            ))
                        }
                    }
                }
                Octant::Leaf { region, point } => {
                    check_separable(*region, point.position, position, depth)?;
                    return Ok((path, Target::Split { leaf: current }));
                }
            }
        }
    }

    fn add_to_aggregate(&mut self, id: OctantId, position: Vec3, added: f64) {
        if let Octant::Internal {
            mass,
            center_of_mass,
            ..
        } = &mut self.cells[id.index()]
        {
            let total = *mass + added;
            *center_of_mass = (*center_of_mass * *mass + position * added) * (1.0 / total);
            *mass = total;
        }
    }

    fn attach_leaf(&mut self, parent: OctantId, octant: usize, point: OctreePoint<K>) -> OctantId {
        let region = self.octant(parent).region().child(octant);
        let id = self.push(Octant::Leaf { region, point });
        if let Octant::Internal { children, .. } = &mut self.cells[parent.index()] {
            children[octant] = Some(id);
        }
        id
    }

    /// Turns `leaf` into an internal cell and pushes both its point and
    /// `incoming` down until they occupy different octants.
    fn split(&mut self, leaf: OctantId, incoming: OctreePoint<K>) -> OctantId {
        let mut current = leaf;
        loop {
            let Octant::Leaf { region, point } = self.cells[current.index()].clone() else {
                unreachable!("split target is always a leaf");
            };

            let total = point.mass + incoming.mass;
            self.cells[current.index()] = Octant::Internal {
                region,
                children: [None; 8],
                mass: total,
                center_of_mass: (point.position * point.mass + incoming.position * incoming.mass)
                    * (1.0 / total),
            };

            let existing_octant = region.octant(point.position);
            let incoming_octant = region.octant(incoming.position);
            let existing_key = point.key.clone();
            let moved = self.attach_leaf(current, existing_octant, point);
            self.leaves.insert(existing_key, moved);

            if existing_octant != incoming_octant {
                return self.attach_leaf(current, incoming_octant, incoming);
            }
            current = moved;
        }
    }
}

/// Checks that two points end up in different octants before the depth cap
/// or the floating-point resolution is reached.
fn check_separable(
    mut region: Region,
    existing: Vec3,
    incoming: Vec3,
    mut depth: usize,
) -> Result<(), OctreeError> {
    loop {
        if depth >= MAX_DEPTH || !region.can_subdivide() {
            return Err(OctreeError::Degenerate {
                x: incoming.x,
                y: incoming.y,
                z: incoming.z,
                depth,
            });
        }
        let octant = region.octant(existing);
        if octant != region.octant(incoming) {
            return Ok(());
        }
        region = region.child(octant);
        depth += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    /// Deterministic scatter of points in a cube of side ~2000.
    fn scattered(n: usize) -> Vec<(String, Vec3, f64)> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                let p = Vec3::new(
                    (t * 12.9898).sin() * 1000.0,
                    (t * 78.233).sin() * 1000.0,
                    (t * 37.719).cos() * 1000.0,
                );
                (format!("p{i}"), p, 1.0 + (i % 5) as f64)
            })
            .collect()
    }

    fn assert_aggregates_consistent<K: Clone + Eq + Hash>(tree: &Octree<K>) {
        for id in tree.internal_ids() {
            let cell = tree.octant(id);
            let points = tree.subtree_points(id);
            let mass: f64 = points.iter().map(|p| p.mass).sum();
            let com = points
                .iter()
                .map(|p| p.position * p.mass)
                .sum::<Vec3>()
                * (1.0 / mass);

            assert!((cell.mass() - mass).abs() < EPS * mass.max(1.0));
            assert!(
                cell.center_of_mass().distance(com) < 1e-6,
                "center of mass {:?} != {:?}",
                cell.center_of_mass(),
                com
            );
        }
    }

    #[test]
    fn test_empty_tree() {
        let tree: Octree<String> = Octree::new();
        assert!(tree.is_empty());
        assert!(tree.root().is_none());
        assert_eq!(tree.find_leaf("x"), Err(OctreeError::NotFound));
        assert_eq!(tree.approximate(&"x".to_string(), Vec3::ZERO, 0.5, &|_, _| Vec3::new(1.0, 0.0, 0.0)), Vec3::ZERO);
    }

    #[test]
    fn test_single_point_is_root_leaf() {
        let mut tree = Octree::new();
        let id = tree.insert("a", Vec3::new(3.0, 4.0, 5.0), 2.0).unwrap();
        assert_eq!(tree.root(), Some(id));
        assert!(matches!(tree.octant(id), Octant::Leaf { .. }));
        assert_eq!(tree.aggregate(), Some((2.0, Vec3::new(3.0, 4.0, 5.0))));
    }

    #[test]
    fn test_insert_lookup_round_trip() {
        let points = scattered(500);
        let mut tree = Octree::new();
        for (key, position, mass) in &points {
            tree.insert(key.clone(), *position, *mass).unwrap();
        }

        assert_eq!(tree.len(), points.len());
        for (key, position, mass) in &points {
            let leaf = tree.find_leaf(key.as_str()).unwrap();
            assert_eq!(leaf.position, *position);
            assert_eq!(leaf.mass, *mass);
            assert_eq!(&leaf.key, key);
        }
        assert_eq!(tree.find_leaf("never-inserted"), Err(OctreeError::NotFound));
    }

    #[test]
    fn test_aggregate_invariant_after_every_insert() {
        let mut tree = Octree::new();
        for (key, position, mass) in scattered(120) {
            tree.insert(key, position, mass).unwrap();
            assert_aggregates_consistent(&tree);
        }

        let (mass, _) = tree.aggregate().unwrap();
        let expected: f64 = scattered(120).iter().map(|(_, _, m)| m).sum();
        assert!((mass - expected).abs() < EPS);
    }

    #[test]
    fn test_root_growth_keeps_content() {
        let mut tree = Octree::new();
        tree.insert(0, Vec3::ZERO, 1.0).unwrap();
        tree.insert(1, Vec3::new(0.5, 0.5, 0.5), 1.0).unwrap();
        let far = Vec3::new(-1.0e6, 3.0e5, 2.0e6);
        tree.insert(2, far, 1.0).unwrap();

        let root = tree.octant(tree.root().unwrap()).region();
        assert!(root.contains(far));
        assert!(root.contains(Vec3::ZERO));
        assert_eq!(tree.find_leaf(&0).unwrap().position, Vec3::ZERO);
        assert_eq!(tree.find_leaf(&1).unwrap().position, Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(tree.find_leaf(&2).unwrap().position, far);
        assert_aggregates_consistent(&tree);
    }

    #[test]
    fn test_every_leaf_region_contains_its_point() {
        let mut tree = Octree::new();
        for (key, position, mass) in scattered(200) {
            tree.insert(key, position, mass).unwrap();
        }
        for (key, position, _) in scattered(200) {
            let id = tree.leaf_id(key.as_str()).unwrap();
            assert!(tree.octant(id).region().contains(position));
        }
    }

    #[test]
    fn test_leaf_regions_contain_points_after_growth() {
        let mut tree = Octree::new();
        let first = Vec3::new(0.1, 0.3, 0.7);
        tree.insert("first".to_string(), first, 1.0).unwrap();
        let points = scattered(2999);
        for (key, position, mass) in &points {
            tree.insert(key.clone(), *position, *mass).unwrap();
        }

        let id = tree.leaf_id("first").unwrap();
        assert!(tree.octant(id).region().contains(first));
        for (key, position, _) in &points {
            let id = tree.leaf_id(key.as_str()).unwrap();
            assert!(
                tree.octant(id).region().contains(*position),
                "{key} at {position:?} outside {:?}",
                tree.octant(id).region()
            );
        }
    }

    #[test]
    fn test_grown_root_splits_on_old_bounds() {
        let region = Region::new(Vec3::new(0.1, 0.3, 0.7), 1.0);
        let (grown, octant) = region.grow_toward(Vec3::new(5.0, -5.0, 5.0));
        assert_eq!(octant, 0b010);
        assert_eq!(grown.child(octant), Region { mid: grown.child(octant).mid, ..region });
        assert_eq!(grown.mid.x, region.max.x);
        assert_eq!(grown.mid.y, region.min.y);
    }

    #[test]
    fn test_unreachable_point_is_out_of_range() {
        let mut tree = Octree::with_region(Region::new(Vec3::ZERO, f64::from_bits(1)));
        tree.insert(0, Vec3::ZERO, 1.0).unwrap();

        let err = tree.insert(1, Vec3::new(1e300, 1e300, 1e300), 1.0).unwrap_err();
        assert!(matches!(err, OctreeError::OutOfRange { .. }), "{err:?}");
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.aggregate(), Some((1.0, Vec3::ZERO)));
        assert!(tree.root().is_some_and(|root| tree.octant(root).region().contains(Vec3::ZERO)));
    }

    #[test]
    fn test_coincident_points_are_degenerate() {
        let mut tree = Octree::new();
        tree.insert("a", Vec3::new(1.0, 2.0, 3.0), 1.0).unwrap();
        tree.insert("b", Vec3::new(-4.0, 0.0, 9.0), 1.0).unwrap();
        let cells = tree.cell_count();
        let aggregate = tree.aggregate();

        let err = tree.insert("c", Vec3::new(1.0, 2.0, 3.0), 1.0).unwrap_err();
        assert!(matches!(err, OctreeError::Degenerate { .. }));

        // Nothing was added.
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.cell_count(), cells);
        assert_eq!(tree.aggregate(), aggregate);
        assert_eq!(tree.find_leaf("c"), Err(OctreeError::NotFound));
        assert_aggregates_consistent(&tree);
    }

    #[test]
    fn test_near_duplicate_points_are_separated() {
        let mut tree = Octree::new();
        tree.insert("a", Vec3::new(1.0, 1.0, 1.0), 1.0).unwrap();
        tree.insert("b", Vec3::new(1.0 + 1e-9, 1.0, 1.0), 1.0).unwrap();
        assert_eq!(tree.len(), 2);
        assert_aggregates_consistent(&tree);
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut tree = Octree::new();
        tree.insert("a", Vec3::ZERO, 1.0).unwrap();
        assert_eq!(tree.insert("a", Vec3::new(1.0, 0.0, 0.0), 1.0), Err(OctreeError::DuplicateKey));
        assert_eq!(tree.insert("b", Vec3::new(f64::NAN, 0.0, 0.0), 1.0), Err(OctreeError::NonFinite));
        assert_eq!(tree.insert("c", Vec3::new(1.0, 0.0, 0.0), 0.0), Err(OctreeError::InvalidMass(0.0)));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_center_tie_goes_to_upper_octant() {
        let region = Region::new(Vec3::ZERO, 10.0);
        assert_eq!(region.octant(Vec3::ZERO), 7);
        assert_eq!(region.octant(Vec3::new(-0.1, 0.0, -0.1)), 2);
        assert!(region.child(7).contains(Vec3::ZERO));
        assert!(!region.child(0).contains(Vec3::ZERO));
        assert!(!region.contains(Vec3::new(10.0, 0.0, 0.0)));
        assert!(region.contains(Vec3::new(-10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_symmetric_points_around_root_center() {
        let a = Vec3::new(-541.38, -541.38, -541.38);
        let b = Vec3::new(641.38, 641.38, 641.38);
        let tree = Octree::build(vec![
            OctreePoint { key: 0usize, position: a, mass: 1.0 },
            OctreePoint { key: 1usize, position: b, mass: 1.0 },
        ])
        .unwrap();

        let root = tree.octant(tree.root().unwrap());
        assert!(root.region().contains(a) && root.region().contains(b));
        assert_eq!(tree.find_leaf(&0).unwrap().position, a);
        assert_eq!(tree.find_leaf(&1).unwrap().position, b);
        assert!(tree.aggregate().unwrap().1.distance(Vec3::new(50.0, 50.0, 50.0)) < 1e-9);
        assert_aggregates_consistent(&tree);
    }

    #[test]
    fn test_approximate_skips_self() {
        let points = scattered(64);
        let tree = Octree::build(
            points
                .iter()
                .map(|(k, p, m)| OctreePoint { key: k.clone(), position: *p, mass: *m })
                .collect(),
        )
        .unwrap();

        let (key, position, _) = &points[7];
        let pull = |to: Vec3, mass: f64| {
            let d = to - *position;
            d * (mass / d.length_squared().powf(1.5))
        };

        let direct: Vec3 = points
            .iter()
            .filter(|(k, _, _)| k != key)
            .map(|(_, p, m)| pull(*p, *m))
            .sum();
        // A tiny theta opens every cell, so this is the direct sum minus self.
        let opened = tree.approximate(key, *position, 1e-9, &pull);
        assert!((opened - direct).length() < 1e-12);
    }

    #[test]
    fn test_approximate_far_field_is_close_to_direct_sum() {
        let points = scattered(64);
        let tree = Octree::build(
            points
                .iter()
                .map(|(k, p, m)| OctreePoint { key: k.clone(), position: *p, mass: *m })
                .collect(),
        )
        .unwrap();

        let probe = Vec3::new(3000.0, 500.0, -200.0);
        let pull = |to: Vec3, mass: f64| {
            let d = to - probe;
            d * (mass / d.length_squared().powf(1.5))
        };
        let direct: Vec3 = points.iter().map(|(_, p, m)| pull(*p, *m)).sum();
        let approx = tree.approximate(&"probe".to_string(), probe, 0.3, &pull);

        assert!((approx - direct).length() < 0.05 * direct.length());
    }
}
