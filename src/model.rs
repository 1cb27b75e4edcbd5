use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Atom identifier (positive, unique among atoms)
pub type AtomId = u64;

/// Bond identifier (unique among bonds, independent of atom ids)
pub type BondId = u64;

/// Stiffness used when a bond is created without an explicit coefficient
pub const DEFAULT_STIFFNESS: f64 = 1.0;

/// A point in graph space
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// A network vertex with a 2D position
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Atom {
    pub id: AtomId,
    pub x: f64,
    pub y: f64,
}

impl Atom {
    pub fn new(id: AtomId, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn set_position(&mut self, p: Point) {
        self.x = p.x;
        self.y = p.y;
    }
}

/// An edge between two atoms carrying a stiffness coefficient
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bond {
    pub id: BondId,
    pub i: AtomId,
    pub j: AtomId,
    pub k: f64,
}

impl Bond {
    pub fn new(id: BondId, i: AtomId, j: AtomId, k: f64) -> Self {
        Self { id, i, j, k }
    }

    /// Check if this bond touches a given atom
    pub fn involves(&self, atom: AtomId) -> bool {
        self.i == atom || self.j == atom
    }

    /// Check if this bond joins `a` and `b`, in either direction
    pub fn connects(&self, a: AtomId, b: AtomId) -> bool {
        (self.i == a && self.j == b) || (self.i == b && self.j == a)
    }

    /// The opposite endpoint, if `atom` is one of the ends
    pub fn other_end(&self, atom: AtomId) -> Option<AtomId> {
        if self.i == atom {
            Some(self.j)
        } else if self.j == atom {
            Some(self.i)
        } else {
            None
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.i == self.j
    }

    /// Unordered endpoint pair, smallest id first
    pub fn endpoints(&self) -> (AtomId, AtomId) {
        if self.i <= self.j {
            (self.i, self.j)
        } else {
            (self.j, self.i)
        }
    }
}

/// Bonds dropped while restoring graph integrity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub dangling: usize,
    pub self_loops: usize,
    pub duplicates: usize,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.dangling + self.self_loops + self.duplicates
    }
}

/// Atoms and bonds keyed by id
///
/// Both collections iterate in ascending id order, which keeps export and
/// structural comparison deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    atoms: BTreeMap<AtomId, Atom>,
    bonds: BTreeMap<BondId, Bond>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from raw rows. A later row with a repeated id wins.
    pub fn from_parts(
        atoms: impl IntoIterator<Item = Atom>,
        bonds: impl IntoIterator<Item = Bond>,
    ) -> Self {
        Self {
            atoms: atoms.into_iter().map(|a| (a.id, a)).collect(),
            bonds: bonds.into_iter().map(|b| (b.id, b)).collect(),
        }
    }

    // ========== Atoms ==========

    pub fn atoms(&self) -> impl DoubleEndedIterator<Item = &Atom> {
        self.atoms.values()
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(&id)
    }

    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(&id)
    }

    pub fn contains_atom(&self, id: AtomId) -> bool {
        self.atoms.contains_key(&id)
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn atom_ids(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.atoms.keys().copied()
    }

    /// Next free atom id: `max + 1`, or 1 for an empty graph
    pub fn next_atom_id(&self) -> AtomId {
        self.atoms.keys().next_back().map_or(1, |max| max + 1)
    }

    pub fn insert_atom(&mut self, atom: Atom) {
        self.atoms.insert(atom.id, atom);
    }

    /// Remove an atom and every bond touching it
    pub fn remove_atom(&mut self, id: AtomId) -> Option<Atom> {
        let removed = self.atoms.remove(&id)?;
        self.bonds.retain(|_, b| !b.involves(id));
        Some(removed)
    }

    /// Remove several atoms and their bonds. Unknown ids are ignored.
    pub fn remove_atoms(&mut self, ids: &HashSet<AtomId>) -> usize {
        let before = self.atoms.len();
        self.atoms.retain(|id, _| !ids.contains(id));
        self.bonds
            .retain(|_, b| !ids.contains(&b.i) && !ids.contains(&b.j));
        before - self.atoms.len()
    }

    pub fn clear_atoms(&mut self) {
        self.atoms.clear();
        self.bonds.clear();
    }

    // ========== Bonds ==========

    pub fn bonds(&self) -> impl DoubleEndedIterator<Item = &Bond> {
        self.bonds.values()
    }

    pub fn bond(&self, id: BondId) -> Option<&Bond> {
        self.bonds.get(&id)
    }

    pub fn bond_mut(&mut self, id: BondId) -> Option<&mut Bond> {
        self.bonds.get_mut(&id)
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// Next free bond id: `max + 1`, or 1 when there are no bonds
    pub fn next_bond_id(&self) -> BondId {
        self.bonds.keys().next_back().map_or(1, |max| max + 1)
    }

    pub fn insert_bond(&mut self, bond: Bond) {
        self.bonds.insert(bond.id, bond);
    }

    pub fn remove_bond(&mut self, id: BondId) -> Option<Bond> {
        self.bonds.remove(&id)
    }

    pub fn clear_bonds(&mut self) {
        self.bonds.clear();
    }

    pub fn has_bond_between(&self, a: AtomId, b: AtomId) -> bool {
        self.bonds.values().any(|bond| bond.connects(a, b))
    }

    /// Bonds whose both endpoints are in `ids`
    pub fn bonds_within(&self, ids: &HashSet<AtomId>) -> Vec<Bond> {
        self.bonds
            .values()
            .filter(|b| ids.contains(&b.i) && ids.contains(&b.j))
            .copied()
            .collect()
    }

    /// Midpoint of a bond, if both endpoints exist
    pub fn bond_midpoint(&self, id: BondId) -> Option<Point> {
        let bond = self.bonds.get(&id)?;
        let a = self.atoms.get(&bond.i)?;
        let b = self.atoms.get(&bond.j)?;
        Some(a.position().midpoint(&b.position()))
    }

    /// Current endpoint distance of a bond
    pub fn bond_length(&self, bond: &Bond) -> Option<f64> {
        let a = self.atoms.get(&bond.i)?;
        let b = self.atoms.get(&bond.j)?;
        Some(a.position().distance(&b.position()))
    }

    // ========== Topology queries ==========

    /// Neighbour sets for every atom that has at least one bond
    pub fn adjacency(&self) -> BTreeMap<AtomId, BTreeSet<AtomId>> {
        let mut adjacency: BTreeMap<AtomId, BTreeSet<AtomId>> = BTreeMap::new();
        for bond in self.bonds.values() {
            if bond.is_self_loop() {
                continue;
            }
            adjacency.entry(bond.i).or_default().insert(bond.j);
            adjacency.entry(bond.j).or_default().insert(bond.i);
        }
        adjacency
    }

    /// Axis-aligned bounds of all atom positions
    pub fn bounding_box(&self) -> Option<(Point, Point)> {
        let mut atoms = self.atoms.values();
        let first = atoms.next()?;
        let mut min = first.position();
        let mut max = first.position();
        for atom in atoms {
            min.x = min.x.min(atom.x);
            min.y = min.y.min(atom.y);
            max.x = max.x.max(atom.x);
            max.y = max.y.max(atom.y);
        }
        Some((min, max))
    }

    /// Every coordinate and stiffness is a finite number
    pub fn is_finite(&self) -> bool {
        self.atoms.values().all(|a| a.x.is_finite() && a.y.is_finite())
            && self.bonds.values().all(|b| b.k.is_finite())
    }

    /// Drop bonds that reference missing atoms, self-loops, and repeated
    /// undirected pairs (the lowest bond id of a pair survives).
    pub fn repair_integrity(&mut self) -> IntegrityReport {
        let mut report = IntegrityReport::default();
        let mut seen: HashSet<(AtomId, AtomId)> = HashSet::new();
        let atoms = &self.atoms;

        self.bonds.retain(|_, bond| {
            if !atoms.contains_key(&bond.i) || !atoms.contains_key(&bond.j) {
                report.dangling += 1;
                return false;
            }
            if bond.is_self_loop() {
                report.self_loops += 1;
                return false;
            }
            if !seen.insert(bond.endpoints()) {
                report.duplicates += 1;
                return false;
            }
            true
        });

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Graph {
        Graph::from_parts(
            [
                Atom::new(1, 0.0, 0.0),
                Atom::new(2, 1.0, 0.0),
                Atom::new(3, 0.0, 1.0),
            ],
            [
                Bond::new(1, 1, 2, 2.0),
                Bond::new(2, 1, 3, 2.0),
                Bond::new(3, 2, 3, 5.0),
            ],
        )
    }

    #[test]
    fn test_next_ids() {
        let graph = Graph::new();
        assert_eq!(graph.next_atom_id(), 1);
        assert_eq!(graph.next_bond_id(), 1);

        let graph = Graph::from_parts([Atom::new(7, 0.0, 0.0), Atom::new(3, 0.0, 0.0)], []);
        assert_eq!(graph.next_atom_id(), 8);
    }

    #[test]
    fn test_bond_connects_either_direction() {
        let bond = Bond::new(1, 4, 9, 1.0);
        assert!(bond.connects(4, 9));
        assert!(bond.connects(9, 4));
        assert!(!bond.connects(4, 4));
        assert_eq!(bond.other_end(9), Some(4));
        assert_eq!(bond.other_end(5), None);
        assert_eq!(Bond::new(2, 9, 4, 1.0).endpoints(), (4, 9));
    }

    #[test]
    fn test_remove_atom_cascades() {
        let mut graph = triangle();
        graph.remove_atom(1).unwrap();

        assert_eq!(graph.atom_count(), 2);
        assert_eq!(graph.bond_count(), 1);
        assert!(graph.bonds().all(|b| !b.involves(1)));
    }

    #[test]
    fn test_remove_atoms_ignores_unknown() {
        let mut graph = triangle();
        let ids: HashSet<AtomId> = [2, 42].into_iter().collect();

        assert_eq!(graph.remove_atoms(&ids), 1);
        assert_eq!(graph.bond_count(), 1);
    }

    #[test]
    fn test_adjacency() {
        let adjacency = triangle().adjacency();
        assert_eq!(adjacency[&1], BTreeSet::from([2, 3]));
        assert_eq!(adjacency[&3], BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_bounding_box() {
        assert!(Graph::new().bounding_box().is_none());
        let (min, max) = triangle().bounding_box().unwrap();
        assert_eq!(min, Point::new(0.0, 0.0));
        assert_eq!(max, Point::new(1.0, 1.0));
    }

    #[test]
    fn test_repair_integrity() {
        let mut graph = Graph::from_parts(
            [Atom::new(1, 0.0, 0.0), Atom::new(2, 1.0, 0.0)],
            [
                Bond::new(1, 1, 2, 1.0),
                Bond::new(2, 2, 1, 3.0),
                Bond::new(3, 1, 1, 1.0),
                Bond::new(4, 1, 99, 1.0),
            ],
        );

        let report = graph.repair_integrity();
        assert_eq!(
            report,
            IntegrityReport {
                dangling: 1,
                self_loops: 1,
                duplicates: 1
            }
        );
        assert_eq!(graph.bond_count(), 1);
        assert_eq!(graph.bond(1).unwrap().k, 1.0);
    }

    #[test]
    fn test_is_finite() {
        let mut graph = triangle();
        assert!(graph.is_finite());
        graph.bond_mut(2).unwrap().k = f64::INFINITY;
        assert!(!graph.is_finite());

        let mut graph = triangle();
        graph.atom_mut(3).unwrap().y = f64::NAN;
        assert!(!graph.is_finite());
    }

    #[test]
    fn test_bond_midpoint_and_length() {
        let graph = triangle();
        assert_eq!(graph.bond_midpoint(1), Some(Point::new(0.5, 0.0)));
        let bond = *graph.bond(3).unwrap();
        assert!((graph.bond_length(&bond).unwrap() - 2f64.sqrt()).abs() < 1e-12);
    }
}
