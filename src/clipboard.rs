use crate::model::{Atom, AtomId, Bond, Graph};
use crate::selection::Selection;
use std::collections::{HashMap, HashSet};

/// Offset applied to pasted coordinates, graph units
pub const DEFAULT_PASTE_OFFSET: f64 = 0.06;

/// Copied atoms plus the bonds among them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipboardBuffer {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
}

impl ClipboardBuffer {
    /// Snapshot the selected atoms and every bond with both ends selected.
    /// Stale ids in the selection are ignored.
    pub fn from_selection(graph: &Graph, selection: &Selection) -> Self {
        let atoms: Vec<Atom> = selection
            .iter()
            .filter_map(|id| graph.atom(id).copied())
            .collect();
        let ids: HashSet<AtomId> = atoms.iter().map(|a| a.id).collect();
        Self {
            atoms,
            bonds: graph.bonds_within(&ids),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Insert a copy of the buffer into `graph` under fresh ids.
    ///
    /// Atom ids are allocated from `max + 1` in ascending order of the
    /// original id, bond ids likewise. Returns the new atom ids.
    pub fn paste_into(&self, graph: &mut Graph, offset: f64) -> Vec<AtomId> {
        let mut originals: Vec<&Atom> = self.atoms.iter().collect();
        originals.sort_by_key(|a| a.id);

        let mut remap: HashMap<AtomId, AtomId> = HashMap::with_capacity(originals.len());
        let mut next_atom = graph.next_atom_id();
        for atom in originals {
            if remap.contains_key(&atom.id) {
                continue;
            }
            remap.insert(atom.id, next_atom);
            graph.insert_atom(Atom::new(next_atom, atom.x + offset, atom.y + offset));
            next_atom += 1;
        }

        let mut bonds: Vec<&Bond> = self.bonds.iter().collect();
        bonds.sort_by_key(|b| b.id);
        let mut next_bond = graph.next_bond_id();
        for bond in bonds {
            let (Some(&i), Some(&j)) = (remap.get(&bond.i), remap.get(&bond.j)) else {
                continue;
            };
            graph.insert_bond(Bond::new(next_bond, i, j, bond.k));
            next_bond += 1;
        }

        let mut new_ids: Vec<AtomId> = remap.into_values().collect();
        new_ids.sort_unstable();
        new_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Graph {
        Graph::from_parts(
            [
                Atom::new(1, 0.0, 0.0),
                Atom::new(2, 1.0, 0.0),
                Atom::new(3, 2.0, 0.0),
            ],
            [Bond::new(1, 1, 2, 4.0), Bond::new(5, 2, 3, 1.0)],
        )
    }

    #[test]
    fn test_copy_keeps_internal_bonds_only() {
        let graph = sample();
        let selection: Selection = [1, 2, 42].into_iter().collect();
        let clip = ClipboardBuffer::from_selection(&graph, &selection);

        assert_eq!(clip.atoms().len(), 2);
        assert_eq!(clip.bonds(), &[Bond::new(1, 1, 2, 4.0)]);
    }

    #[test]
    fn test_paste_remaps_ids() {
        let mut graph = sample();
        let selection: Selection = [2, 1].into_iter().collect();
        let clip = ClipboardBuffer::from_selection(&graph, &selection);

        let new_ids = clip.paste_into(&mut graph, DEFAULT_PASTE_OFFSET);
        assert_eq!(new_ids, vec![4, 5]);

        let copy = graph.atom(4).unwrap();
        assert!((copy.x - 0.06).abs() < 1e-12);
        assert!((copy.y - 0.06).abs() < 1e-12);

        let bond = graph.bond(6).unwrap();
        assert_eq!((bond.i, bond.j, bond.k), (4, 5, 4.0));
        assert_eq!(graph.bond_count(), 3);
    }

    #[test]
    fn test_paste_empty_buffer() {
        let mut graph = sample();
        assert!(ClipboardBuffer::default().paste_into(&mut graph, 1.0).is_empty());
        assert_eq!(graph, sample());
    }
}
