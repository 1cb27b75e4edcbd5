use crate::model::{AtomId, Graph};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Cardinality of the selection, which drives toolbar affordances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Empty,
    Single(AtomId),
    Multiple(usize),
}

/// Set of selected atom ids, iterated in ascending order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
    ids: BTreeSet<AtomId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(&self) -> SelectionKind {
        match self.ids.len() {
            0 => SelectionKind::Empty,
            1 => self
                .ids
                .first()
                .map_or(SelectionKind::Empty, |id| SelectionKind::Single(*id)),
            n => SelectionKind::Multiple(n),
        }
    }

    pub fn contains(&self, id: AtomId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.ids.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<AtomId> {
        self.iter().collect()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Replace the selection with exactly `id`
    pub fn select_only(&mut self, id: AtomId) {
        self.ids.clear();
        self.ids.insert(id);
    }

    /// Replace the selection with `ids`
    pub fn replace(&mut self, ids: impl IntoIterator<Item = AtomId>) {
        self.ids = ids.into_iter().collect();
    }

    /// Flip membership of `id`; returns whether it is now selected
    pub fn toggle(&mut self, id: AtomId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    /// Drop ids that no longer exist in `graph`
    pub fn retain_existing(&mut self, graph: &Graph) -> usize {
        let before = self.ids.len();
        self.ids.retain(|id| graph.contains_atom(*id));
        before - self.ids.len()
    }
}

impl FromIterator<AtomId> for Selection {
    fn from_iter<T: IntoIterator<Item = AtomId>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
