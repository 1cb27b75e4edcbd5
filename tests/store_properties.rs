mod fixtures;

use fixtures::sample_graphs::{square_lattice, triangle};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use spring_network_editor::{Atom, Bond, Graph, GraphStore, Point};

#[derive(Debug, Clone)]
enum Op {
    AddAtom,
    AddBond(u64, u64, f64),
    RemoveAtom(u64),
    RemoveAtoms(Vec<u64>),
    Move(u64, f64, f64),
    SetStiffness(u64, f64),
    ClearBonds,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::AddAtom),
        3 => (1u64..12, 1u64..12, prop::sample::select(vec![0.5, 1.0, 2.5]))
            .prop_map(|(i, j, k)| Op::AddBond(i, j, k)),
        1 => (1u64..12).prop_map(Op::RemoveAtom),
        1 => prop::collection::vec(1u64..12, 0..4).prop_map(Op::RemoveAtoms),
        2 => (1u64..12, -20i32..20, -20i32..20)
            .prop_map(|(id, x, y)| Op::Move(id, f64::from(x) * 0.5, f64::from(y) * 0.5)),
        1 => (1u64..20, prop::sample::select(vec![0.5, 1.0, 2.5]))
            .prop_map(|(id, k)| Op::SetStiffness(id, k)),
        1 => Just(Op::ClearBonds),
    ]
}

/// Apply `op` and report whether the store wrote a history entry
fn apply(store: &mut GraphStore, op: &Op) -> bool {
    match op {
        Op::AddAtom => {
            store.add_atom();
            true
        }
        Op::AddBond(i, j, k) => store.add_bond_between(*i, *j, *k).is_some(),
        Op::RemoveAtom(id) => store.remove_atom(*id),
        Op::RemoveAtoms(ids) => store.remove_by_ids(ids),
        Op::Move(id, x, y) => store.move_atoms(&[(*id, Point::new(*x, *y))]),
        Op::SetStiffness(id, k) => store.set_bond_stiffness(*id, *k),
        Op::ClearBonds => store.clear_bonds(),
    }
}

fn assert_integrity(graph: &Graph) -> Result<(), TestCaseError> {
    for bond in graph.bonds() {
        prop_assert!(bond.i != bond.j);
        prop_assert!(graph.contains_atom(bond.i));
        prop_assert!(graph.contains_atom(bond.j));
        let twins = graph
            .bonds()
            .filter(|other| other.connects(bond.i, bond.j))
            .count();
        prop_assert_eq!(twins, 1);
    }
    Ok(())
}

fn check_undo_redo_walks_history(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let mut store = GraphStore::new(triangle());
    let mut history = vec![store.graph().clone()];

    for op in &ops {
        let before = store.graph().clone();
        let committed = apply(&mut store, op);
        prop_assert_eq!(committed, store.graph() != &before);
        if committed {
            history.push(store.graph().clone());
        }
        assert_integrity(store.graph())?;
    }
    prop_assert_eq!(store.undo_depth(), history.len() - 1);

    for expected in history.iter().rev().skip(1) {
        prop_assert!(store.undo());
        prop_assert_eq!(store.graph(), expected);
    }
    prop_assert!(!store.undo());

    for expected in history.iter().skip(1) {
        prop_assert!(store.redo());
        prop_assert_eq!(store.graph(), expected);
    }
    prop_assert!(!store.redo());
    Ok(())
}

fn check_remove_cascades(ids: Vec<u64>) -> Result<(), TestCaseError> {
    let mut store = GraphStore::new(square_lattice(4));
    store.remove_by_ids(&ids);

    for id in &ids {
        prop_assert!(!store.graph().contains_atom(*id));
        prop_assert!(store.graph().bonds().all(|b| !b.involves(*id)));
    }
    assert_integrity(store.graph())?;
    Ok(())
}

fn check_bond_pairs_are_undirected(i: u64, j: u64) -> Result<(), TestCaseError> {
    let mut store = GraphStore::new(Graph::from_parts(
        (1..=6).map(|id| Atom::new(id, id as f64, 0.0)),
        [],
    ));
    let first = store.add_bond_between(i, j, 1.0);
    prop_assert_eq!(first.is_some(), i != j);
    prop_assert!(store.add_bond_between(j, i, 2.0).is_none());
    prop_assert_eq!(store.graph().bond_count(), usize::from(i != j));
    Ok(())
}

proptest! {
    #[test]
    fn undo_redo_walks_history(ops in prop::collection::vec(op_strategy(), 0..40)) {
        check_undo_redo_walks_history(ops)?;
    }

    #[test]
    fn remove_cascades_to_bonds(ids in prop::collection::vec(1u64..20, 0..8)) {
        check_remove_cascades(ids)?;
    }

    #[test]
    fn bond_pairs_are_undirected(i in 1u64..=6, j in 1u64..=6) {
        check_bond_pairs_are_undirected(i, j)?;
    }
}

#[test]
fn identity_commit_writes_no_history() {
    let mut store = GraphStore::new(triangle());
    assert!(!store.commit("noop", |_| {}));
    assert!(!store.move_atoms(&[(1, Point::new(0.0, 0.0))]));
    assert!(!store.set_bond_stiffness(2, 2.0));
    assert!(!store.can_undo());
}

#[test]
fn new_commit_clears_redo() {
    let mut store = GraphStore::new(triangle());
    store.add_atom();
    store.undo();
    assert!(store.can_redo());

    store.remove_bond(1);
    assert!(!store.can_redo());
    assert_eq!(store.graph().bond_count(), 2);
}

#[test]
fn seeding_repairs_integrity() {
    let mut graph = triangle();
    graph.insert_bond(Bond::new(9, 2, 1, 5.0));
    graph.insert_bond(Bond::new(10, 3, 3, 1.0));
    graph.insert_bond(Bond::new(11, 3, 42, 1.0));

    let store = GraphStore::new(graph);
    assert_eq!(store.graph(), &triangle());
    assert!(!store.can_undo());
}
