//! Closed row schema for the atom and bond tables.
//!
//! Each entity kind owns a static field-descriptor table; table front-ends
//! render columns from it and route edits back through [`apply_field`].

use crate::model::{Atom, AtomId, Bond, Graph};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Atom,
    Bond,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Atom => write!(f, "atom"),
            EntityKind::Bond => write!(f, "bond"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
}

/// One editable (or read-only) column of an entity table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub read_only: bool,
    /// Increment used by spinner-style editors
    pub step: f64,
}

const fn field(key: &'static str, kind: FieldKind, read_only: bool, step: f64) -> FieldDescriptor {
    FieldDescriptor {
        key,
        label: key,
        kind,
        read_only,
        step,
    }
}

const ATOM_FIELDS: &[FieldDescriptor] = &[
    field("id", FieldKind::Integer, true, 1.0),
    field("x", FieldKind::Float, false, 0.001),
    field("y", FieldKind::Float, false, 0.001),
];

const BOND_FIELDS: &[FieldDescriptor] = &[
    field("id", FieldKind::Integer, true, 1.0),
    field("i", FieldKind::Integer, false, 1.0),
    field("j", FieldKind::Integer, false, 1.0),
    field("k", FieldKind::Float, false, 0.001),
];

impl EntityKind {
    pub fn fields(self) -> &'static [FieldDescriptor] {
        match self {
            EntityKind::Atom => ATOM_FIELDS,
            EntityKind::Bond => BOND_FIELDS,
        }
    }

    pub fn field(self, key: &str) -> Option<&'static FieldDescriptor> {
        self.fields().iter().find(|f| f.key == key)
    }

    /// Table title
    pub fn title(self) -> &'static str {
        match self {
            EntityKind::Atom => "Atoms",
            EntityKind::Bond => "Bonds",
        }
    }
}

/// A row borrowed from the graph
#[derive(Debug, Clone, Copy)]
pub enum EntityRow<'a> {
    Atom(&'a Atom),
    Bond(&'a Bond),
}

impl EntityRow<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRow::Atom(_) => EntityKind::Atom,
            EntityRow::Bond(_) => EntityKind::Bond,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            EntityRow::Atom(a) => a.id,
            EntityRow::Bond(b) => b.id,
        }
    }

    /// Numeric value of a column, `None` for an unknown key
    pub fn get(&self, key: &str) -> Option<f64> {
        match (self, key) {
            (EntityRow::Atom(a), "id") => Some(a.id as f64),
            (EntityRow::Atom(a), "x") => Some(a.x),
            (EntityRow::Atom(a), "y") => Some(a.y),
            (EntityRow::Bond(b), "id") => Some(b.id as f64),
            (EntityRow::Bond(b), "i") => Some(b.i as f64),
            (EntityRow::Bond(b), "j") => Some(b.j as f64),
            (EntityRow::Bond(b), "k") => Some(b.k),
            _ => None,
        }
    }
}

/// Rows of one kind, in id order
pub fn rows(graph: &Graph, kind: EntityKind) -> Vec<EntityRow<'_>> {
    match kind {
        EntityKind::Atom => graph.atoms().map(EntityRow::Atom).collect(),
        EntityKind::Bond => graph.bonds().map(EntityRow::Bond).collect(),
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("{kind} has no field `{key}`")]
    UnknownField { kind: EntityKind, key: String },

    #[error("field `{0}` is read-only")]
    ReadOnly(&'static str),

    #[error("value for `{0}` must be a finite number")]
    NotFinite(&'static str),

    #[error("value for `{0}` must be a positive integer")]
    NotInteger(&'static str),

    #[error("{kind} {id} not found")]
    UnknownRow { kind: EntityKind, id: u64 },

    #[error("bond endpoint rejected: {0}")]
    InvalidEndpoint(String),
}

/// Write `value` into column `key` of row `id`, enforcing the descriptor
/// table and the bond integrity rules.
pub fn apply_field(
    graph: &mut Graph,
    kind: EntityKind,
    id: u64,
    key: &str,
    value: f64,
) -> Result<(), FieldError> {
    let descriptor = kind.field(key).ok_or_else(|| FieldError::UnknownField {
        kind,
        key: key.to_string(),
    })?;
    if descriptor.read_only {
        return Err(FieldError::ReadOnly(descriptor.key));
    }
    if !value.is_finite() {
        return Err(FieldError::NotFinite(descriptor.key));
    }
    if descriptor.kind == FieldKind::Integer && (value.fract() != 0.0 || value < 1.0) {
        return Err(FieldError::NotInteger(descriptor.key));
    }

    match kind {
        EntityKind::Atom => {
            let atom = graph
                .atom_mut(id)
                .ok_or(FieldError::UnknownRow { kind, id })?;
            match descriptor.key {
                "x" => atom.x = value,
                _ => atom.y = value,
            }
        }
        EntityKind::Bond => {
            let bond = *graph.bond(id).ok_or(FieldError::UnknownRow { kind, id })?;
            let mut next = bond;
            match descriptor.key {
                "k" => next.k = value,
                "i" => next.i = value as AtomId,
                _ => next.j = value as AtomId,
            }
            if next.i != bond.i || next.j != bond.j {
                check_endpoints(graph, &next)?;
            }
            graph.insert_bond(next);
        }
    }
    Ok(())
}

fn check_endpoints(graph: &Graph, bond: &Bond) -> Result<(), FieldError> {
    for end in [bond.i, bond.j] {
        if !graph.contains_atom(end) {
            return Err(FieldError::InvalidEndpoint(format!("atom {end} does not exist")));
        }
    }
    if bond.is_self_loop() {
        return Err(FieldError::InvalidEndpoint(format!(
            "bond {} would connect atom {} to itself",
            bond.id, bond.i
        )));
    }
    if graph
        .bonds()
        .any(|other| other.id != bond.id && other.connects(bond.i, bond.j))
    {
        return Err(FieldError::InvalidEndpoint(format!(
            "atoms {} and {} are already bonded",
            bond.i, bond.j
        )));
    }
    Ok(())
}
