//! LAMMPS-style data file codec.
//!
//! [`generate`] is a pure function of the graph; [`parse`] recovers atoms and
//! bonds from any text, skipping lines it cannot read.

use crate::model::{Atom, AtomId, Bond, Graph};
use crate::topology::{infer_angles, BondTypes, ANGLE_STIFFNESS};
use log::{debug, warn};
use regex::Regex;
use std::collections::HashMap;
use std::io::Write;
use std::sync::LazyLock;
use thiserror::Error;

/// Padding added around the atom bounding box, graph units
pub const BOX_PADDING: f64 = 2.0;

/// Half-thickness of the box along z
pub const Z_HALF_EXTENT: f64 = 0.5;

/// Mass of the single atom type
pub const ATOM_MASS: f64 = 100000.0;

/// Title line of generated files. [`parse`] skips any text that precedes the
/// first recognized section header, so the title is never read back.
pub const TITLE: &str = "Spring network topology";

/// Placeholder written to `Angle Coeffs` when the network has no angles
const FALLBACK_THETA0: f64 = 120.0;

const SECTION_NAMES: &[&str] = &[
    "Masses",
    "Atoms",
    "Velocities",
    "Bonds",
    "Angles",
    "Dihedrals",
    "Impropers",
    "Ellipsoids",
    "Lines",
    "Triangles",
    "Bodies",
    "Pair Coeffs",
    "PairIJ Coeffs",
    "Bond Coeffs",
    "Angle Coeffs",
    "Dihedral Coeffs",
    "Improper Coeffs",
    "BondBond Coeffs",
    "BondAngle Coeffs",
];

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z ]*[A-Za-z])\s*(?:#\s*(\S*).*)?$")
        .unwrap_or_else(|e| panic!("section header pattern is invalid: {e}"))
});

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("cannot export a network without bonds")]
    NoBonds,

    #[error("failed to write data file: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

// ========== Export ==========

/// Render the graph as a data file.
///
/// Fails only when the graph has no bonds.
pub fn generate(graph: &Graph) -> Result<String, CodecError> {
    let mut graph = graph.clone();
    let report = graph.repair_integrity();
    if !report.is_clean() {
        warn!(dropped = report.total(); "Skipping inconsistent bonds during export");
    }
    if graph.bond_count() == 0 {
        return Err(CodecError::NoBonds);
    }

    let bond_types = BondTypes::from_graph(&graph);
    let angles = infer_angles(&graph);
    let angle_types = angles.len().max(1);

    let mut lines: Vec<String> = Vec::new();
    lines.push(TITLE.to_string());
    lines.push(String::new());
    lines.push(format!("{} atoms", graph.atom_count()));
    lines.push(format!("{} bonds", graph.bond_count()));
    lines.push(format!("{} angles", angles.len()));
    lines.push("1 atom types".to_string());
    lines.push(format!("{} bond types", bond_types.len()));
    lines.push(format!("{angle_types} angle types"));
    lines.push(String::new());

    let (min, max) = graph.bounding_box().unwrap_or_default();
    lines.push(format!(
        "{:.6} {:.6} xlo xhi",
        min.x - BOX_PADDING,
        max.x + BOX_PADDING
    ));
    lines.push(format!(
        "{:.6} {:.6} ylo yhi",
        min.y - BOX_PADDING,
        max.y + BOX_PADDING
    ));
    lines.push(format!("{:.6} {:.6} zlo zhi", -Z_HALF_EXTENT, Z_HALF_EXTENT));
    lines.push(format!("{:.6} {:.6} {:.6} xy xz yz", 0.0, 0.0, 0.0));
    lines.push(String::new());

    section(&mut lines, "Masses");
    lines.push(format!("1 {ATOM_MASS:.6}"));
    lines.push(String::new());

    section(&mut lines, "Atoms");
    for atom in graph.atoms() {
        // id mol type q x y z
        lines.push(format!(
            "{} 1 1 {:.6} {:.6} {:.6} {:.6}",
            atom.id, 0.0, atom.x, atom.y, 0.0
        ));
    }
    lines.push(String::new());

    section(&mut lines, "Bonds");
    for bond in graph.bonds() {
        let t = bond_types.type_of(bond.k).unwrap_or(1);
        lines.push(format!("{} {} {} {}", bond.id, t, bond.i, bond.j));
    }
    lines.push(String::new());

    section(&mut lines, "Angles");
    for (idx, angle) in angles.iter().enumerate() {
        // each angle instance is its own type
        let n = idx + 1;
        lines.push(format!(
            "{} {} {} {} {}",
            n, n, angle.first, angle.center, angle.second
        ));
    }
    lines.push(String::new());

    section(&mut lines, "Bond Coeffs");
    for (t, k) in bond_types.iter() {
        let r0 = graph
            .bonds()
            .find(|b| b.k == k)
            .and_then(|b| graph.bond_length(b))
            .unwrap_or(0.0);
        lines.push(format!("{t} {k:.6} {r0:.6}"));
    }
    lines.push(String::new());

    section(&mut lines, "Angle Coeffs");
    if angles.is_empty() {
        lines.push(format!("1 {ANGLE_STIFFNESS:.6} {FALLBACK_THETA0:.6}"));
    }
    for (idx, angle) in angles.iter().enumerate() {
        lines.push(format!(
            "{} {:.6} {:.6}",
            idx + 1,
            ANGLE_STIFFNESS,
            angle.theta0
        ));
    }
    lines.push(String::new());

    debug!(
        atoms = graph.atom_count(),
        bonds = graph.bond_count(),
        angles = angles.len(),
        bond_types = bond_types.len();
        "Generated data file"
    );
    Ok(lines.join("\n"))
}

/// Write the generated data file to `writer`
pub fn write<W: Write>(mut writer: W, graph: &Graph) -> Result<(), CodecError> {
    let text = generate(graph)?;
    writer.write_all(text.as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn section(lines: &mut Vec<String>, name: &str) {
    lines.push(name.to_string());
    lines.push(String::new());
}

// ========== Import ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Atoms(AtomStyle),
    Bonds,
    BondCoeffs,
    Ignored,
}

/// Column layout of `Atoms` rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AtomStyle {
    /// id type x y z
    Atomic,
    /// id mol type x y z
    Molecular,
    /// id mol type q x y z
    Full,
    /// Inferred from the row width
    Unknown,
}

impl AtomStyle {
    fn from_hint(hint: Option<&str>) -> Self {
        match hint {
            Some("atomic") => AtomStyle::Atomic,
            Some("bond" | "angle" | "molecular") => AtomStyle::Molecular,
            Some("full") => AtomStyle::Full,
            _ => AtomStyle::Unknown,
        }
    }

    fn x_column(self, width: usize) -> Option<usize> {
        let column = match self {
            AtomStyle::Atomic => 2,
            AtomStyle::Molecular => 3,
            AtomStyle::Full => 4,
            AtomStyle::Unknown => match width {
                0..=4 => return None,
                5 => 2,
                6 => 3,
                _ => 4,
            },
        };
        (column + 1 < width).then_some(column)
    }
}

fn match_header(line: &str) -> Option<Section> {
    let caps = SECTION_HEADER.captures(line)?;
    let name = caps.get(1)?.as_str();
    if !SECTION_NAMES.contains(&name) {
        return None;
    }
    let section = match name {
        "Atoms" => Section::Atoms(AtomStyle::from_hint(caps.get(2).map(|m| m.as_str()))),
        "Bonds" => Section::Bonds,
        "Bond Coeffs" => Section::BondCoeffs,
        _ => Section::Ignored,
    };
    Some(section)
}

/// Every whitespace-separated token as a number, comments stripped
fn numeric_row(line: &str) -> Option<Vec<f64>> {
    let data = line.split('#').next().unwrap_or_default();
    let values: Vec<f64> = data
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<Result<_, _>>()
        .ok()?;
    (!values.is_empty() && values.iter().all(|v| v.is_finite())).then_some(values)
}

fn to_id(v: f64) -> Option<u64> {
    (v >= 1.0 && v.fract() == 0.0 && v <= u64::MAX as f64).then_some(v as u64)
}

/// Recover atoms and bonds from a data file.
///
/// Bond stiffness comes from the `Bond Coeffs` entry of the bond's type,
/// defaulting to 1. Masses, angles and other coefficient sections are ignored.
pub fn parse(text: &str) -> Graph {
    let mut section: Option<Section> = None;
    let mut atoms: Vec<Atom> = Vec::new();
    let mut typed_bonds: Vec<(u64, Bond)> = Vec::new();
    let mut coeffs: HashMap<u64, f64> = HashMap::new();
    let mut skipped = 0usize;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(next) = match_header(line) {
            section = Some(next);
            continue;
        }
        let Some(current) = section else {
            continue;
        };
        if current == Section::Ignored {
            continue;
        }
        let Some(row) = numeric_row(line) else {
            skipped += 1;
            continue;
        };

        let accepted = match current {
            Section::Atoms(style) => parse_atom(&row, style).map(|a| atoms.push(a)),
            Section::Bonds => parse_bond(&row).map(|b| typed_bonds.push(b)),
            Section::BondCoeffs => to_id(row[0])
                .filter(|_| row.len() >= 2)
                .map(|t| {
                    coeffs.insert(t, row[1]);
                }),
            Section::Ignored => Some(()),
        };
        if accepted.is_none() {
            skipped += 1;
        }
    }

    if skipped > 0 {
        debug!(skipped; "Skipped unreadable data rows");
    }

    let bonds = typed_bonds.into_iter().map(|(t, mut bond)| {
        bond.k = coeffs.get(&t).copied().unwrap_or(1.0);
        bond
    });
    Graph::from_parts(atoms, bonds)
}

fn parse_atom(row: &[f64], style: AtomStyle) -> Option<Atom> {
    let id: AtomId = to_id(row[0])?;
    let x_col = style.x_column(row.len())?;
    Some(Atom::new(id, row[x_col], row[x_col + 1]))
}

fn parse_bond(row: &[f64]) -> Option<(u64, Bond)> {
    if row.len() < 4 {
        return None;
    }
    let id = to_id(row[0])?;
    let t = to_id(row[1])?;
    let i = to_id(row[2])?;
    let j = to_id(row[3])?;
    Some((t, Bond::new(id, i, j, 1.0)))
}
