// Helper functions to generate test networks and data files

use spring_network_editor::{Atom, Bond, Graph};

/// Three atoms joined in a closed triangle with two stiffness values
pub fn triangle() -> Graph {
    Graph::from_parts(
        [
            Atom::new(1, 0.0, 0.0),
            Atom::new(2, 1.0, 0.0),
            Atom::new(3, 0.0, 1.0),
        ],
        [
            Bond::new(1, 1, 2, 1.0),
            Bond::new(2, 2, 3, 2.0),
            Bond::new(3, 1, 3, 1.0),
        ],
    )
}

/// Open chain `1 - 2 - ... - n` along the x axis
pub fn chain(n: u64) -> Graph {
    Graph::from_parts(
        (1..=n).map(|id| Atom::new(id, id as f64, 0.0)),
        (1..n).map(|id| Bond::new(id, id, id + 1, 1.0)),
    )
}

/// `side x side` square lattice with unit spacing and nearest-neighbour bonds
pub fn square_lattice(side: u64) -> Graph {
    let id_of = |row: u64, col: u64| row * side + col + 1;
    let atoms = (0..side)
        .flat_map(|row| (0..side).map(move |col| (row, col)))
        .map(|(row, col)| Atom::new(id_of(row, col), col as f64, row as f64));

    let mut bonds = Vec::new();
    for row in 0..side {
        for col in 0..side {
            if col + 1 < side {
                bonds.push((id_of(row, col), id_of(row, col + 1)));
            }
            if row + 1 < side {
                bonds.push((id_of(row, col), id_of(row + 1, col)));
            }
        }
    }
    let bonds = bonds
        .into_iter()
        .zip(1..)
        .map(|((i, j), id)| Bond::new(id, i, j, 1.0));

    Graph::from_parts(atoms, bonds)
}

/// Full-style data file with comments, unknown sections and a stray row
pub const FULL_STYLE_FILE: &str = "\
Hand written network

3 atoms
2 bonds

Masses

1 100000.0

Atoms # full

1 1 1 0.0 -1.0 0.5 0.0   # left
2 1 1 0.0 0.0 0.0 0.0
3 1 1 0.0 1.0 0.5 0.0
not a row

Velocities

1 0 0 0
2 0 0 0
3 0 0 0

Bonds

1 1 1 2
2 2 2 3

Bond Coeffs

1 4.0 1.1
2 0.25 1.1
";

/// Molecular-style rows without a style hint
pub const MOLECULAR_STYLE_FILE: &str = "\
Atoms

1 1 1 2.0 3.0 0.0
2 1 1 4.0 3.0 0.0

Bonds

1 1 1 2
";
