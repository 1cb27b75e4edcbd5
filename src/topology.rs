//! Derived topology used at export time: bond-type interning and angle
//! inference from bond adjacency.

use crate::model::{AtomId, Graph, Point};

/// Stiffness written for every inferred angle
pub const ANGLE_STIFFNESS: f64 = 10.0;

/// Dense 1-based bond type ids keyed by stiffness, in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BondTypes {
    uniq: Vec<f64>,
}

impl BondTypes {
    /// Intern the stiffness of every bond in id order
    pub fn from_graph(graph: &Graph) -> Self {
        let mut types = Self::default();
        for bond in graph.bonds() {
            types.intern(bond.k);
        }
        types
    }

    /// Type id for `k`, assigning the next one if unseen
    pub fn intern(&mut self, k: f64) -> usize {
        match self.type_of(k) {
            Some(t) => t,
            None => {
                self.uniq.push(k);
                self.uniq.len()
            }
        }
    }

    pub fn type_of(&self, k: f64) -> Option<usize> {
        self.uniq.iter().position(|v| *v == k).map(|idx| idx + 1)
    }

    /// `(type id, stiffness)` pairs in type order
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.uniq.iter().enumerate().map(|(idx, k)| (idx + 1, *k))
    }

    pub fn len(&self) -> usize {
        self.uniq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uniq.is_empty()
    }
}

/// An angle centred on `center` between bonds to `first` and `second`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferredAngle {
    pub first: AtomId,
    pub center: AtomId,
    pub second: AtomId,
    /// Equilibrium angle from current geometry, degrees
    pub theta0: f64,
}

/// One angle per unordered neighbour pair at every vertex.
///
/// Vertices are visited in ascending id order and neighbour pairs in
/// ascending `(first, second)` order.
pub fn infer_angles(graph: &Graph) -> Vec<InferredAngle> {
    let mut angles = Vec::new();
    for (center, neighbours) in graph.adjacency() {
        let Some(c) = graph.atom(center) else {
            continue;
        };
        let neighbours: Vec<AtomId> = neighbours.into_iter().collect();
        for (idx, &first) in neighbours.iter().enumerate() {
            for &second in &neighbours[idx + 1..] {
                let (Some(a), Some(b)) = (graph.atom(first), graph.atom(second)) else {
                    continue;
                };
                let theta = angle_theta(a.position(), c.position(), b.position());
                angles.push(InferredAngle {
                    first,
                    center,
                    second,
                    theta0: theta.to_degrees(),
                });
            }
        }
    }
    angles
}

/// Angle at `center` between `a` and `b`, radians.
///
/// A zero-length arm is treated as unit length, which yields 90 degrees
/// instead of NaN.
pub fn angle_theta(a: Point, center: Point, b: Point) -> f64 {
    let (v1x, v1y) = (a.x - center.x, a.y - center.y);
    let (v2x, v2y) = (b.x - center.x, b.y - center.y);
    let dot = v1x * v2x + v1y * v2y;
    let n1 = nonzero(v1x.hypot(v1y));
    let n2 = nonzero(v2x.hypot(v2y));
    (dot / (n1 * n2)).clamp(-1.0, 1.0).acos()
}

fn nonzero(v: f64) -> f64 {
    if v == 0.0 {
        1.0
    } else {
        v
    }
}

/// Expected number of inferred angles: sum of C(degree, 2) over vertices
pub fn expected_angle_count(graph: &Graph) -> usize {
    graph
        .adjacency()
        .values()
        .map(|n| n.len() * n.len().saturating_sub(1) / 2)
        .sum()
}
