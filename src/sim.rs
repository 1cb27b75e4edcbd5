//! Hand-off to an external simulation engine.
//!
//! The engine receives generated data text and exposes per-step buffers that
//! are only valid until the next call into it. [`Frame::capture`] copies them
//! so they can be kept for scrubbing.

use crate::codec::{self, CodecError};
use crate::model::Graph;
use log::debug;
use std::collections::VecDeque;
use thiserror::Error;

/// Smallest particle buffer allocation, in particles
pub const MIN_PARTICLE_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("engine rejected topology: {0}")]
    Topology(String),

    #[error("engine failed to advance: {0}")]
    Advance(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Paired endpoint buffers, xyz per bond for each end
#[derive(Debug, Clone, Copy, Default)]
pub struct BondView<'a> {
    pub first: &'a [f32],
    pub second: &'a [f32],
}

impl BondView<'_> {
    pub fn count(&self) -> usize {
        self.first.len().min(self.second.len()) / 3
    }
}

/// Simulation cell: three basis vectors (row-major) and an origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxGeometry {
    pub matrix: [f32; 9],
    pub origin: [f32; 3],
}

impl BoxGeometry {
    /// In-plane corners of the cell spanned by the first two basis vectors
    pub fn corners(&self) -> [[f32; 3]; 4] {
        let [ax, ay, _, bx, by, ..] = self.matrix;
        let [ox, oy, _] = self.origin;
        [
            [ox, oy, 0.0],
            [ox + ax, oy + ay, 0.0],
            [ox + ax + bx, oy + ay + by, 0.0],
            [ox + bx, oy + by, 0.0],
        ]
    }
}

/// An external engine that integrates the network
pub trait SimulationEngine {
    fn load_topology(&mut self, data: &str) -> Result<(), SimulationError>;

    fn advance(&mut self, steps: u32) -> Result<(), SimulationError>;

    /// Flat xyz positions for the current step
    fn particles(&self) -> &[f32];

    fn bonds(&self) -> BondView<'_>;

    fn simulation_box(&self) -> Option<BoxGeometry>;
}

/// Generate the data text for `graph` and load it into `engine`
pub fn hand_off<E: SimulationEngine + ?Sized>(
    engine: &mut E,
    graph: &Graph,
) -> Result<(), SimulationError> {
    let text = codec::generate(graph)?;
    engine.load_topology(&text)
}

/// Interleave endpoint buffers as `[x1 y1 z1 x2 y2 z2]` per bond
pub fn pack_bonds(bonds: BondView<'_>) -> Vec<f32> {
    let n = bonds.count();
    let mut packed = Vec::with_capacity(6 * n);
    for (a, b) in bonds
        .first
        .chunks_exact(3)
        .zip(bonds.second.chunks_exact(3))
        .take(n)
    {
        packed.extend_from_slice(a);
        packed.extend_from_slice(b);
    }
    packed
}

/// An owned copy of one simulation step
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub positions: Vec<f32>,
    pub bonds_packed: Vec<f32>,
    pub bond_count: usize,
    pub box_corners: Option<[[f32; 3]; 4]>,
}

impl Frame {
    /// Copy the engine's current buffers. `None` when there are no particles.
    pub fn capture<E: SimulationEngine + ?Sized>(engine: &E) -> Option<Self> {
        let particles = engine.particles();
        let whole = particles.len() / 3 * 3;
        if whole == 0 {
            return None;
        }
        let bonds = engine.bonds();
        Some(Self {
            positions: particles[..whole].to_vec(),
            bonds_packed: pack_bonds(bonds),
            bond_count: bonds.count(),
            box_corners: engine.simulation_box().map(|b| b.corners()),
        })
    }

    pub fn particle_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// Bounded list of captured frames with a scrub cursor
#[derive(Debug, Clone)]
pub struct FrameHistory {
    frames: VecDeque<Frame>,
    capacity: usize,
    index: usize,
    follow_live: bool,
    scrubbing: bool,
}

impl FrameHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            capacity: capacity.max(1),
            index: 0,
            follow_live: true,
            scrubbing: false,
        }
    }

    /// Append a frame, evicting the oldest when full. The cursor tracks the
    /// newest frame while following live.
    pub fn push(&mut self, frame: Frame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
            self.index = self.index.saturating_sub(1);
        }
        self.frames.push_back(frame);
        if self.follow_live && !self.scrubbing {
            self.index = self.frames.len() - 1;
        }
    }

    pub fn begin_scrub(&mut self) {
        self.scrubbing = true;
        self.follow_live = false;
    }

    pub fn end_scrub(&mut self) {
        self.scrubbing = false;
    }

    /// Move the cursor, clamped to the stored range
    pub fn seek(&mut self, index: usize) -> Option<&Frame> {
        if self.frames.is_empty() {
            return None;
        }
        self.index = index.min(self.frames.len() - 1);
        self.frames.get(self.index)
    }

    pub fn resume_live(&mut self) {
        self.follow_live = true;
        self.scrubbing = false;
        self.index = self.frames.len().saturating_sub(1);
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_following_live(&self) -> bool {
        self.follow_live
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrubbing
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.index = 0;
        self.follow_live = true;
        self.scrubbing = false;
    }
}

/// Advance the engine and record the resulting frame.
/// Returns whether a frame was captured.
pub fn run_frame<E: SimulationEngine + ?Sized>(
    engine: &mut E,
    history: &mut FrameHistory,
    steps: u32,
) -> Result<bool, SimulationError> {
    engine.advance(steps)?;
    let Some(frame) = Frame::capture(engine) else {
        return Ok(false);
    };
    debug!(particles = frame.particle_count(), bonds = frame.bond_count; "Captured frame");
    history.push(frame);
    Ok(true)
}

/// Reusable particle position storage
#[derive(Debug, Clone, Default)]
pub struct ParticleBuffer {
    positions: Vec<f32>,
    count: usize,
    capacity: usize,
}

impl ParticleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every whole xyz triple of `src`, growing storage geometrically
    pub fn sync_from(&mut self, src: &[f32]) {
        let n = src.len() / 3;
        if n == 0 {
            self.count = 0;
            return;
        }
        self.ensure_capacity(n);
        self.positions[..3 * n].copy_from_slice(&src[..3 * n]);
        self.count = n;
    }

    fn ensure_capacity(&mut self, need: usize) {
        if need <= self.capacity {
            return;
        }
        let grown = if self.capacity > 0 {
            self.capacity * 2
        } else {
            MIN_PARTICLE_CAPACITY
        };
        let capacity = need.max(grown);
        self.positions = vec![0.0; 3 * capacity];
        self.capacity = capacity;
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions[..3 * self.count]
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
