//! Canvas input state machine.
//!
//! The engine turns pointer and keyboard events into selection changes and
//! store commits. Drags write into a pending position overlay and commit
//! once, on release.

use crate::config::EditorConfig;
use crate::model::{AtomId, BondId, Graph, Point};
use crate::session::Session;
use crate::store::GraphStore;
use crate::viewport::{GridSnap, Viewport};
use egui::{Key, Modifiers, Pos2};
use log::debug;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,

    /// Dragging one atom; `grab` is the atom position minus the press point
    AtomDragging {
        atom: AtomId,
        grab: Point,
        press: Pos2,
        moved: bool,
        toggle: bool,
    },

    /// Dragging every selected atom by the pointer delta
    GroupDragging {
        atom: AtomId,
        start: Point,
        origins: Vec<(AtomId, Point)>,
        press: Pos2,
        moved: bool,
        toggle: bool,
    },

    MarqueeSelecting {
        anchor: Point,
        current: Point,
        press: Pos2,
        moved: bool,
    },

    /// Editing a bond coefficient in place
    InlineEditing {
        bond: BondId,
        anchor: Point,
        buffer: String,
    },
}

/// Keyboard commands the canvas understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Delete,
    Copy,
    Paste,
    Duplicate,
    Undo,
    Redo,
    Escape,
    Enter,
}

impl KeyCommand {
    /// Map a key press to a command. Copy and paste usually arrive as
    /// clipboard events instead, which the front-end maps directly.
    pub fn from_key(key: Key, modifiers: Modifiers) -> Option<Self> {
        let command = match key {
            Key::Delete | Key::Backspace => KeyCommand::Delete,
            Key::Escape => KeyCommand::Escape,
            Key::Enter => KeyCommand::Enter,
            Key::C if modifiers.command => KeyCommand::Copy,
            Key::V if modifiers.command => KeyCommand::Paste,
            Key::D if modifiers.command => KeyCommand::Duplicate,
            Key::Z if modifiers.command && modifiers.shift => KeyCommand::Redo,
            Key::Z if modifiers.command => KeyCommand::Undo,
            Key::Y if modifiers.command => KeyCommand::Redo,
            _ => return None,
        };
        Some(command)
    }
}

/// Rejected inline coefficient input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("coefficient is empty")]
    Empty,

    #[error("`{0}` is not a number")]
    NotANumber(String),

    #[error("`{0}` is not finite")]
    NotFinite(String),
}

/// Parse an inline coefficient: trimmed, finite, no bare sign or dot
pub fn validate_coefficient(text: &str) -> Result<f64, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| ValidationError::NotANumber(trimmed.to_string()))?;
    if !value.is_finite() {
        return Err(ValidationError::NotFinite(trimmed.to_string()));
    }
    Ok(value)
}

fn is_toggle(modifiers: &Modifiers) -> bool {
    modifiers.shift || modifiers.command
}

#[derive(Debug, Clone)]
pub struct InteractionEngine {
    state: InteractionState,
    pending: BTreeMap<AtomId, Point>,
    viewport: Viewport,
    grid: GridSnap,
    drag_epsilon_px: f32,
    paste_offset: f64,
}

impl Default for InteractionEngine {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl InteractionEngine {
    pub fn new(config: &EditorConfig) -> Self {
        let viewport = Viewport::default().with_hit_radius(config.hit_radius_px);
        let mut engine = Self {
            state: InteractionState::Idle,
            pending: BTreeMap::new(),
            viewport,
            grid: config.grid(),
            drag_epsilon_px: config.drag_epsilon_px,
            paste_offset: config.paste_offset,
        };
        engine.viewport.set_zoom_percent(config.zoom_percent);
        engine
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == InteractionState::Idle
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn grid(&self) -> GridSnap {
        self.grid
    }

    pub fn set_grid(&mut self, grid: GridSnap) {
        self.grid = grid;
    }

    // ========== Rendering queries ==========

    /// Position to draw an atom at, including uncommitted drag moves
    pub fn display_position(&self, graph: &Graph, id: AtomId) -> Option<Point> {
        self.pending
            .get(&id)
            .copied()
            .or_else(|| graph.atom(id).map(|a| a.position()))
    }

    pub fn pending_positions(&self) -> &BTreeMap<AtomId, Point> {
        &self.pending
    }

    /// Marquee corners in graph space while a marquee is active
    pub fn marquee(&self) -> Option<(Point, Point)> {
        match &self.state {
            InteractionState::MarqueeSelecting { anchor, current, .. } => Some((*anchor, *current)),
            _ => None,
        }
    }

    /// Bond id, anchor and buffer of the open inline editor
    pub fn inline_editor(&self) -> Option<(BondId, Point, &str)> {
        match &self.state {
            InteractionState::InlineEditing {
                bond,
                anchor,
                buffer,
            } => Some((*bond, *anchor, buffer.as_str())),
            _ => None,
        }
    }

    pub fn edit_buffer_mut(&mut self) -> Option<&mut String> {
        match &mut self.state {
            InteractionState::InlineEditing { buffer, .. } => Some(buffer),
            _ => None,
        }
    }

    // ========== Hit testing ==========

    /// Topmost (highest id) atom within the hit radius of `p`
    pub fn hit_atom(&self, graph: &Graph, p: Point) -> Option<AtomId> {
        let radius = self.viewport.hit_radius();
        graph
            .atoms()
            .rev()
            .find(|a| {
                self.display_position(graph, a.id)
                    .is_some_and(|pos| pos.distance(&p) <= radius)
            })
            .map(|a| a.id)
    }

    /// Bond whose midpoint is nearest to `p` within the hit radius
    pub fn hit_bond(&self, graph: &Graph, p: Point) -> Option<(BondId, Point)> {
        let radius = self.viewport.hit_radius();
        graph
            .bonds()
            .filter_map(|b| graph.bond_midpoint(b.id).map(|m| (b.id, m)))
            .map(|(id, m)| (id, m, m.distance(&p)))
            .filter(|(_, _, d)| *d <= radius)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(id, m, _)| (id, m))
    }

    /// Atoms inside the axis-aligned rectangle spanned by two corners
    pub fn atoms_in_rect(&self, graph: &Graph, a: Point, b: Point) -> Vec<AtomId> {
        let (min_x, max_x) = (a.x.min(b.x), a.x.max(b.x));
        let (min_y, max_y) = (a.y.min(b.y), a.y.max(b.y));
        graph
            .atoms()
            .filter(|atom| {
                atom.x >= min_x && atom.x <= max_x && atom.y >= min_y && atom.y <= max_y
            })
            .map(|atom| atom.id)
            .collect()
    }

    // ========== Pointer events ==========

    pub fn pointer_down(
        &mut self,
        store: &mut GraphStore,
        session: &mut Session,
        pos: Pos2,
        modifiers: Modifiers,
    ) {
        match self.state {
            InteractionState::Idle => {}
            InteractionState::InlineEditing { .. } => {
                if let Err(e) = self.commit_edit(store) {
                    debug!(error = e.to_string(); "Discarded inline edit");
                }
            }
            _ => self.cancel_gesture(),
        }

        let graph = store.graph();
        session.selection.retain_existing(graph);
        let p = self.viewport.screen_to_graph(pos);
        let toggle = is_toggle(&modifiers);

        let Some(id) = self.hit_atom(graph, p) else {
            self.state = InteractionState::MarqueeSelecting {
                anchor: p,
                current: p,
                press: pos,
                moved: false,
            };
            return;
        };

        let selected = session.selection.contains(id);
        if selected && session.selection.len() > 1 {
            let origins = session
                .selection
                .iter()
                .filter_map(|sid| graph.atom(sid).map(|a| (sid, a.position())))
                .collect();
            self.state = InteractionState::GroupDragging {
                atom: id,
                start: p,
                origins,
                press: pos,
                moved: false,
                toggle,
            };
            return;
        }

        if !selected && !toggle {
            session.selection.select_only(id);
        }
        let Some(atom) = graph.atom(id) else {
            return;
        };
        self.state = InteractionState::AtomDragging {
            atom: id,
            grab: Point::new(atom.x - p.x, atom.y - p.y),
            press: pos,
            moved: false,
            toggle,
        };
    }

    /// Track the pointer. Returns whether anything visible changed.
    pub fn pointer_move(&mut self, pos: Pos2, primary_down: bool) -> bool {
        if !primary_down {
            return false;
        }
        let epsilon = self.drag_epsilon_px;
        let p = self.viewport.screen_to_graph(pos);

        match &mut self.state {
            InteractionState::AtomDragging {
                atom,
                grab,
                press,
                moved,
                ..
            } => {
                if !crossed(moved, *press, pos, epsilon) {
                    return false;
                }
                let target = self.grid.apply(p.offset(grab.x, grab.y));
                self.pending.insert(*atom, target);
                true
            }
            InteractionState::GroupDragging {
                start,
                origins,
                press,
                moved,
                ..
            } => {
                if !crossed(moved, *press, pos, epsilon) {
                    return false;
                }
                let (dx, dy) = (p.x - start.x, p.y - start.y);
                for (id, origin) in origins.iter() {
                    self.pending.insert(*id, self.grid.apply(origin.offset(dx, dy)));
                }
                true
            }
            InteractionState::MarqueeSelecting {
                current,
                press,
                moved,
                ..
            } => {
                if !crossed(moved, *press, pos, epsilon) {
                    return false;
                }
                *current = p;
                true
            }
            InteractionState::Idle | InteractionState::InlineEditing { .. } => false,
        }
    }

    /// Finish the gesture. Returns whether a commit was recorded.
    pub fn pointer_up(&mut self, store: &mut GraphStore, session: &mut Session, pos: Pos2) -> bool {
        let state = std::mem::replace(&mut self.state, InteractionState::Idle);
        match state {
            InteractionState::AtomDragging {
                atom,
                moved,
                toggle,
                ..
            }
            | InteractionState::GroupDragging {
                atom,
                moved,
                toggle,
                ..
            } => {
                if moved {
                    return self.commit_pending(store);
                }
                self.pending.clear();
                click_atom(session, atom, toggle);
                false
            }
            InteractionState::MarqueeSelecting { anchor, moved, .. } => {
                if moved {
                    let end = self.viewport.screen_to_graph(pos);
                    let hits = self.atoms_in_rect(store.graph(), anchor, end);
                    debug!(selected = hits.len(); "Marquee selection");
                    session.selection.replace(hits);
                } else {
                    session.selection.clear();
                }
                false
            }
            editing @ InteractionState::InlineEditing { .. } => {
                self.state = editing;
                false
            }
            InteractionState::Idle => false,
        }
    }

    /// Pointer capture was lost: abandon the gesture without committing
    pub fn pointer_cancel(&mut self) {
        if matches!(
            self.state,
            InteractionState::AtomDragging { .. }
                | InteractionState::GroupDragging { .. }
                | InteractionState::MarqueeSelecting { .. }
        ) {
            self.cancel_gesture();
        }
    }

    /// Open the inline editor on the bond midpoint under `pos`. Only from Idle.
    pub fn double_click(&mut self, store: &GraphStore, pos: Pos2) -> bool {
        if !self.is_idle() {
            return false;
        }
        let graph = store.graph();
        let p = self.viewport.screen_to_graph(pos);
        let Some((bond, anchor)) = self.hit_bond(graph, p) else {
            return false;
        };
        let Some(k) = graph.bond(bond).map(|b| b.k) else {
            return false;
        };
        debug!(bond; "Editing bond coefficient");
        self.state = InteractionState::InlineEditing {
            bond,
            anchor,
            buffer: k.to_string(),
        };
        true
    }

    // ========== Inline editing ==========

    /// Validate the buffer and commit it as the bond's stiffness. The editor
    /// closes either way.
    pub fn commit_edit(&mut self, store: &mut GraphStore) -> Result<bool, ValidationError> {
        let state = std::mem::replace(&mut self.state, InteractionState::Idle);
        let InteractionState::InlineEditing { bond, buffer, .. } = state else {
            self.state = state;
            return Ok(false);
        };
        let k = validate_coefficient(&buffer)?;
        Ok(store.set_bond_stiffness(bond, k))
    }

    pub fn cancel_edit(&mut self) {
        if matches!(self.state, InteractionState::InlineEditing { .. }) {
            self.state = InteractionState::Idle;
        }
    }

    // ========== Keyboard ==========

    /// Handle a keyboard command. Returns whether the graph or selection
    /// changed.
    pub fn key(&mut self, store: &mut GraphStore, session: &mut Session, command: KeyCommand) -> bool {
        if matches!(self.state, InteractionState::InlineEditing { .. }) {
            return match command {
                KeyCommand::Enter => match self.commit_edit(store) {
                    Ok(changed) => changed,
                    Err(e) => {
                        debug!(error = e.to_string(); "Discarded inline edit");
                        false
                    }
                },
                KeyCommand::Escape => {
                    self.cancel_edit();
                    false
                }
                // the text field owns every other key
                _ => false,
            };
        }

        match command {
            KeyCommand::Escape => {
                self.pointer_cancel();
                false
            }
            KeyCommand::Enter => false,
            KeyCommand::Delete => {
                if session.selection.is_empty() {
                    return false;
                }
                self.cancel_gesture();
                let ids = session.selection.to_vec();
                session.selection.clear();
                store.remove_by_ids(&ids)
            }
            KeyCommand::Copy => {
                session.selection.retain_existing(store.graph());
                session.copy_selection(store.graph())
            }
            KeyCommand::Paste | KeyCommand::Duplicate => {
                self.cancel_gesture();
                self.paste(store, session)
            }
            KeyCommand::Undo => {
                self.cancel_gesture();
                let changed = store.undo();
                session.selection.retain_existing(store.graph());
                changed
            }
            KeyCommand::Redo => {
                self.cancel_gesture();
                let changed = store.redo();
                session.selection.retain_existing(store.graph());
                changed
            }
        }
    }

    /// Insert the clipboard under fresh ids and select the copies
    pub fn paste(&mut self, store: &mut GraphStore, session: &mut Session) -> bool {
        session.selection.retain_existing(store.graph());
        if session.clipboard.is_empty() && !session.selection.is_empty() {
            session.copy_selection(store.graph());
        }
        if session.clipboard.is_empty() {
            return false;
        }

        let mut new_ids = Vec::new();
        let offset = self.paste_offset;
        let clipboard = &session.clipboard;
        let committed = store.commit("paste", |g| {
            new_ids = clipboard.paste_into(g, offset);
        });
        if committed {
            debug!(atoms = new_ids.len(); "Pasted clipboard");
            session.selection.replace(new_ids);
        }
        committed
    }

    // ========== Internals ==========

    fn commit_pending(&mut self, store: &mut GraphStore) -> bool {
        let positions: Vec<(AtomId, Point)> = std::mem::take(&mut self.pending).into_iter().collect();
        if positions.is_empty() {
            return false;
        }
        store.move_atoms(&positions)
    }

    fn cancel_gesture(&mut self) {
        if !matches!(self.state, InteractionState::InlineEditing { .. }) {
            self.state = InteractionState::Idle;
        }
        self.pending.clear();
    }
}

/// Latch `moved` once the pointer has left the epsilon disc around `press`
fn crossed(moved: &mut bool, press: Pos2, pos: Pos2, epsilon: f32) -> bool {
    if !*moved && press.distance(pos) > epsilon {
        *moved = true;
    }
    *moved
}

fn click_atom(session: &mut Session, atom: AtomId, toggle: bool) {
    if toggle {
        session.selection.toggle(atom);
    } else {
        session.selection.select_only(atom);
    }
}
