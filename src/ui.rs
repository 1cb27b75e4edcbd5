use crate::{
    config::EditorConfig,
    interaction::{InteractionEngine, InteractionState, KeyCommand},
    schema::{self, EntityKind, EntityRow},
    selection::SelectionKind,
    serialization::{self, SavedSession, TopologyFile},
    GraphStore, Point, Session,
};
use anyhow::{Context, Result};
use egui::{pos2, vec2, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke};
use log::{info, warn};
use std::path::{Path, PathBuf};

const ATOM_RADIUS_PX: f32 = 8.0;

/// Main application state
pub struct GraphEditorApp {
    /// Sole owner of the graph and its history
    store: GraphStore,

    /// Selection, clipboard and zoom
    session: Session,

    /// Canvas input state machine
    engine: InteractionEngine,

    config: EditorConfig,

    /// Status message
    status_message: String,

    /// Path used by the load/export text fields
    file_path: String,

    show_grid: bool,

    show_tables: bool,

    /// Request focus for a freshly opened inline editor
    focus_editor: bool,

    /// Screen rect of the inline editor last frame
    editor_rect: Option<Rect>,
}

impl Default for GraphEditorApp {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl GraphEditorApp {
    /// Start from the saved session if the config names one, else the
    /// built-in network
    pub fn new(config: EditorConfig) -> Self {
        let saved = config.session_path.as_deref().and_then(|path| {
            SavedSession::load_if_present(path).unwrap_or_else(|e| {
                warn!(error = format!("{e:#}"); "Ignoring unreadable session");
                None
            })
        });
        let store = GraphStore::bootstrap(saved.as_ref().map(SavedSession::graph), None);
        let session = match &saved {
            Some(saved) => Session::restore(saved, store.graph()),
            None => Session {
                zoom_percent: config.zoom_percent,
                ..Session::default()
            },
        };
        Self::with_parts(config, store, session)
    }

    pub fn with_parts(config: EditorConfig, store: GraphStore, session: Session) -> Self {
        let mut engine = InteractionEngine::new(&config);
        engine.viewport_mut().set_zoom_percent(session.zoom_percent);
        Self {
            store,
            session,
            engine,
            config,
            status_message: "Ready".to_string(),
            file_path: "network.data".to_string(),
            show_grid: true,
            show_tables: true,
            focus_editor: false,
            editor_rect: None,
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Replace the graph with the contents of a data file
    pub fn load_topology_file(&mut self, path: &Path) -> Result<()> {
        let text = TopologyFile::open(path)?.read_to_string()?;
        self.engine.pointer_cancel();
        self.engine.cancel_edit();
        self.store.load_from_string(&text);
        self.session.selection.clear();
        info!(path = path.display().to_string(); "Loaded topology file");
        Ok(())
    }

    pub fn export_topology(&self, path: &Path) -> Result<()> {
        serialization::export_topology(path, self.store.graph())
    }

    /// Save the session to the configured path, if any
    pub fn save_session(&mut self) -> Result<Option<PathBuf>> {
        let Some(path) = self.config.session_path.clone() else {
            return Ok(None);
        };
        self.session.zoom_percent = self.engine.viewport().zoom_percent();
        SavedSession::capture(self.store.graph(), &self.session)
            .save(&path)
            .context("Failed to save session")?;
        Ok(Some(path))
    }

    /// Append pending store events to the configured log and drop them
    /// from memory. Returns how many were written.
    pub fn flush_event_log(&mut self) -> Result<usize> {
        let Some(path) = self.config.event_log_path.as_deref() else {
            return Ok(0);
        };
        let count = self.store.events().len();
        if count == 0 {
            return Ok(0);
        }
        serialization::append_events(path, self.store.events())?;
        self.store.clear_events();
        Ok(count)
    }

    /// Persist session and event log, reporting the first failure
    fn persist(&mut self) -> Result<Option<PathBuf>> {
        let saved = self.save_session()?;
        self.flush_event_log()?;
        Ok(saved)
    }

    fn apply_key(&mut self, command: KeyCommand) {
        if self.engine.key(&mut self.store, &mut self.session, command) {
            self.status_message = format!("{command:?}");
        }
    }

    fn render_ui(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                if ui.button("Add atom").clicked() {
                    let id = self.store.add_atom();
                    self.session.selection.select_only(id);
                    self.status_message = format!("Added atom {id}");
                }
                if ui.button("Add bond").clicked() {
                    self.status_message = match self.store.add_bond() {
                        Some(id) => format!("Added bond {id}"),
                        None => "Need two unbonded atoms".to_string(),
                    };
                }
                let kind = self.session.selection.kind();
                let can_bond = kind == SelectionKind::Multiple(2);
                if ui
                    .add_enabled(can_bond, egui::Button::new("Bond selected"))
                    .clicked()
                {
                    let mut ids = self.session.selection.iter();
                    if let (Some(i), Some(j)) = (ids.next(), ids.next()) {
                        self.status_message = match self.store.add_bond_between(i, j, 1.0) {
                            Some(id) => format!("Added bond {id}"),
                            None => "Atoms already bonded".to_string(),
                        };
                    }
                }
                if ui
                    .add_enabled(kind != SelectionKind::Empty, egui::Button::new("Delete"))
                    .clicked()
                {
                    self.apply_key(KeyCommand::Delete);
                }
                if ui.button("Clear bonds").clicked() {
                    self.store.clear_bonds();
                }
                if ui.button("Clear atoms").clicked() {
                    self.store.clear_atoms();
                    self.session.selection.clear();
                }

                ui.separator();

                if ui
                    .add_enabled(self.store.can_undo(), egui::Button::new("Undo"))
                    .clicked()
                {
                    self.apply_key(KeyCommand::Undo);
                }
                if ui
                    .add_enabled(self.store.can_redo(), egui::Button::new("Redo"))
                    .clicked()
                {
                    self.apply_key(KeyCommand::Redo);
                }

                ui.separator();

                let mut grid = self.engine.grid();
                ui.checkbox(&mut grid.enabled, "Snap");
                ui.add(
                    egui::DragValue::new(&mut grid.size)
                        .speed(0.05)
                        .range(0.05..=10.0)
                        .prefix("grid "),
                );
                self.engine.set_grid(grid);
                ui.checkbox(&mut self.show_grid, "Grid");
                ui.checkbox(&mut self.show_tables, "Tables");

                let mut zoom = self.engine.viewport().zoom_percent();
                if ui
                    .add(egui::Slider::new(&mut zoom, 10.0..=500.0).text("zoom %"))
                    .changed()
                {
                    self.engine.viewport_mut().set_zoom_percent(zoom);
                    self.session.zoom_percent = self.engine.viewport().zoom_percent();
                }
            });

            ui.horizontal(|ui| {
                ui.label("File:");
                ui.text_edit_singleline(&mut self.file_path);
                let path = PathBuf::from(&self.file_path);
                if ui.button("Load").clicked() {
                    self.status_message = match self.load_topology_file(&path) {
                        Ok(()) => format!("Loaded {}", path.display()),
                        Err(e) => format!("Load failed: {e:#}"),
                    };
                }
                if ui.button("Export").clicked() {
                    self.status_message = match self.export_topology(&path) {
                        Ok(()) => format!("Exported {}", path.display()),
                        Err(e) => format!("Export failed: {e:#}"),
                    };
                }
                if ui.button("Save session").clicked() {
                    self.status_message = match self.persist() {
                        Ok(Some(path)) => format!("Saved {}", path.display()),
                        Ok(None) => "No session_path configured".to_string(),
                        Err(e) => format!("{e:#}"),
                    };
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            let graph = self.store.graph();
            let selected = match self.session.selection.kind() {
                SelectionKind::Empty => "nothing selected".to_string(),
                SelectionKind::Single(id) => format!("atom {id} selected"),
                SelectionKind::Multiple(n) => format!("{n} atoms selected"),
            };
            ui.horizontal(|ui| {
                ui.label(&self.status_message);
                ui.separator();
                ui.label(format!(
                    "{} atoms, {} bonds, {selected}",
                    graph.atom_count(),
                    graph.bond_count()
                ));
            });
        });

        if self.show_tables {
            egui::SidePanel::right("tables")
                .default_width(280.0)
                .show(ctx, |ui| {
                    self.render_table(ui, EntityKind::Atom);
                    ui.separator();
                    self.render_table(ui, EntityKind::Bond);
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_canvas(ui);
        });
    }

    /// Editable table driven by the field-descriptor schema
    fn render_table(&mut self, ui: &mut egui::Ui, kind: EntityKind) {
        ui.heading(kind.title());
        let mut edits: Vec<(u64, &'static str, f64)> = Vec::new();
        let mut select: Option<u64> = None;

        ui.push_id(kind.title(), |ui| {
            egui::ScrollArea::vertical().max_height(260.0).show(ui, |ui| {
                egui::Grid::new("rows").striped(true).show(ui, |ui| {
                    for field in kind.fields() {
                        ui.strong(field.label);
                    }
                    ui.end_row();

                    for row in schema::rows(self.store.graph(), kind) {
                        for field in kind.fields() {
                            let Some(mut value) = row.get(field.key) else {
                                ui.label("-");
                                continue;
                            };
                            if field.read_only {
                                let selected = matches!(row, EntityRow::Atom(a) if self.session.selection.contains(a.id));
                                if ui.selectable_label(selected, format!("{value}")).clicked() {
                                    select = Some(row.id());
                                }
                                continue;
                            }
                            let response =
                                ui.add(egui::DragValue::new(&mut value).speed(field.step));
                            if response.changed() {
                                edits.push((row.id(), field.key, value));
                            }
                        }
                        ui.end_row();
                    }
                });
            });
        });

        for (id, key, value) in edits {
            if let Err(e) = self.store.set_field(kind, id, key, value) {
                self.status_message = e.to_string();
            }
        }
        if let (EntityKind::Atom, Some(id)) = (kind, select) {
            self.session.selection.select_only(id);
        }
    }

    fn render_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let canvas_rect = response.rect;
        self.engine.viewport_mut().set_rect(canvas_rect);

        // Zoom with scroll
        if response.hovered() {
            let scroll_delta = ui.input(|i| i.smooth_scroll_delta.y);
            if scroll_delta != 0.0 {
                let zoom = self.engine.viewport().zoom_percent() + f64::from(scroll_delta) * 0.2;
                self.engine.viewport_mut().set_zoom_percent(zoom);
                self.session.zoom_percent = self.engine.viewport().zoom_percent();
            }
        }

        self.handle_pointer(ui, &response);
        self.handle_keys(ui.ctx());

        if self.show_grid {
            self.draw_grid(&painter, canvas_rect);
        }
        self.draw_network(&painter);
        self.draw_marquee(&painter);
        self.draw_inline_editor(ui);
    }

    fn handle_pointer(&mut self, ui: &egui::Ui, response: &egui::Response) {
        let (pressed, released, primary_down, pos, modifiers) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.primary_down(),
                i.pointer.interact_pos(),
                i.modifiers,
            )
        });
        let Some(pos) = pos else {
            return;
        };
        let over_editor = self.editor_rect.is_some_and(|r| r.contains(pos));

        if pressed && response.rect.contains(pos) && !over_editor {
            self.engine
                .pointer_down(&mut self.store, &mut self.session, pos, modifiers);
        }
        if self.engine.pointer_move(pos, primary_down) {
            ui.ctx().request_repaint();
        }
        if released {
            self.engine.pointer_up(&mut self.store, &mut self.session, pos);
        } else if !primary_down && is_gesture(self.engine.state()) {
            // release happened outside our view of the input
            self.engine.pointer_cancel();
        }

        if response.double_clicked() && self.engine.double_click(&self.store, pos) {
            self.focus_editor = true;
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let commands: Vec<KeyCommand> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Copy => Some(KeyCommand::Copy),
                    egui::Event::Paste(_) => Some(KeyCommand::Paste),
                    egui::Event::Key {
                        key,
                        pressed: true,
                        modifiers,
                        ..
                    } => KeyCommand::from_key(*key, *modifiers),
                    _ => None,
                })
                .collect()
        });
        for command in commands {
            self.apply_key(command);
        }
    }

    fn draw_grid(&self, painter: &egui::Painter, canvas_rect: Rect) {
        let grid = self.engine.grid();
        let viewport = self.engine.viewport();
        let spacing = (grid.size * viewport.scale()) as f32;
        if spacing < 4.0 {
            return;
        }
        let grid_color = Color32::from_gray(225);
        let origin = viewport.graph_to_screen(Point::new(0.0, 0.0));

        // Vertical lines
        let mut x = canvas_rect.left() + (origin.x - canvas_rect.left()).rem_euclid(spacing);
        while x < canvas_rect.right() {
            painter.line_segment(
                [pos2(x, canvas_rect.top()), pos2(x, canvas_rect.bottom())],
                Stroke::new(1.0, grid_color),
            );
            x += spacing;
        }

        // Horizontal lines
        let mut y = canvas_rect.top() + (origin.y - canvas_rect.top()).rem_euclid(spacing);
        while y < canvas_rect.bottom() {
            painter.line_segment(
                [pos2(canvas_rect.left(), y), pos2(canvas_rect.right(), y)],
                Stroke::new(1.0, grid_color),
            );
            y += spacing;
        }
    }

    fn screen_of(&self, id: u64) -> Option<Pos2> {
        let viewport = self.engine.viewport();
        self.engine
            .display_position(self.store.graph(), id)
            .map(|p| viewport.graph_to_screen(p))
    }

    fn draw_network(&self, painter: &egui::Painter) {
        let graph = self.store.graph();
        let selection = &self.session.selection;
        let label_font = FontId::proportional(12.0);

        for bond in graph.bonds() {
            let (Some(a), Some(b)) = (self.screen_of(bond.i), self.screen_of(bond.j)) else {
                continue;
            };
            let both = selection.contains(bond.i) && selection.contains(bond.j);
            let color = if both {
                Color32::from_rgb(30, 64, 175)
            } else {
                Color32::from_rgb(51, 65, 85)
            };
            painter.line_segment([a, b], Stroke::new(2.0, color));

            let mid = a + (b - a) * 0.5;
            painter.text(
                mid + vec2(6.0, -6.0),
                Align2::LEFT_BOTTOM,
                format!("k={}", bond.k),
                label_font.clone(),
                Color32::from_rgb(17, 24, 39),
            );
        }

        for atom in graph.atoms() {
            let Some(center) = self.screen_of(atom.id) else {
                continue;
            };
            let selected = selection.contains(atom.id);
            let (fill, outline) = if selected {
                (Color32::from_rgb(37, 99, 235), Color32::from_rgb(30, 58, 138))
            } else {
                (Color32::from_rgb(14, 165, 233), Color32::from_rgb(12, 74, 110))
            };
            painter.circle(center, ATOM_RADIUS_PX, fill, Stroke::new(1.5, outline));
            painter.text(
                center + vec2(10.0, -10.0),
                Align2::LEFT_BOTTOM,
                atom.id.to_string(),
                label_font.clone(),
                Color32::from_rgb(17, 24, 39),
            );
        }
    }

    fn draw_marquee(&self, painter: &egui::Painter) {
        let Some((a, b)) = self.engine.marquee() else {
            return;
        };
        let viewport = self.engine.viewport();
        let rect = Rect::from_two_pos(viewport.graph_to_screen(a), viewport.graph_to_screen(b));
        let blue = Color32::from_rgb(59, 130, 246);
        painter.rect_filled(rect, 0.0, blue.gamma_multiply(0.15));
        painter.rect_stroke(rect, 0.0, Stroke::new(1.5, blue.gamma_multiply(0.6)));
    }

    /// Draw the coefficient editor over the bond midpoint
    fn draw_inline_editor(&mut self, ui: &mut egui::Ui) {
        let Some((_, anchor, _)) = self.engine.inline_editor() else {
            self.editor_rect = None;
            return;
        };
        let at = self.engine.viewport().graph_to_screen(anchor);
        let rect = Rect::from_center_size(at, vec2(90.0, 22.0));
        self.editor_rect = Some(rect);

        let Some(buffer) = self.engine.edit_buffer_mut() else {
            return;
        };
        let response = ui.put(rect, egui::TextEdit::singleline(buffer));
        if self.focus_editor {
            response.request_focus();
            self.focus_editor = false;
        }

        if response.lost_focus() {
            if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                self.engine.cancel_edit();
                self.status_message = "Edit cancelled".to_string();
            } else {
                self.status_message = match self.engine.commit_edit(&mut self.store) {
                    Ok(true) => "Stiffness updated".to_string(),
                    Ok(false) => "Stiffness unchanged".to_string(),
                    Err(e) => format!("Edit discarded: {e}"),
                };
            }
            self.editor_rect = None;
        }
    }
}

fn is_gesture(state: &InteractionState) -> bool {
    matches!(
        state,
        InteractionState::AtomDragging { .. }
            | InteractionState::GroupDragging { .. }
            | InteractionState::MarqueeSelecting { .. }
    )
}

impl eframe::App for GraphEditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.render_ui(ctx);

        if ctx.input(|i| i.viewport().close_requested()) {
            if let Err(e) = self.persist() {
                warn!(error = format!("{e:#}"); "Failed to save session on exit");
            }
        }
    }
}
