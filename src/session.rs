use crate::clipboard::ClipboardBuffer;
use crate::model::Graph;
use crate::selection::Selection;
use crate::serialization::SavedSession;

/// Per-window editor state owned by the application and lent to the
/// interaction engine. The clipboard lives only as long as the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub clipboard: ClipboardBuffer,
    pub selection: Selection,
    pub zoom_percent: f64,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            clipboard: ClipboardBuffer::default(),
            selection: Selection::new(),
            zoom_percent: 100.0,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore selection and zoom from a saved session, dropping selected
    /// ids that `graph` no longer has
    pub fn restore(saved: &SavedSession, graph: &Graph) -> Self {
        let mut selection = saved.selection.clone();
        selection.retain_existing(graph);
        Self {
            clipboard: ClipboardBuffer::default(),
            selection,
            zoom_percent: saved.zoom_percent,
        }
    }

    /// Fill the clipboard from the current selection
    pub fn copy_selection(&mut self, graph: &Graph) -> bool {
        if self.selection.is_empty() {
            return false;
        }
        self.clipboard = ClipboardBuffer::from_selection(graph, &self.selection);
        !self.clipboard.is_empty()
    }
}
