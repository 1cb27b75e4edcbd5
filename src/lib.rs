// Spring Network Editor - Core Library

pub mod cli;
pub mod clipboard;
pub mod codec;
pub mod config;
pub mod event;
pub mod interaction;
pub mod model;
pub mod schema;
pub mod selection;
pub mod serialization;
pub mod session;
pub mod sim;
pub mod store;
pub mod topology;
pub mod ui;
pub mod viewport;

// Re-export main types for convenience
pub use cli::Args;
pub use clipboard::ClipboardBuffer;
pub use codec::CodecError;
pub use config::{load_config, ConfigError, EditorConfig};
pub use event::{EventType, GraphEvent};
pub use interaction::{InteractionEngine, InteractionState, KeyCommand};
pub use model::{Atom, AtomId, Bond, BondId, Graph, Point};
pub use schema::{EntityKind, FieldError};
pub use selection::{Selection, SelectionKind};
pub use serialization::{SavedSession, TopologyFile};
pub use session::Session;
pub use store::GraphStore;
pub use ui::GraphEditorApp;
pub use viewport::{GridSnap, Viewport};
