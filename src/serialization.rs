use crate::model::{Atom, Bond, Graph};
use crate::selection::Selection;
use crate::session::Session;
use crate::GraphEvent;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const SESSION_VERSION: &str = "0.1.0";

/// Files above this size are memory-mapped instead of read
pub const MMAP_THRESHOLD: u64 = 10_000_000;

/// Persisted editor state: the graph plus selection and zoom
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSession {
    pub version: String,
    pub saved_at: DateTime<Utc>,
    pub atoms: Vec<Atom>,
    pub bonds: Vec<Bond>,
    #[serde(default)]
    pub selection: Selection,
    #[serde(default = "default_zoom")]
    pub zoom_percent: f64,
}

fn default_zoom() -> f64 {
    100.0
}

impl SavedSession {
    /// Snapshot the graph and the persistable parts of the session
    pub fn capture(graph: &Graph, session: &Session) -> Self {
        Self {
            version: SESSION_VERSION.to_string(),
            saved_at: Utc::now(),
            atoms: graph.atoms().copied().collect(),
            bonds: graph.bonds().copied().collect(),
            selection: session.selection.clone(),
            zoom_percent: session.zoom_percent,
        }
    }

    pub fn graph(&self) -> Graph {
        Graph::from_parts(self.atoms.iter().copied(), self.bonds.iter().copied())
    }

    /// Save session to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create session directory: {}", parent.display())
            })?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create session file: {}", path.display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .with_context(|| format!("Failed to write session to: {}", path.display()))?;
        info!(path = path.display().to_string(), atoms = self.atoms.len(); "Saved session");
        Ok(())
    }

    /// Load session from file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open session file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let saved: Self = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse session from: {}", path.display()))?;

        if saved.version != SESSION_VERSION {
            return Err(anyhow!(
                "Unsupported session version {} in {}",
                saved.version,
                path.display()
            ));
        }
        info!(path = path.display().to_string(), atoms = saved.atoms.len(); "Loaded session");
        Ok(saved)
    }

    /// Load the session at `path` if the file exists
    pub fn load_if_present(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }
}

/// Append events to a JSON-lines log
pub fn append_events(path: &Path, events: &[GraphEvent]) -> Result<()> {
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open event log: {}", path.display()))?;

    let mut writer = BufWriter::new(file);

    for event in events {
        let json = event
            .to_json_line()
            .with_context(|| format!("Failed to serialize event: {}", path.display()))?;
        writeln!(writer, "{}", json)
            .with_context(|| format!("Failed to write event to: {}", path.display()))?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush event log: {}", path.display()))?;

    Ok(())
}

/// Load all events from a JSON-lines log; a missing file is an empty log
pub fn load_events(path: &Path) -> Result<Vec<GraphEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open event log: {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut events = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.with_context(|| {
            format!("Failed to read line {} from: {}", line_num + 1, path.display())
        })?;

        if line.trim().is_empty() {
            continue;
        }

        let event: GraphEvent = serde_json::from_str(&line).with_context(|| {
            format!(
                "Failed to parse event on line {} from: {}",
                line_num + 1,
                path.display()
            )
        })?;

        events.push(event);
    }

    Ok(events)
}

/// Read handle for topology data files
pub struct TopologyFile {
    path: PathBuf,
    mmap: Option<Mmap>,
    size: u64,
}

impl TopologyFile {
    /// Open file, memory-mapping it when larger than [`MMAP_THRESHOLD`]
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata = fs::metadata(&path)
            .with_context(|| format!("Failed to read file metadata: {}", path.display()))?;
        let size = metadata.len();

        let mmap = if size > MMAP_THRESHOLD {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open file for mmap: {}", path.display()))?;
            // The mapping is read-only and dropped with the handle.
            Some(unsafe {
                Mmap::map(&file)
                    .with_context(|| format!("Failed to create mmap for: {}", path.display()))?
            })
        } else {
            None
        };

        Ok(Self { path, mmap, size })
    }

    /// Read entire file content as string
    pub fn read_to_string(&self) -> Result<String> {
        if let Some(mmap) = &self.mmap {
            std::str::from_utf8(mmap)
                .map(str::to_owned)
                .with_context(|| format!("Topology file is not UTF-8: {}", self.path.display()))
        } else {
            fs::read_to_string(&self.path)
                .with_context(|| format!("Failed to read file content: {}", self.path.display()))
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_mmapped(&self) -> bool {
        self.mmap.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write the data file for `graph` to `path`
pub fn export_topology(path: &Path, graph: &Graph) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create data file: {}", path.display()))?;
    crate::codec::write(BufWriter::new(file), graph)
        .with_context(|| format!("Failed to export topology to: {}", path.display()))?;
    info!(
        path = path.display().to_string(),
        atoms = graph.atom_count(),
        bonds = graph.bond_count();
        "Exported topology"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use crate::store::{default_network, GraphStore};
    use tempfile::TempDir;

    #[test]
    fn test_session_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("session.json");

        let graph = default_network();
        let mut session = Session::new();
        session.selection.replace([3, 5]);
        session.zoom_percent = 250.0;

        SavedSession::capture(&graph, &session).save(&path).unwrap();
        let loaded = SavedSession::load(&path).unwrap();

        assert_eq!(loaded.graph(), graph);
        assert_eq!(loaded.selection.to_vec(), vec![3, 5]);
        assert_eq!(loaded.zoom_percent, 250.0);
    }

    #[test]
    fn test_load_if_present() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        assert!(SavedSession::load_if_present(&path).unwrap().is_none());
    }

    #[test]
    fn test_corrupted_session() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        fs::write(&path, "{ invalid json }").unwrap();
        assert!(SavedSession::load(&path).is_err());
    }

    #[test]
    fn test_version_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        let mut saved = SavedSession::capture(&Graph::new(), &Session::new());
        saved.version = "9.9.9".to_string();
        saved.save(&path).unwrap();
        assert!(SavedSession::load(&path).is_err());
    }

    #[test]
    fn test_event_logging() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.jsonl");

        let mut store = GraphStore::default();
        store.add_atom();
        store.undo();
        append_events(&path, store.events()).unwrap();
        append_events(&path, store.events()).unwrap();

        let loaded = load_events(&path).unwrap();
        assert_eq!(loaded.len(), 4);
        assert!(matches!(loaded[1].event, EventType::Undone { .. }));
    }

    #[test]
    fn test_topology_file_small() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("net.data");
        fs::write(&path, "Atoms\n\n1 1 1 0 0 0 0\n").unwrap();

        let file = TopologyFile::open(&path).unwrap();
        assert!(!file.is_mmapped());
        assert_eq!(file.size(), 21);
        assert_eq!(file.read_to_string().unwrap(), "Atoms\n\n1 1 1 0 0 0 0\n");
    }

    #[test]
    fn test_topology_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        assert!(TopologyFile::open(temp_dir.path().join("absent.data")).is_err());
    }

    #[test]
    fn test_export_topology() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.data");
        export_topology(&path, &default_network()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("16 atoms"));
        assert!(export_topology(&path, &Graph::new()).is_err());
    }
}
