use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A store event with timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEvent {
    pub timestamp: DateTime<Utc>,
    pub event: EventType,
}

impl GraphEvent {
    /// Create a new event with the current timestamp
    pub fn new(event: EventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }

    /// Serialize as a single JSON line
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Things that happen to the graph through the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventType {
    /// A commit produced a new history entry
    Committed {
        label: String,
        atoms: usize,
        bonds: usize,
    },

    Undone {
        atoms: usize,
        bonds: usize,
    },

    Redone {
        atoms: usize,
        bonds: usize,
    },

    /// The graph was replaced from a topology text
    Loaded {
        atoms: usize,
        bonds: usize,
    },

    /// Bonds dropped at the commit boundary
    IntegrityRepaired {
        dangling: usize,
        self_loops: usize,
        duplicates: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = GraphEvent::new(EventType::Undone { atoms: 3, bonds: 2 });
        assert!(event.timestamp <= Utc::now());
    }

    #[test]
    fn test_event_serialization() {
        let event = GraphEvent::new(EventType::Committed {
            label: "add atom".to_string(),
            atoms: 4,
            bonds: 1,
        });

        let json = event.to_json_line().unwrap();
        assert!(!json.contains('\n'));
        let deserialized: GraphEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.event, event.event);
        assert_eq!(deserialized.timestamp, event.timestamp);
    }
}
