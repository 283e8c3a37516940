//! Per-agent progress board shared by the orchestrator and its agents.

use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentProgress {
    Queued,
    Processing,
    Completed,
    Failed(String),
}

impl AgentProgress {
    pub fn is_finished(&self) -> bool {
        matches!(self, AgentProgress::Completed | AgentProgress::Failed(_))
    }

    /// Coarse percentage used in `agent_progress` events.
    pub fn percent(&self) -> u8 {
        match self {
            AgentProgress::Queued => 0,
            AgentProgress::Processing => 50,
            AgentProgress::Completed | AgentProgress::Failed(_) => 100,
        }
    }
}

impl fmt::Display for AgentProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentProgress::Queued => f.write_str("QUEUED"),
            AgentProgress::Processing => f.write_str("PROCESSING..."),
            AgentProgress::Completed => f.write_str("COMPLETED"),
            AgentProgress::Failed(reason) => write!(f, "FAILED: {}", reason),
        }
    }
}

impl Serialize for AgentProgress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressEntry {
    pub status: AgentProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Readable at any time; writers hold the lock only for a single update.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    entries: RwLock<BTreeMap<usize, ProgressEntry>>,
}

impl ProgressTracker {
    pub fn new(agent_ids: impl IntoIterator<Item = usize>) -> Self {
        let entries = agent_ids
            .into_iter()
            .map(|id| {
                (
                    id,
                    ProgressEntry {
                        status: AgentProgress::Queued,
                        result: None,
                    },
                )
            })
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn update(&self, agent_id: usize, status: AgentProgress, result: Option<String>) {
        let mut entries = self.entries.write();
        let entry = entries.entry(agent_id).or_insert(ProgressEntry {
            status: AgentProgress::Queued,
            result: None,
        });
        entry.status = status;
        if result.is_some() {
            entry.result = result;
        }
    }

    pub fn status(&self, agent_id: usize) -> Option<AgentProgress> {
        self.entries.read().get(&agent_id).map(|e| e.status.clone())
    }

    pub fn snapshot(&self) -> BTreeMap<usize, ProgressEntry> {
        self.entries.read().clone()
    }

    pub fn total(&self) -> usize {
        self.entries.read().len()
    }

    pub fn finished(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|e| e.status.is_finished())
            .count()
    }

    /// Finished agents over all agents, 0-100.
    pub fn percentage(&self) -> f64 {
        let entries = self.entries.read();
        if entries.is_empty() {
            return 0.0;
        }
        let done = entries.values().filter(|e| e.status.is_finished()).count();
        done as f64 / entries.len() as f64 * 100.0
    }
}
