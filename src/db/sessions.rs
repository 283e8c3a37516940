//! Research session storage
//!
//! A session snapshot is written when a run starts and rewritten at every
//! phase change, so clients can poll a run in flight.
//!
//! # Example
//!
//! ```rust,ignore
//! use huntpack::db::{SessionStore, StoreProvider};
//!
//! let store = StoreProvider::Memory.create_store();
//! let sessions = store.list().await?;
//! ```

use crate::types::{AppError, HunterType, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Ongoing,
    Completed,
    Failed,
}

/// Orchestrator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Initializing,
    Decomposing,
    Planning,
    Executing,
    Synthesizing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAgent {
    pub agent_id: usize,
    pub hunter_type: HunterType,
    pub subtask: String,
    /// `QUEUED`, `PROCESSING...`, `COMPLETED` or `FAILED: ...`
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSession {
    pub session_id: String,
    pub query: String,
    pub status: SessionStatus,
    pub current_phase: SessionPhase,
    /// 0-100
    pub progress: f64,
    pub agents: Vec<SessionAgent>,
    pub start_time: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_result: Option<String>,
}

impl ResearchSession {
    pub fn new(session_id: impl Into<String>, query: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            query: query.into(),
            status: SessionStatus::Ongoing,
            current_phase: SessionPhase::Initializing,
            progress: 0.0,
            agents: Vec::new(),
            start_time: now,
            last_updated: now,
            final_result: None,
        }
    }

    pub fn set_phase(&mut self, phase: SessionPhase) {
        self.current_phase = phase;
        match phase {
            SessionPhase::Completed => self.status = SessionStatus::Completed,
            SessionPhase::Failed => self.status = SessionStatus::Failed,
            _ => {}
        }
        self.last_updated = Utc::now();
    }

    pub fn set_agent_status(&mut self, agent_id: usize, status: impl Into<String>) {
        if let Some(agent) = self.agents.iter_mut().find(|a| a.agent_id == agent_id) {
            agent.status = status.into();
        }
        let completed = self
            .agents
            .iter()
            .filter(|a| a.status == "COMPLETED")
            .count();
        if !self.agents.is_empty() {
            self.progress = completed as f64 / self.agents.len() as f64 * 100.0;
        }
        self.last_updated = Utc::now();
    }
}

/// Key-value store of session snapshots.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session; fails if the id already exists.
    async fn create(&self, session: ResearchSession) -> Result<()>;

    /// Replace an existing session.
    async fn update(&self, session: ResearchSession) -> Result<()>;

    async fn get(&self, session_id: &str) -> Result<Option<ResearchSession>>;

    /// Newest first.
    async fn list(&self) -> Result<Vec<ResearchSession>>;

    /// Drop sessions whose last update is older than `age`; returns how many.
    async fn cleanup_older_than(&self, age: Duration) -> Result<usize>;
}

/// Session store selection
#[derive(Debug, Clone, Default)]
pub enum StoreProvider {
    /// Process-local map, lost on restart
    #[default]
    Memory,
}

impl StoreProvider {
    pub fn create_store(&self) -> Arc<dyn SessionStore> {
        match self {
            StoreProvider::Memory => Arc::new(InMemorySessionStore::new()),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, ResearchSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: ResearchSession) -> Result<()> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&session.session_id) {
            return Err(AppError::InvalidInput(format!(
                "Session {} already exists",
                session.session_id
            )));
        }
        sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    async fn update(&self, session: ResearchSession) -> Result<()> {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(&session.session_id) {
            Some(existing) => {
                *existing = session;
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "Session {} not found",
                session.session_id
            ))),
        }
    }

    async fn get(&self, session_id: &str) -> Result<Option<ResearchSession>> {
        Ok(self.sessions.read().get(session_id).cloned())
    }

    async fn list(&self) -> Result<Vec<ResearchSession>> {
        let mut sessions: Vec<ResearchSession> = self.sessions.read().values().cloned().collect();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(sessions)
    }

    async fn cleanup_older_than(&self, age: Duration) -> Result<usize> {
        let cutoff = Utc::now() - age;
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.last_updated >= cutoff);
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, "Purged expired research sessions");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_agents(id: &str, n: usize) -> ResearchSession {
        let mut session = ResearchSession::new(id, "best budget hotels in Lisbon");
        session.agents = (0..n)
            .map(|i| SessionAgent {
                agent_id: i,
                hunter_type: HunterType::General,
                subtask: format!("task {i}"),
                status: "QUEUED".into(),
            })
            .collect();
        session
    }

    #[tokio::test]
    async fn create_get_update() {
        let store = InMemorySessionStore::new();
        store.create(session_with_agents("s1", 2)).await.unwrap();
        assert!(store.create(session_with_agents("s1", 2)).await.is_err());

        let mut session = store.get("s1").await.unwrap().unwrap();
        session.set_agent_status(0, "COMPLETED");
        session.set_phase(SessionPhase::Completed);
        store.update(session).await.unwrap();

        let stored = store.get("s1").await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);
        assert_eq!(stored.progress, 50.0);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_unknown_is_not_found() {
        let store = InMemorySessionStore::new();
        let err = store.update(ResearchSession::new("nope", "q")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn cleanup_drops_stale_sessions() {
        let store = InMemorySessionStore::new();
        let mut old = ResearchSession::new("old", "q");
        old.last_updated = Utc::now() - Duration::hours(48);
        store.create(old).await.unwrap();
        store.create(ResearchSession::new("fresh", "q")).await.unwrap();

        assert_eq!(store.cleanup_older_than(Duration::hours(24)).await.unwrap(), 1);
        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|s| s.session_id).collect();
        assert_eq!(ids, vec!["fresh"]);
    }

    #[test]
    fn only_completed_agents_count_towards_progress() {
        let mut session = session_with_agents("s", 4);
        session.set_agent_status(1, "FAILED: timeout");
        assert_eq!(session.progress, 0.0);
        session.set_agent_status(2, "COMPLETED");
        assert_eq!(session.progress, 25.0);
        session.set_phase(SessionPhase::Failed);
        assert_eq!(session.status, SessionStatus::Failed);
    }
}
