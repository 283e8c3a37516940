//! Session persistence.
//!
//! Research sessions are stored as snapshots behind the [`SessionStore`]
//! trait. The in-memory store is the only provider; it keeps sessions for
//! the lifetime of the process and purges them after the retention window.

pub mod sessions;

pub use sessions::{
    InMemorySessionStore, ResearchSession, SessionAgent, SessionPhase, SessionStatus, SessionStore,
    StoreProvider,
};
