//! Tools available to research agents
//!
//! - [`registry`](crate::tools::registry) - the [`Tool`]/[`SyncTool`] traits and the alias-aware [`ToolRegistry`]
//! - [`search`](crate::tools::search) - `search_web` over a pluggable [`SearchBackend`](search::SearchBackend)
//! - [`complete`](crate::tools::complete) - the reserved `mark_task_complete` tool
//!
//! Tool failures never propagate out of [`ToolRegistry::dispatch`]; they come
//! back as `{"error": ...}` payloads the model can react to.

/// Reserved completion tool.
pub mod complete;
/// Tool traits and registry.
pub mod registry;
/// Web search tool and backends.
pub mod search;

pub use registry::{SyncTool, Tool, ToolOutcome, ToolRegistry, COMPLETE_TOOL, SEARCH_TOOL};
pub use search::{DaedraBackend, SearchBackend, SearchDocument, SearchTool};
