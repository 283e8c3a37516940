//! # huntpack
//!
//! Multi-agent research orchestration against a local Ollama endpoint.
//!
//! A research query is decomposed into subtasks, each subtask is handed to
//! an agent that can search the web, and the agents' answers are merged into
//! one. In the deep modes the agents are specialized *hunters*
//! (`source_scout`, `deep_analyst`, `fact_checker`, `insight_synthesizer`)
//! that share a research memory and a todo plan with hand-off dependencies.
//!
//! ## Overview
//!
//! huntpack can be used in two ways:
//!
//! 1. **As a command-line tool / server** - Run the `huntpack` binary
//! 2. **As a library** - Build an [`Orchestrator`] and run sessions yourself
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use huntpack::{AppState, ExecutionMode, HuntConfig, HuntConfigManager, ResearchRequest};
//! use huntpack::research::TracingSink;
//! use std::sync::Arc;
//!
//! let config = HuntConfig::load("huntpack.toml")?;
//! let state = AppState::from_config(Arc::new(HuntConfigManager::from_config(config)))?;
//!
//! let outcome = state
//!     .orchestrator()
//!     .run(
//!         ResearchRequest::new("best budget hotels in Lisbon").mode(ExecutionMode::Phased),
//!         Arc::new(TracingSink),
//!     )
//!     .await?;
//! println!("{}", outcome.final_result);
//! ```
//!
//! ## Modules
//!
//! - [`agents`] - Agent runtime loop and hunter agents
//! - [`api`] - REST and WebSocket handlers and routes
//! - [`db`] - Research session storage
//! - [`llm`] - LLM client trait and the Ollama client
//! - [`research`] - Decomposition, roles, memory, plan, execution and synthesis
//! - [`tools`] - Tool contract, registry and built-in tools
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration with hot reload

/// Agent runtime and hunter agents.
pub mod agents;
/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Research session storage.
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Multi-agent research coordination.
pub mod research;
/// Built-in tools (web search, task completion).
pub mod tools;
/// Core types (hunters, results, messages, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use db::{InMemorySessionStore, SessionStore};
pub use llm::{LLMClient, LLMResponse, Provider};
pub use research::{
    ExecutionMode, HunterRoleSystem, Orchestrator, OrchestratorConfig, ResearchOutcome,
    ResearchRequest,
};
pub use tools::registry::ToolRegistry;
pub use types::{AppError, HunterType, Result};
pub use utils::toml_config::{HuntConfig, HuntConfigManager};

use crate::db::StoreProvider;
use crate::tools::search::{DaedraBackend, SearchTool};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML configuration with hot-reload support
    pub config_manager: Arc<HuntConfigManager>,
    /// Chat client shared by every session
    pub llm: Arc<dyn LLMClient>,
    /// Tools available to agents
    pub tools: Arc<ToolRegistry>,
    /// Hunter profiles and team table
    pub roles: Arc<HunterRoleSystem>,
    /// Session snapshots
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    /// Build the state from configuration: Ollama client, daedra-backed
    /// search and an in-memory session store.
    pub fn from_config(config_manager: Arc<HuntConfigManager>) -> Result<Self> {
        let config = config_manager.config();
        let llm = Provider::from_config(&config.llm).create_client()?;
        let search = SearchTool::new(Arc::new(DaedraBackend::new(config.search.fetch_concurrency)))
            .with_defaults(config.search.max_results, config.search.deep_extract);

        Ok(Self {
            config_manager,
            llm,
            tools: Arc::new(ToolRegistry::with_research_tools(search)),
            roles: Arc::new(HunterRoleSystem::new()),
            sessions: StoreProvider::Memory.create_store(),
        })
    }

    /// Orchestrator with the current configuration.
    pub fn orchestrator(&self) -> Orchestrator {
        let config = self.config_manager.config();
        Orchestrator::new(
            self.llm.clone(),
            self.tools.clone(),
            self.roles.clone(),
            self.sessions.clone(),
            OrchestratorConfig::from(config.as_ref()),
        )
    }
}
