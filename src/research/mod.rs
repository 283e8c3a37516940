//! Multi-agent research coordination
//!
//! A research session splits a query into subtasks, runs one agent per
//! subtask and merges their answers:
//!
//! - [`decomposer::TaskDecomposer`] - query to subtasks, with a deterministic fallback
//! - [`roles::HunterRoleSystem`] - hunter profiles and team composition
//! - [`memory::ResearchMemory`] - findings and sources shared by a team
//! - [`plan::ResearchPlan`] - per-hunter todos with hand-off dependencies
//! - [`executor::ParallelGroupExecutor`] - batches with one deadline
//! - [`synthesis::ResultSynthesizer`] - one answer from many
//! - [`coordinator::Orchestrator`] - the session state machine tying it together
//!
//! # Usage
//!
//! ```ignore
//! use huntpack::research::{ExecutionMode, Orchestrator, ResearchRequest, TracingSink};
//!
//! let outcome = orchestrator
//!     .run(
//!         ResearchRequest::new("best budget hotels in Lisbon").mode(ExecutionMode::Phased),
//!         Arc::new(TracingSink),
//!     )
//!     .await?;
//! println!("{}", outcome.final_result);
//! ```

pub mod coordinator;
pub mod decomposer;
pub mod events;
pub mod executor;
pub mod memory;
pub mod plan;
pub mod progress;
pub mod roles;
pub mod synthesis;

pub use coordinator::{
    ExecutionMode, Orchestrator, OrchestratorConfig, ResearchOutcome, ResearchRequest,
};
pub use decomposer::{Decomposition, FallbackFamily, TaskDecomposer};
pub use events::{ChannelSink, EventSink, NullSink, ResearchEvent, TracingSink};
pub use executor::{ExecutionBackend, ParallelGroupExecutor};
pub use memory::ResearchMemory;
pub use plan::ResearchPlan;
pub use roles::{Complexity, HunterRoleSystem};
pub use synthesis::ResultSynthesizer;
