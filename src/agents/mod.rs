//! Research agents
//!
//! - [`runtime::AgentRuntime`] drives one bounded model conversation with tools.
//! - [`hunter::HunterAgent`] wraps a runtime run with role prompts, shared
//!   memory and plan bookkeeping.

pub mod hunter;
pub mod runtime;

pub use hunter::{AgentContext, HunterAgent, HunterReport};
pub use runtime::{AgentRuntime, FinishReason, RuntimeConfig, RuntimeOutcome, StepObserver};
