//! LLM provider clients
//!
//! - [`LLMClient`] - the chat trait every agent, the decomposer and the synthesizer depend on
//! - [`OllamaClient`] - `reqwest`-based client for a local Ollama server
//! - [`Provider`] - runtime provider selection, built from the `[llm]` config section

/// Core LLM client trait and response types.
pub mod client;
/// Ollama `/api/chat` client.
pub mod ollama;

pub use client::{LLMClient, LLMResponse, ModelParams, Provider};
pub use ollama::OllamaClient;
