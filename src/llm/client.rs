//! LLM client abstraction
//!
//! The orchestration core only ever needs one operation from a model: send an
//! ordered list of role-tagged messages plus a tool schema and receive one
//! assistant message back. Everything else is layered on top of [`LLMClient::chat`].

use crate::types::{ConversationMessage, Result, ToolCall, ToolDefinition};
use async_trait::async_trait;
use std::sync::Arc;

/// Chat-capable model endpoint.
///
/// Implementations must map any transport or non-success response to
/// [`AppError::LLM`](crate::types::AppError::LLM). No retries happen at this layer.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Send a full conversation and receive the next assistant message
    async fn chat(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse>;

    /// Generate a completion from a single user prompt
    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .chat(&[ConversationMessage::user(prompt)], &[])
            .await?;
        Ok(response.content)
    }

    /// Generate with a system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        let messages = [
            ConversationMessage::system(system),
            ConversationMessage::user(prompt),
        ];
        let response = self.chat(&messages, &[]).await?;
        Ok(response.content)
    }

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Response from an LLM chat request
#[derive(Debug, Clone, Default)]
pub struct LLMResponse {
    /// The text content of the response
    pub content: String,
    /// Any tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    /// The reason generation stopped (e.g., "stop", "tool_calls")
    pub finish_reason: String,
}

impl LLMResponse {
    /// Plain text reply with no tool calls
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            finish_reason: "stop".to_string(),
        }
    }

    /// Reply requesting tool calls
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            finish_reason: "tool_calls".to_string(),
        }
    }
}

/// Sampling parameters sent with every chat request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// Ollama local LLM provider
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "qwen2.5:7b".to_string(),
    ///     params: ModelParams::default(),
    ///     timeout_secs: 300,
    /// };
    /// ```
    Ollama {
        base_url: String,
        model: String,
        params: ModelParams,
        timeout_secs: u64,
    },
}

impl Provider {
    /// Create a shared client for this provider
    pub fn create_client(&self) -> Result<Arc<dyn LLMClient>> {
        match self {
            Provider::Ollama {
                base_url,
                model,
                params,
                timeout_secs,
            } => {
                let client = super::ollama::OllamaClient::new(
                    base_url.clone(),
                    model.clone(),
                    *params,
                    std::time::Duration::from_secs(*timeout_secs),
                )?;
                Ok(Arc::new(client))
            }
        }
    }

    /// Build a provider from the `[llm]` config section
    pub fn from_config(config: &crate::utils::toml_config::LlmConfig) -> Self {
        Provider::Ollama {
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            params: ModelParams {
                temperature: config.temperature,
                top_p: config.top_p,
            },
            timeout_secs: config.request_timeout_secs,
        }
    }
}
