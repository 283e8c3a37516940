//! Bounded conversation loop for one agent
//!
//! The runtime drives a single model conversation:
//!
//! 1. Seed the history with a system prompt and one user message
//! 2. Call the model with the full history and the registry's tool schema
//! 3. Execute requested tools one by one and append their results
//! 4. Stop as soon as `mark_task_complete` runs, or when the iteration budget is spent
//!
//! A reply without tool calls does not end the loop; the model is allowed to
//! reason across turns before acting. When the model writes tool calls as
//! JSON text instead of using the structured channel, they are recovered with
//! a pattern match.

use crate::llm::LLMClient;
use crate::tools::registry::{ToolRegistry, COMPLETE_TOOL};
use crate::types::{ConversationMessage, Result, ToolCall};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

/// Returned when the budget runs out before the model said anything.
pub const STUCK_MESSAGE: &str = "Maximum iterations reached. The agent may be stuck in a loop.";

static TEXT_TOOL_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"\{"name":\s*"([^"]+)",\s*"parameters":\s*(\{[^}]*\})\}"#)
            .expect("valid tool-call pattern"),
        Regex::new(r#"\{"function":\s*\{"name":\s*"([^"]+)",\s*"arguments":\s*(\{[^}]*\})\}\}"#)
            .expect("valid tool-call pattern"),
    ]
});

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Model round-trips before giving up.
    pub max_iterations: usize,
    /// Upper bound for a single tool call.
    pub tool_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tool_timeout: Duration::from_secs(60),
        }
    }
}

impl RuntimeConfig {
    /// Budget used by hunter agents.
    pub fn research() -> Self {
        Self {
            max_iterations: 15,
            ..Self::default()
        }
    }
}

/// One executed tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    /// Canonical tool name.
    pub name: String,
    pub arguments: Value,
    pub result: Value,
    pub success: bool,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The completion tool was called.
    Completed,
    /// Budget exhausted.
    MaxIterations,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeOutcome {
    pub content: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub iterations: usize,
    pub finish_reason: FinishReason,
}

/// Notified before and after every tool call.
pub trait StepObserver: Send + Sync {
    fn on_step(&self, step_type: &str, data: Value);
}

pub struct AgentRuntime {
    llm: Arc<dyn LLMClient>,
    tools: Arc<ToolRegistry>,
    config: RuntimeConfig,
    observer: Option<Arc<dyn StepObserver>>,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LLMClient>, tools: Arc<ToolRegistry>, config: RuntimeConfig) -> Self {
        Self {
            llm,
            tools,
            config,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StepObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Run the loop to completion.
    ///
    /// Only model call failures are returned as errors; tool failures are fed
    /// back to the model as `{"error": ...}` results.
    pub async fn run(&self, system_prompt: &str, user_input: &str) -> Result<RuntimeOutcome> {
        let definitions = self.tools.get_tool_definitions();
        let mut messages = vec![
            ConversationMessage::system(system_prompt),
            ConversationMessage::user(user_input),
        ];
        let mut assistant_texts: Vec<String> = Vec::new();
        let mut records: Vec<ToolCallRecord> = Vec::new();

        for iteration in 1..=self.config.max_iterations {
            tracing::debug!(iteration, max = self.config.max_iterations, "Agent iteration");
            let response = self.llm.chat(&messages, &definitions).await?;

            let mut calls: Vec<ToolCall> = response
                .tool_calls
                .into_iter()
                .map(|call| ToolCall {
                    arguments: normalize_arguments(call.arguments),
                    ..call
                })
                .collect();

            messages.push(ConversationMessage::assistant(&response.content, calls.clone()));
            if !response.content.is_empty() {
                assistant_texts.push(response.content.clone());
            }

            if calls.is_empty() {
                calls = parse_text_tool_calls(&response.content);
                if calls.is_empty() {
                    tracing::debug!(iteration, "Model replied without tool calls, continuing");
                    continue;
                }
                tracing::debug!(count = calls.len(), "Recovered tool calls from text");
            }

            for call in calls {
                let record = self.execute_call(call).await;
                messages.push(ConversationMessage::tool_result(
                    &record.id,
                    &record.name,
                    &record.result,
                ));
                let completed = record.name == COMPLETE_TOOL;
                records.push(record);

                if completed {
                    tracing::info!(iteration, tool_calls = records.len(), "Agent marked task complete");
                    return Ok(RuntimeOutcome {
                        content: completion_content(&assistant_texts),
                        tool_calls: records,
                        iterations: iteration,
                        finish_reason: FinishReason::Completed,
                    });
                }
            }
        }

        tracing::warn!(max = self.config.max_iterations, "Agent reached iteration limit");
        let content = if assistant_texts.is_empty() {
            STUCK_MESSAGE.to_string()
        } else {
            assistant_texts.join("\n\n")
        };
        Ok(RuntimeOutcome {
            content,
            tool_calls: records,
            iterations: self.config.max_iterations,
            finish_reason: FinishReason::MaxIterations,
        })
    }

    async fn execute_call(&self, call: ToolCall) -> ToolCallRecord {
        let name = self.tools.canonical_name(&call.name);
        self.notify(
            "tool_execution",
            json!({ "tool": name, "arguments": call.arguments }),
        );

        let start = Instant::now();
        let outcome = tokio::time::timeout(
            self.config.tool_timeout,
            self.tools.dispatch(&call.name, call.arguments.clone()),
        )
        .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (result, success) = match outcome {
            Ok(outcome) => (outcome.result, outcome.success),
            Err(_) => {
                tracing::warn!(tool = %name, "Tool call timed out");
                (
                    json!({ "error": format!(
                        "Tool execution failed: timed out after {}s",
                        self.config.tool_timeout.as_secs()
                    ) }),
                    false,
                )
            }
        };

        if success {
            self.notify(
                "tool_completed",
                json!({ "tool": name, "duration_ms": duration_ms, "result_preview": preview(&result) }),
            );
        } else {
            self.notify(
                "tool_failed",
                json!({ "tool": name, "duration_ms": duration_ms, "error": result.get("error").cloned().unwrap_or(Value::Null) }),
            );
        }

        ToolCallRecord {
            id: call.id,
            name,
            arguments: call.arguments,
            result,
            success,
            duration_ms,
        }
    }

    fn notify(&self, step_type: &str, data: Value) {
        if let Some(observer) = &self.observer {
            observer.on_step(step_type, data);
        }
    }
}

/// Accept arguments as an object or a JSON-encoded object string.
pub fn normalize_arguments(arguments: Value) -> Value {
    match arguments {
        Value::Object(_) => arguments,
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(parsed @ Value::Object(_)) => parsed,
            _ => {
                tracing::debug!(raw = %raw, "Tool arguments are not a JSON object");
                Value::Object(Map::new())
            }
        },
        _ => Value::Object(Map::new()),
    }
}

/// Recover JSON-shaped tool calls written into plain text.
pub fn parse_text_tool_calls(text: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    for pattern in TEXT_TOOL_PATTERNS.iter() {
        for captures in pattern.captures_iter(text) {
            let (Some(name), Some(raw_args)) = (captures.get(1), captures.get(2)) else {
                continue;
            };
            let Ok(arguments @ Value::Object(_)) = serde_json::from_str::<Value>(raw_args.as_str())
            else {
                continue;
            };
            calls.push(ToolCall {
                id: format!("call_{}", calls.len()),
                name: name.as_str().to_string(),
                arguments,
            });
        }
    }
    calls
}

/// Assistant texts minus completion chatter, joined by blank lines.
fn completion_content(texts: &[String]) -> String {
    texts
        .iter()
        .filter(|t| !t.contains(COMPLETE_TOOL) && !t.starts_with("User's request has been fulfilled"))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn preview(result: &Value) -> String {
    let text = result.to_string();
    match text.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text,
    }
}
