//! Mock implementations for testing.
//!
//! [`ScriptedLLM`] answers the three kinds of prompt a research session sends:
//! the decomposition prompt, agent conversations (with tools) and the
//! synthesis prompt. Agents search once and then call `mark_task_complete`.

use async_trait::async_trait;
use huntpack::llm::{LLMClient, LLMResponse};
use huntpack::research::{EventSink, ResearchEvent};
use huntpack::tools::{SearchBackend, SearchDocument, COMPLETE_TOOL, SEARCH_TOOL};
use huntpack::tools::search::Authority;
use huntpack::types::{AppError, ConversationMessage, MessageRole, Result, ToolCall, ToolDefinition};
use parking_lot::Mutex;
use regex::Regex;
use serde_json::json;
use std::time::Duration;

/// Prefix of every agent answer produced by [`ScriptedLLM`].
pub const FINDINGS_PREFIX: &str = "Findings for: ";

/// Scripted model for orchestration tests.
pub struct ScriptedLLM {
    /// Raw decomposition reply; `None` generates `["Question 1", ...]`.
    decomposition: Option<String>,
    fail_decomposition: bool,
    /// `None` makes the synthesis call fail.
    synthesis: Option<String>,
    /// Agents whose user input contains this text fail.
    fail_marker: Option<String>,
    /// Added before every agent turn.
    agent_delay: Duration,
    /// Every prompt seen, as the concatenated message contents.
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLLM {
    pub fn new() -> Self {
        Self {
            decomposition: None,
            fail_decomposition: false,
            synthesis: Some("Merged answer".to_string()),
            fail_marker: None,
            agent_delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Reply to the decomposition prompt with a JSON array of `questions`.
    pub fn with_questions(mut self, questions: &[&str]) -> Self {
        self.decomposition = Some(json!(questions).to_string());
        self
    }

    /// Reply to the decomposition prompt with arbitrary text.
    pub fn with_decomposition_reply(mut self, reply: &str) -> Self {
        self.decomposition = Some(reply.to_string());
        self
    }

    pub fn failing_decomposition(mut self) -> Self {
        self.fail_decomposition = true;
        self
    }

    pub fn failing_synthesis(mut self) -> Self {
        self.synthesis = None;
        self
    }

    pub fn failing_agents_matching(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn with_agent_delay(mut self, delay: Duration) -> Self {
        self.agent_delay = delay;
        self
    }

    /// Prompts that reached the synthesis branch.
    pub fn synthesis_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .iter()
            .filter(|p| p.contains("=== AGENT 1 RESPONSE ==="))
            .cloned()
            .collect()
    }

    fn decompose(&self, prompt: &str) -> Result<LLMResponse> {
        if self.fail_decomposition {
            return Err(AppError::LLM("connection refused".to_string()));
        }
        if let Some(reply) = &self.decomposition {
            return Ok(LLMResponse::text(reply.clone()));
        }
        let count = Regex::new(r"into (\d+) distinct")
            .unwrap()
            .captures(prompt)
            .and_then(|c| c[1].parse::<usize>().ok())
            .unwrap_or(1);
        let questions: Vec<String> = (1..=count).map(|i| format!("Question {}", i)).collect();
        Ok(LLMResponse::text(json!(questions).to_string()))
    }

    async fn agent_turn(&self, messages: &[ConversationMessage]) -> Result<LLMResponse> {
        if !self.agent_delay.is_zero() {
            tokio::time::sleep(self.agent_delay).await;
        }
        let user = messages
            .iter()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        if let Some(marker) = &self.fail_marker {
            if user.contains(marker.as_str()) {
                return Err(AppError::LLM(format!("model crashed on '{}'", user)));
            }
        }

        let searched = messages.iter().any(|m| m.role == MessageRole::Tool);
        if !searched {
            return Ok(LLMResponse::with_tool_calls(
                "",
                vec![ToolCall {
                    id: "call_search".to_string(),
                    name: SEARCH_TOOL.to_string(),
                    arguments: json!({ "query": user }),
                }],
            ));
        }

        Ok(LLMResponse::with_tool_calls(
            format!("{}{}", FINDINGS_PREFIX, user),
            vec![ToolCall {
                id: "call_done".to_string(),
                name: COMPLETE_TOOL.to_string(),
                arguments: json!({ "task_summary": "done" }),
            }],
        ))
    }
}

impl Default for ScriptedLLM {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for ScriptedLLM {
    async fn chat(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().push(prompt.clone());

        if !tools.is_empty() {
            return self.agent_turn(messages).await;
        }
        if prompt.contains("=== AGENT 1 RESPONSE ===") {
            return self
                .synthesis
                .clone()
                .map(LLMResponse::text)
                .ok_or_else(|| AppError::LLM("synthesis model unavailable".to_string()));
        }
        if prompt.contains("research planner") {
            return self.decompose(&prompt);
        }
        Ok(LLMResponse::text(""))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Search backend returning the same two documents for every query.
pub struct StaticSearch;

#[async_trait]
impl SearchBackend for StaticSearch {
    async fn search(&self, query: &str, max_results: usize, _deep_extract: bool) -> Vec<SearchDocument> {
        let documents = vec![
            SearchDocument {
                url: "https://en.wikipedia.org/wiki/Lisbon".to_string(),
                title: format!("Lisbon - {}", query),
                content: "Lisbon is the capital of Portugal.".to_string(),
                key_facts: vec!["Lisbon is the capital and largest city of Portugal".to_string()],
                extraction_success: true,
                word_count: 6,
                authority: Authority::High,
            },
            SearchDocument {
                url: "https://travel.example.com/lisbon-hotels".to_string(),
                title: "Budget hotels".to_string(),
                content: "Hostels start at 20 EUR per night.".to_string(),
                key_facts: Vec::new(),
                extraction_success: true,
                word_count: 7,
                authority: Authority::Unknown,
            },
        ];
        documents.into_iter().take(max_results).collect()
    }
}

/// Keeps every event in order.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<ResearchEvent>>,
}

impl RecordingSink {
    pub fn types(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.event_type()).collect()
    }
}

impl EventSink for RecordingSink {
    fn send(&self, event: ResearchEvent) {
        self.events.lock().push(event);
    }
}
