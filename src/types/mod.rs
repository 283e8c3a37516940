use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============= Hunter Types =============

/// Specialization of a research agent.
///
/// The four specialized hunters form the canonical hand-off sequence
/// `source_scout -> deep_analyst -> fact_checker -> insight_synthesizer`.
/// `General` agents carry no profile and take part in no hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HunterType {
    SourceScout,
    DeepAnalyst,
    FactChecker,
    InsightSynthesizer,
    General,
}

impl HunterType {
    /// Specialized hunters in hand-off order.
    pub const SEQUENCE: [HunterType; 4] = [
        HunterType::SourceScout,
        HunterType::DeepAnalyst,
        HunterType::FactChecker,
        HunterType::InsightSynthesizer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HunterType::SourceScout => "source_scout",
            HunterType::DeepAnalyst => "deep_analyst",
            HunterType::FactChecker => "fact_checker",
            HunterType::InsightSynthesizer => "insight_synthesizer",
            HunterType::General => "general",
        }
    }

    /// Position in the hand-off sequence, `None` for `General`.
    pub fn sequence_index(&self) -> Option<usize> {
        Self::SEQUENCE.iter().position(|t| t == self)
    }

    /// Human-readable label, e.g. "Deep Analyst".
    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for HunterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HunterType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "source_scout" => Ok(HunterType::SourceScout),
            "deep_analyst" => Ok(HunterType::DeepAnalyst),
            "fact_checker" => Ok(HunterType::FactChecker),
            "insight_synthesizer" => Ok(HunterType::InsightSynthesizer),
            "general" => Ok(HunterType::General),
            other => Err(AppError::UnknownHunterType(other.to_string())),
        }
    }
}

// ============= Orchestration Types =============

/// One unit of decomposed work handed to a single agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hunter_type: Option<HunterType>,
}

impl Subtask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hunter_type: None,
        }
    }

    pub fn for_hunter(text: impl Into<String>, hunter_type: HunterType) -> Self {
        Self {
            text: text.into(),
            hunter_type: Some(hunter_type),
        }
    }

    /// Hunter type this subtask runs as, `General` when unassigned.
    pub fn hunter(&self) -> HunterType {
        self.hunter_type.unwrap_or(HunterType::General)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Success,
    Error,
    Timeout,
}

/// Outcome of one agent run. Read-only once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRunResult {
    pub agent_id: usize,
    pub status: AgentStatus,
    pub subtask: Subtask,
    pub response: String,
    pub execution_time_ms: u64,
    pub findings_count: usize,
}

impl AgentRunResult {
    pub fn success(
        agent_id: usize,
        subtask: Subtask,
        response: String,
        execution_time_ms: u64,
        findings_count: usize,
    ) -> Self {
        Self {
            agent_id,
            status: AgentStatus::Success,
            subtask,
            response,
            execution_time_ms,
            findings_count,
        }
    }

    /// A failed run; `response` carries the error text for display only.
    pub fn failed(
        agent_id: usize,
        subtask: Subtask,
        status: AgentStatus,
        error: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            agent_id,
            status,
            subtask,
            response: error.into(),
            execution_time_ms,
            findings_count: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AgentStatus::Success
    }
}

// ============= Conversation Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in an agent conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name on `Tool` messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ConversationMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(MessageRole::Assistant, content)
        }
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        result: &serde_json::Value,
    ) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
            ..Self::plain(MessageRole::Tool, result.to_string())
        }
    }

    fn plain(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }
}

// ============= Tool Types =============

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A tool invocation requested by the model.
///
/// `arguments` is kept as received: either a JSON object or a JSON-encoded
/// string. The agent runtime normalizes it before dispatch.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("Decomposition error: {0}")]
    Decomposition(String),

    #[error("Agent execution error: {0}")]
    AgentExecution(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Unknown hunter type: {0}")]
    UnknownHunterType(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) | AppError::UnknownHunterType(_) => StatusCode::BAD_REQUEST,
            AppError::LLM(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hunter_type_round_trips_through_str() {
        for hunter in HunterType::SEQUENCE {
            assert_eq!(hunter.as_str().parse::<HunterType>().unwrap(), hunter);
        }
        assert_eq!("GENERAL".parse::<HunterType>().unwrap(), HunterType::General);
    }

    #[test]
    fn unknown_hunter_type_is_an_error() {
        let err = "bounty_hunter".parse::<HunterType>().unwrap_err();
        assert!(matches!(err, AppError::UnknownHunterType(ref t) if t == "bounty_hunter"));
    }

    #[test]
    fn hunter_title_is_capitalized() {
        assert_eq!(HunterType::InsightSynthesizer.title(), "Insight Synthesizer");
        assert_eq!(HunterType::General.title(), "General");
    }

    #[test]
    fn sequence_index_skips_general() {
        assert_eq!(HunterType::SourceScout.sequence_index(), Some(0));
        assert_eq!(HunterType::InsightSynthesizer.sequence_index(), Some(3));
        assert_eq!(HunterType::General.sequence_index(), None);
    }

    #[test]
    fn hunter_type_serializes_snake_case() {
        let json = serde_json::to_string(&HunterType::FactChecker).unwrap();
        assert_eq!(json, "\"fact_checker\"");
    }

    #[test]
    fn failed_result_has_no_findings() {
        let result = AgentRunResult::failed(
            2,
            Subtask::new("x"),
            AgentStatus::Timeout,
            "timed out",
            10,
        );
        assert!(!result.is_success());
        assert_eq!(result.findings_count, 0);
        assert_eq!(result.subtask.hunter(), HunterType::General);
    }

    #[test]
    fn tool_result_message_carries_call_id() {
        let msg = ConversationMessage::tool_result("call_1", "search_web", &serde_json::json!({"ok": true}));
        assert_eq!(msg.role, MessageRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.content, r#"{"ok":true}"#);
    }
}
