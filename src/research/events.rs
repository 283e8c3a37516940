//! Progress events
//!
//! Every notable state transition of a research session is published as a
//! [`ResearchEvent`]. Event names and payload shapes are stable: UIs are
//! built against them.

use crate::types::{AgentRunResult, HunterType};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Serialize)]
pub struct AgentProgressEvent {
    pub agent_id: usize,
    pub status: String,
    pub progress: u8,
    pub subtask: String,
    pub hunter_type: HunterType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub findings_count: Option<usize>,
    /// Seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentStepEvent {
    pub agent_id: usize,
    pub step_type: String,
    pub step_data: Value,
    pub hunter_type: HunterType,
    pub progress: u8,
    pub timestamp: String,
}

impl AgentStepEvent {
    pub fn new(
        agent_id: usize,
        hunter_type: HunterType,
        step_type: impl Into<String>,
        step_data: Value,
        steps: usize,
    ) -> Self {
        Self {
            agent_id,
            step_type: step_type.into(),
            step_data,
            hunter_type,
            progress: step_progress(steps),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Progress shown for an agent after `steps` steps, capped below completion.
pub fn step_progress(steps: usize) -> u8 {
    (steps.saturating_mul(10)).min(95) as u8
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ResearchEvent {
    OrchestrationStart {
        query: String,
        num_agents: usize,
        research_type: String,
        session_id: String,
    },
    TaskDecomposed {
        subtasks: Vec<String>,
        hunter_types: Vec<HunterType>,
        research_complexity: Option<String>,
        deep_research: bool,
        fallback_reason: Option<String>,
    },
    ResearchPlanCreated {
        total_todos: usize,
        hunter_types: Vec<HunterType>,
    },
    AgentProgress(AgentProgressEvent),
    AgentStep(AgentStepEvent),
    SynthesisStarting {
        successful_agents: usize,
        total_agents: usize,
    },
    OrchestrationComplete {
        final_result: String,
        agent_results: Vec<AgentRunResult>,
        /// Seconds.
        total_time: f64,
    },
    ResearchError {
        error: String,
    },
}

impl ResearchEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ResearchEvent::OrchestrationStart { .. } => "orchestration_start",
            ResearchEvent::TaskDecomposed { .. } => "task_decomposed",
            ResearchEvent::ResearchPlanCreated { .. } => "research_plan_created",
            ResearchEvent::AgentProgress(_) => "agent_progress",
            ResearchEvent::AgentStep(_) => "agent_step",
            ResearchEvent::SynthesisStarting { .. } => "synthesis_starting",
            ResearchEvent::OrchestrationComplete { .. } => "orchestration_complete",
            ResearchEvent::ResearchError { .. } => "research_error",
        }
    }

    /// Last event of a session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResearchEvent::OrchestrationComplete { .. } | ResearchEvent::ResearchError { .. }
        )
    }

    pub fn payload(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove("data").unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    /// `{type, data, session_id}` wire envelope.
    pub fn envelope(&self, session_id: &str) -> Value {
        json!({
            "type": self.event_type(),
            "data": self.payload(),
            "session_id": session_id,
        })
    }
}

/// Push channel for research events. Sending never blocks or fails.
pub trait EventSink: Send + Sync {
    fn send(&self, event: ResearchEvent);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn send(&self, _event: ResearchEvent) {}
}

/// Logs events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn send(&self, event: ResearchEvent) {
        match &event {
            ResearchEvent::ResearchError { error } => tracing::error!(error = %error, "research_error"),
            ResearchEvent::AgentStep(step) => tracing::debug!(
                agent_id = step.agent_id,
                step_type = %step.step_type,
                "agent_step"
            ),
            other => tracing::info!(event = other.event_type(), payload = %other.payload(), "research event"),
        }
    }
}

/// Forwards envelopes over an unbounded channel; a closed receiver drops them.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    session_id: String,
    sender: UnboundedSender<Value>,
}

impl ChannelSink {
    pub fn new(session_id: impl Into<String>, sender: UnboundedSender<Value>) -> Self {
        Self {
            session_id: session_id.into(),
            sender,
        }
    }
}

impl EventSink for ChannelSink {
    fn send(&self, event: ResearchEvent) {
        if self.sender.send(event.envelope(&self.session_id)).is_err() {
            tracing::debug!(event = event.event_type(), "Event receiver closed");
        }
    }
}

/// Builds `step_data` for tool steps.
pub fn tool_step_data(tool: &str, arguments: &Value, extra: Option<(&str, Value)>) -> Value {
    let mut data = Map::new();
    data.insert("tool".to_string(), Value::String(tool.to_string()));
    data.insert("arguments".to_string(), arguments.clone());
    if let Some((key, value)) = extra {
        data.insert(key.to_string(), value);
    }
    Value::Object(data)
}
