//! Ollama chat client
//!
//! Talks to `POST {base_url}/api/chat` with `stream: false`. Tool-call
//! arguments are passed through untouched; depending on the model they
//! arrive as a JSON object or as a JSON-encoded string.

use crate::llm::client::{LLMClient, LLMResponse, ModelParams};
use crate::types::{AppError, ConversationMessage, MessageRole, Result, ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Ollama LLM client
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    params: ModelParams,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(
        base_url: String,
        model: String,
        params: ModelParams,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::LLM(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            params,
        })
    }

    fn request_body(&self, messages: &[ConversationMessage], tools: &[ToolDefinition]) -> Value {
        let messages: Vec<Value> = messages.iter().map(wire_message).collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": self.params.temperature,
                "top_p": self.params.top_p
            }
        });

        if !tools.is_empty() {
            let tools: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
        }

        body
    }
}

fn wire_message(msg: &ConversationMessage) -> Value {
    let role = match msg.role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    };

    let mut value = json!({
        "role": role,
        "content": msg.content
    });

    if !msg.tool_calls.is_empty() {
        let calls: Vec<Value> = msg
            .tool_calls
            .iter()
            .map(|tc| {
                json!({
                    "function": {
                        "name": tc.name,
                        "arguments": tc.arguments
                    }
                })
            })
            .collect();
        value["tool_calls"] = Value::Array(calls);
    }

    if let Some(ref name) = msg.name {
        value["name"] = Value::String(name.clone());
    }

    value
}

/// Parse a non-streaming `/api/chat` response body.
pub(crate) fn parse_chat_response(json: &Value) -> Result<LLMResponse> {
    let message = json
        .get("message")
        .ok_or_else(|| AppError::LLM("No message in Ollama response".into()))?;

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let mut tool_calls = Vec::new();
    let mut finish_reason = "stop".to_string();

    if let Some(calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for call in calls {
            let Some(func) = call.get("function") else {
                continue;
            };
            let name = func
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let arguments = func.get("arguments").cloned().unwrap_or_else(|| json!({}));
            let id = call
                .get("id")
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

            tool_calls.push(ToolCall {
                id,
                name,
                arguments,
            });
        }
        if !tool_calls.is_empty() {
            finish_reason = "tool_calls".to_string();
        }
    }

    if let Some(reason) = json.get("done_reason").and_then(|v| v.as_str()) {
        if tool_calls.is_empty() {
            finish_reason = reason.to_string();
        }
    }

    Ok(LLMResponse {
        content,
        tool_calls,
        finish_reason,
    })
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn chat(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.request_body(messages, tools);

        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "Sending Ollama chat request"
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLM(format!("Ollama request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLM(format!(
                "Ollama API error: {} - {}",
                status.as_u16(),
                text
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AppError::LLM(format!("Failed to parse Ollama response: {}", e)))?;

        parse_chat_response(&json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OllamaClient {
        OllamaClient::new(
            "http://localhost:11434/".to_string(),
            "qwen2.5:7b".to_string(),
            ModelParams::default(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        assert_eq!(client().base_url, "http://localhost:11434");
    }

    #[test]
    fn request_body_carries_options_and_tools() {
        let tools = vec![ToolDefinition {
            name: "search_web".into(),
            description: "Search".into(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let body = client().request_body(&[ConversationMessage::user("hi")], &tools);

        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["top_p"].as_f64().unwrap() as f32, 0.9);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "search_web");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn request_body_omits_empty_tools() {
        let body = client().request_body(&[ConversationMessage::user("hi")], &[]);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn assistant_tool_calls_are_serialized() {
        let msg = ConversationMessage::assistant(
            "",
            vec![ToolCall {
                id: "1".into(),
                name: "search_web".into(),
                arguments: json!({"query": "rust"}),
            }],
        );
        let wire = wire_message(&msg);
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"]["query"], "rust");
    }

    #[test]
    fn parses_content_and_tool_calls() {
        let raw = json!({
            "message": {
                "role": "assistant",
                "content": "Looking it up",
                "tool_calls": [
                    {"function": {"name": "search_web", "arguments": {"query": "lisbon"}}},
                    {"function": {"name": "mark_task_complete", "arguments": "{\"task_summary\":\"done\"}"}}
                ]
            },
            "done": true,
            "done_reason": "stop"
        });

        let response = parse_chat_response(&raw).unwrap();
        assert_eq!(response.content, "Looking it up");
        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.finish_reason, "tool_calls");
        assert!(response.tool_calls[1].arguments.is_string());
    }

    #[test]
    fn missing_message_is_an_llm_error() {
        let err = parse_chat_response(&json!({"done": true})).unwrap_err();
        assert!(matches!(err, AppError::LLM(_)));
    }
}
