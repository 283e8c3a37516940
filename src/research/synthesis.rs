//! Final answer synthesis
//!
//! Merges the successful agent responses into one answer with a single model
//! call. A failed call degrades to a labeled concatenation so no agent's
//! content is dropped.

use crate::llm::LLMClient;
use crate::types::AgentRunResult;
use serde::Serialize;
use std::sync::Arc;

/// Answer returned when no agent succeeded.
pub const ALL_AGENTS_FAILED: &str = "All agents failed to provide results. Please try again.";

/// How the final text was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SynthesisMethod {
    /// One successful response, returned unchanged.
    Passthrough,
    /// Merged by the model.
    Merged,
    /// Model call failed; responses concatenated.
    Concatenated { reason: String },
    /// No successful responses.
    NoResults,
}

#[derive(Debug, Clone, Serialize)]
pub struct Synthesis {
    pub text: String,
    #[serde(flatten)]
    pub method: SynthesisMethod,
}

pub struct ResultSynthesizer {
    llm: Arc<dyn LLMClient>,
    template: Option<String>,
}

impl ResultSynthesizer {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm, template: None }
    }

    /// Custom prompt with `{num_responses}` and `{agent_responses}` placeholders.
    pub fn with_template(mut self, template: Option<String>) -> Self {
        self.template = template.filter(|t| !t.trim().is_empty());
        self
    }

    /// Merge `results` into one answer.
    ///
    /// `context` is prepended to the prompt when a model call is made; it
    /// never counts as a response.
    pub async fn synthesize(&self, results: &[AgentRunResult], context: Option<&str>) -> Synthesis {
        let mut successful: Vec<&AgentRunResult> = results.iter().filter(|r| r.is_success()).collect();
        successful.sort_by_key(|r| r.agent_id);
        let responses: Vec<&str> = successful.iter().map(|r| r.response.as_str()).collect();

        match responses.len() {
            0 => {
                tracing::warn!(total = results.len(), "No successful agent results to synthesize");
                Synthesis {
                    text: ALL_AGENTS_FAILED.to_string(),
                    method: SynthesisMethod::NoResults,
                }
            }
            1 => Synthesis {
                text: responses[0].to_string(),
                method: SynthesisMethod::Passthrough,
            },
            _ => {
                let prompt = self.build_prompt(&responses, context);
                match self.llm.generate(&prompt).await {
                    Ok(text) if !text.trim().is_empty() => {
                        tracing::info!(responses = responses.len(), "Synthesis completed");
                        Synthesis {
                            text,
                            method: SynthesisMethod::Merged,
                        }
                    }
                    Ok(_) => self.concatenated(&responses, "synthesis returned empty text".to_string()),
                    Err(e) => {
                        tracing::error!(error = %e, "Synthesis failed, falling back to concatenated responses");
                        self.concatenated(&responses, e.to_string())
                    }
                }
            }
        }
    }

    fn concatenated(&self, responses: &[&str], reason: String) -> Synthesis {
        Synthesis {
            text: concatenate(responses),
            method: SynthesisMethod::Concatenated { reason },
        }
    }

    fn build_prompt(&self, responses: &[&str], context: Option<&str>) -> String {
        let sections: String = responses
            .iter()
            .enumerate()
            .map(|(i, r)| format!("=== AGENT {} RESPONSE ===\n{}\n\n", i + 1, r))
            .collect();

        let body = match &self.template {
            Some(template) => template
                .replace("{num_responses}", &responses.len().to_string())
                .replace("{agent_responses}", &sections),
            None => format!(
                "You have {} different research perspectives on the same query.\n\
                 Create ONE unified, comprehensive answer with excellent section formatting (markdown),\n\
                 clear bullet points, strict deduplication, and links consolidated in a Sources section.\n\n\
                 Rules:\n\
                 - Do NOT repeat information; merge duplicates.\n\
                 - Prefer the most recent information when sources conflict.\n\
                 - Provide actionable details (names, links, versions, pricing if present).\n\n\
                 Agent Research Results:\n{}\n\
                 Produce the final answer now.",
                responses.len(),
                sections
            ),
        };

        match context {
            Some(context) => format!("{}\n\n{}", context.trim(), body),
            None => body,
        }
    }
}

/// Labeled concatenation used when the merge call fails.
pub fn concatenate(responses: &[&str]) -> String {
    responses
        .iter()
        .enumerate()
        .flat_map(|(i, r)| [format!("=== Agent {} Response ===", i + 1), r.to_string(), String::new()])
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LLMResponse;
    use crate::types::{AgentStatus, AppError, ConversationMessage, Result, Subtask, ToolDefinition};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl LLMClient for Recorder {
        async fn chat(
            &self,
            messages: &[ConversationMessage],
            _tools: &[ToolDefinition],
        ) -> Result<LLMResponse> {
            self.prompts.lock().push(messages[0].content.clone());
            if self.fail {
                Err(AppError::LLM("boom".into()))
            } else {
                Ok(LLMResponse::text("merged answer"))
            }
        }

        fn model_name(&self) -> &str {
            "recorder"
        }
    }

    fn ok(id: usize, text: &str) -> AgentRunResult {
        AgentRunResult::success(id, Subtask::new("t"), text.to_string(), 10, 0)
    }

    fn err(id: usize) -> AgentRunResult {
        AgentRunResult::failed(id, Subtask::new("t"), AgentStatus::Error, "nope", 10)
    }

    #[tokio::test]
    async fn single_success_is_verbatim() {
        let llm = Arc::new(Recorder::default());
        let synth = ResultSynthesizer::new(llm.clone());
        let out = synth.synthesize(&[err(0), ok(1, "  exact text\n")], None).await;
        assert_eq!(out.text, "  exact text\n");
        assert_eq!(out.method, SynthesisMethod::Passthrough);
        assert!(llm.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn no_success_makes_no_call() {
        let llm = Arc::new(Recorder::default());
        let out = ResultSynthesizer::new(llm.clone())
            .synthesize(&[err(0), err(1)], None)
            .await;
        assert_eq!(out.text, ALL_AGENTS_FAILED);
        assert_eq!(out.method, SynthesisMethod::NoResults);
        assert!(llm.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn merge_orders_by_agent_id_and_adds_context() {
        let llm = Arc::new(Recorder::default());
        let out = ResultSynthesizer::new(llm.clone())
            .synthesize(&[ok(2, "second"), ok(0, "first")], Some("DEEP RESEARCH SYNTHESIS"))
            .await;
        assert_eq!(out.method, SynthesisMethod::Merged);
        let prompt = llm.prompts.lock()[0].clone();
        assert!(prompt.starts_with("DEEP RESEARCH SYNTHESIS"));
        assert!(prompt.contains("You have 2 different research perspectives"));
        let first = prompt.find("=== AGENT 1 RESPONSE ===\nfirst").unwrap();
        let second = prompt.find("=== AGENT 2 RESPONSE ===\nsecond").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn failure_concatenates_everything() {
        let llm = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let out = ResultSynthesizer::new(llm)
            .synthesize(&[ok(0, "a"), ok(1, "b"), ok(2, "c")], None)
            .await;
        assert_eq!(
            out.text,
            "=== Agent 1 Response ===\na\n\n=== Agent 2 Response ===\nb\n\n=== Agent 3 Response ===\nc\n"
        );
        assert!(matches!(out.method, SynthesisMethod::Concatenated { .. }));
    }

    #[tokio::test]
    async fn custom_template_is_used() {
        let llm = Arc::new(Recorder::default());
        ResultSynthesizer::new(llm.clone())
            .with_template(Some("merge {num_responses}:\n{agent_responses}".into()))
            .synthesize(&[ok(0, "a"), ok(1, "b")], None)
            .await;
        assert!(llm.prompts.lock()[0].starts_with("merge 2:\n=== AGENT 1 RESPONSE ===\na"));
    }
}
