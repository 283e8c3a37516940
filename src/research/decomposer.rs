//! Query decomposition
//!
//! Turns one research query into `n` subtasks. The primary path asks the
//! model for a JSON array of questions; a malformed reply falls back to a
//! deterministic keyword-family template set. Network errors are not
//! recovered here and propagate to the caller.

use crate::llm::LLMClient;
use crate::research::roles::{Complexity, HunterRoleSystem};
use crate::types::{HunterType, Result, Subtask};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Question prompt used when no template is configured.
pub const DEFAULT_QUESTION_PROMPT: &str = r#"You are a research planner. Break the following request into {num_agents} distinct, non-overlapping research questions that together answer it completely.

Request: {user_input}

Each question must be specific and searchable on the web, and cover a different angle (facts, options, comparisons, recent developments, practical advice).

Respond with ONLY a JSON array of exactly {num_agents} strings and nothing else, like:
["question 1", "question 2"]"#;

/// Keyword family selected by the heuristic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackFamily {
    Fashion,
    Technical,
    Shopping,
    News,
    Business,
    Trends,
    General,
}

impl FallbackFamily {
    /// Checked in order; first match wins.
    pub fn classify(query: &str) -> Self {
        let lower = query.to_lowercase();
        let any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if any(&[
            "fashion", "style", "clothing", "jeans", "shirt", "dress", "shoes", "outfit", "wear",
            "wardrobe", "brand",
        ]) {
            FallbackFamily::Fashion
        } else if any(&["how to", "tutorial", "guide", "learn", "code", "programming"]) {
            FallbackFamily::Technical
        } else if any(&[
            "price", "buy", "cost", "cheap", "discount", "store", "purchase", "deals",
        ]) {
            FallbackFamily::Shopping
        } else if any(&["news", "breaking", "latest", "current", "today", "recent", "update"]) {
            FallbackFamily::News
        } else if any(&[
            "market analysis",
            "business strategy",
            "industry report",
            "market research",
            "competitive analysis",
        ]) {
            FallbackFamily::Business
        } else if any(&["trend", "analysis", "research", "study", "report"])
            && !any(&["fashion", "style", "clothing"])
        {
            FallbackFamily::Trends
        } else {
            FallbackFamily::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackFamily::Fashion => "fashion",
            FallbackFamily::Technical => "technical",
            FallbackFamily::Shopping => "shopping",
            FallbackFamily::News => "news",
            FallbackFamily::Business => "business",
            FallbackFamily::Trends => "trends",
            FallbackFamily::General => "general",
        }
    }

    /// The four fixed subtasks for this family.
    pub fn templates(&self, query: &str) -> [String; 4] {
        let q = query;
        match self {
            FallbackFamily::Fashion => [
                format!("Latest styles and popular options for: {q}"),
                format!("Best brands and where to buy: {q}"),
                format!("Styling tips and fashion advice for: {q}"),
                format!("Price ranges and seasonal considerations for: {q}"),
            ],
            FallbackFamily::Technical => [
                format!("Step-by-step guide and fundamentals: {q}"),
                format!("Advanced techniques and best practices for: {q}"),
                format!("Common problems and troubleshooting: {q}"),
                format!("Tools and resources for: {q}"),
            ],
            FallbackFamily::Shopping => [
                format!("Current prices and official sources for: {q}"),
                format!("Reviews and comparisons: {q}"),
                format!("Best deals and discounts for: {q}"),
                format!("Local availability and stores: {q}"),
            ],
            FallbackFamily::News => [
                format!("Latest breaking news about: {q}"),
                format!("Background context and history of: {q}"),
                format!("Expert analysis and opinions on: {q}"),
                format!("Public reaction and social media response to: {q}"),
            ],
            FallbackFamily::Business => [
                format!("Market analysis and current data about: {q}"),
                format!("Competitive landscape and key players in: {q}"),
                format!("Industry trends and future predictions for: {q}"),
                format!("Strategic recommendations and insights for: {q}"),
            ],
            FallbackFamily::Trends => [
                format!("Current data and statistics about: {q}"),
                format!("Expert analysis and opinions on: {q}"),
                format!("Case studies and real examples: {q}"),
                format!("Future predictions and trends: {q}"),
            ],
            FallbackFamily::General => [
                format!("Comprehensive overview and current information about: {q}"),
                format!("Expert perspectives and professional insights on: {q}"),
                format!("Practical examples and real-world applications: {q}"),
                format!("Latest developments and future outlook for: {q}"),
            ],
        }
    }

    /// Exactly `n` subtasks: truncated, or padded with numbered perspectives.
    pub fn subtasks(&self, query: &str, n: usize) -> Vec<Subtask> {
        let mut texts: Vec<String> = self.templates(query).into_iter().take(n).collect();
        for i in texts.len()..n {
            texts.push(format!("Additional perspective {} on: {}", i + 1, query));
        }
        texts.into_iter().map(Subtask::new).collect()
    }
}

impl fmt::Display for FallbackFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`TaskDecomposer::decompose`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decomposition {
    /// Model reply parsed and validated.
    Generated(Vec<Subtask>),
    /// Heuristic templates used instead.
    Fallback {
        subtasks: Vec<Subtask>,
        family: FallbackFamily,
        reason: String,
    },
}

impl Decomposition {
    pub fn subtasks(&self) -> &[Subtask] {
        match self {
            Decomposition::Generated(subtasks) => subtasks,
            Decomposition::Fallback { subtasks, .. } => subtasks,
        }
    }

    pub fn into_subtasks(self) -> Vec<Subtask> {
        match self {
            Decomposition::Generated(subtasks) => subtasks,
            Decomposition::Fallback { subtasks, .. } => subtasks,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Decomposition::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Decomposition::Generated(_) => None,
            Decomposition::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Hunter-annotated decomposition for the deep modes.
#[derive(Debug, Clone)]
pub struct DeepDecomposition {
    pub decomposition: Decomposition,
    /// `None` when deep research is disabled and every subtask is `general`.
    pub complexity: Option<Complexity>,
}

impl DeepDecomposition {
    pub fn hunter_types(&self) -> Vec<HunterType> {
        self.decomposition
            .subtasks()
            .iter()
            .map(Subtask::hunter)
            .collect()
    }
}

/// Keyword classification feeding the team-composition table.
pub fn assess_complexity(query: &str) -> Complexity {
    let lower = query.to_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if any(&[
        "comprehensive analysis",
        "market research",
        "detailed study",
        "business strategy",
        "in-depth",
        "thorough investigation",
    ]) {
        Complexity::Complex
    } else if any(&[
        "fact check", "verify", "validate", "confirm", "accuracy", "truth", "reliable", "credible",
    ]) {
        Complexity::VerificationHeavy
    } else if any(&[
        "quick overview",
        "simple question",
        "basic info",
        "what is",
        "define",
        "explain briefly",
    ]) {
        Complexity::Simple
    } else {
        Complexity::Standard
    }
}

pub struct TaskDecomposer {
    llm: Arc<dyn LLMClient>,
    roles: Arc<HunterRoleSystem>,
    prompt_template: String,
}

impl TaskDecomposer {
    pub fn new(llm: Arc<dyn LLMClient>, roles: Arc<HunterRoleSystem>) -> Self {
        Self {
            llm,
            roles,
            prompt_template: DEFAULT_QUESTION_PROMPT.to_string(),
        }
    }

    /// Override the question prompt; `{user_input}` and `{num_agents}` are substituted.
    pub fn with_prompt_template(mut self, template: Option<String>) -> Self {
        if let Some(template) = template.filter(|t| !t.trim().is_empty()) {
            self.prompt_template = template;
        }
        self
    }

    fn render_prompt(&self, query: &str, n: usize) -> String {
        self.prompt_template
            .replace("{user_input}", query)
            .replace("{num_agents}", &n.to_string())
    }

    /// Split `query` into exactly `n` subtasks.
    pub async fn decompose(&self, query: &str, n: usize) -> Result<Decomposition> {
        let n = n.max(1);
        let reply = self.llm.generate(&self.render_prompt(query, n)).await?;

        match parse_questions(&reply, n) {
            Ok(questions) => {
                tracing::info!(count = questions.len(), "Generated research subtasks");
                Ok(Decomposition::Generated(
                    questions.into_iter().map(Subtask::new).collect(),
                ))
            }
            Err(reason) => {
                let family = FallbackFamily::classify(query);
                tracing::warn!(%family, %reason, "Question generation failed, using fallback tasks");
                Ok(Decomposition::Fallback {
                    subtasks: family.subtasks(query, n),
                    family,
                    reason,
                })
            }
        }
    }

    /// One specialized subtask per hunter on the team, padded with `general`.
    ///
    /// Makes no model call.
    pub fn decompose_deep(&self, query: &str, n: usize) -> DeepDecomposition {
        let n = n.max(1);
        let complexity = assess_complexity(query);

        let mut subtasks: Vec<Subtask> = self
            .roles
            .optimal_team(complexity)
            .into_iter()
            .take(n)
            .map(|hunter| match self.roles.profile(hunter) {
                Some(profile) => {
                    Subtask::for_hunter(format!("{}: {}", profile.description, query), hunter)
                }
                None => Subtask::for_hunter(format!("Research and analyze: {}", query), hunter),
            })
            .collect();

        while subtasks.len() < n {
            subtasks.push(Subtask::for_hunter(
                format!("Additional research on: {}", query),
                HunterType::General,
            ));
        }

        tracing::info!(%complexity, agents = subtasks.len(), "Deep task decomposition completed");
        DeepDecomposition {
            decomposition: Decomposition::Generated(subtasks),
            complexity: Some(complexity),
        }
    }

    /// Standard decomposition with every subtask tagged `general`.
    pub async fn decompose_general(&self, query: &str, n: usize) -> Result<DeepDecomposition> {
        let tag = |subtasks: Vec<Subtask>| {
            subtasks
                .into_iter()
                .map(|s| Subtask::for_hunter(s.text, HunterType::General))
                .collect()
        };
        let decomposition = match self.decompose(query, n).await? {
            Decomposition::Generated(subtasks) => Decomposition::Generated(tag(subtasks)),
            Decomposition::Fallback {
                subtasks,
                family,
                reason,
            } => Decomposition::Fallback {
                subtasks: tag(subtasks),
                family,
                reason,
            },
        };
        Ok(DeepDecomposition {
            decomposition,
            complexity: None,
        })
    }
}

/// Parse a model reply as a JSON array of exactly `n` strings.
fn parse_questions(reply: &str, n: usize) -> std::result::Result<Vec<String>, String> {
    let cleaned = strip_fences(reply);
    let value: serde_json::Value =
        serde_json::from_str(cleaned).map_err(|e| format!("Invalid JSON: {}", e))?;

    let items = value
        .as_array()
        .ok_or_else(|| format!("Expected list, got {}", json_kind(&value)))?;
    if items.len() != n {
        return Err(format!("Expected {} questions, got {}", n, items.len()));
    }

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| format!("Expected non-empty string, got {}", json_kind(item)))
        })
        .collect()
}

fn strip_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LLMResponse;
    use crate::types::{AppError, ConversationMessage, ToolDefinition};
    use async_trait::async_trait;
    use rstest::rstest;

    struct Canned(std::result::Result<String, String>);

    #[async_trait]
    impl LLMClient for Canned {
        async fn chat(
            &self,
            _messages: &[ConversationMessage],
            _tools: &[ToolDefinition],
        ) -> Result<LLMResponse> {
            match &self.0 {
                Ok(text) => Ok(LLMResponse::text(text.clone())),
                Err(e) => Err(AppError::LLM(e.clone())),
            }
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn decomposer(reply: &str) -> TaskDecomposer {
        TaskDecomposer::new(
            Arc::new(Canned(Ok(reply.to_string()))),
            Arc::new(HunterRoleSystem::new()),
        )
    }

    #[tokio::test]
    async fn generated_path_accepts_fenced_json() {
        let d = decomposer("```json\n[\"a\", \"b\", \"c\"]\n```");
        let result = d.decompose("anything", 3).await.unwrap();
        assert!(!result.is_fallback());
        let texts: Vec<_> = result.subtasks().iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[rstest]
    #[case("not json at all", "Invalid JSON")]
    #[case("{\"q\": 1}", "Expected list")]
    #[case("[\"only one\"]", "Expected 4 questions, got 1")]
    #[case("[1, 2, 3, 4]", "Expected non-empty string")]
    #[tokio::test]
    async fn malformed_replies_fall_back(#[case] reply: &str, #[case] reason_prefix: &str) {
        let result = decomposer(reply)
            .decompose("best budget hotels in Lisbon", 4)
            .await
            .unwrap();
        let reason = result.fallback_reason().unwrap();
        assert!(reason.starts_with(reason_prefix), "{reason}");
        assert_eq!(result.subtasks().len(), 4);
    }

    #[tokio::test]
    async fn network_error_propagates() {
        let d = TaskDecomposer::new(
            Arc::new(Canned(Err("connection refused".into()))),
            Arc::new(HunterRoleSystem::new()),
        );
        assert!(matches!(d.decompose("q", 2).await, Err(AppError::LLM(_))));
    }

    #[tokio::test]
    async fn fallback_is_deterministic() {
        let d = decomposer("garbage");
        let first = d.decompose("best budget hotels in Lisbon", 4).await.unwrap();
        let second = d.decompose("best budget hotels in Lisbon", 4).await.unwrap();
        assert_eq!(first, second);
        match first {
            Decomposition::Fallback { family, subtasks, .. } => {
                assert_eq!(family, FallbackFamily::General);
                assert_eq!(
                    subtasks[0].text,
                    "Comprehensive overview and current information about: best budget hotels in Lisbon"
                );
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[rstest]
    #[case("summer dress ideas", FallbackFamily::Fashion)]
    #[case("how to write async rust", FallbackFamily::Technical)]
    #[case("cheap flights to Porto", FallbackFamily::Shopping)]
    #[case("latest on the election", FallbackFamily::News)]
    #[case("competitive analysis of EV makers", FallbackFamily::Business)]
    #[case("remote work trends", FallbackFamily::Trends)]
    #[case("fashion trend report", FallbackFamily::Fashion)]
    #[case("history of the Roman empire", FallbackFamily::General)]
    fn family_classification(#[case] query: &str, #[case] expected: FallbackFamily) {
        assert_eq!(FallbackFamily::classify(query), expected);
    }

    #[rstest]
    #[case(1)]
    #[case(4)]
    #[case(6)]
    fn fallback_always_yields_n(#[case] n: usize) {
        let subtasks = FallbackFamily::General.subtasks("mars colonies", n);
        assert_eq!(subtasks.len(), n);
        if n > 4 {
            assert_eq!(subtasks[4].text, "Additional perspective 5 on: mars colonies");
        }
    }

    #[rstest]
    #[case("in-depth look at solar panels", Complexity::Complex)]
    #[case("verify claims about vitamin C", Complexity::VerificationHeavy)]
    #[case("what is a mutex", Complexity::Simple)]
    #[case("best budget hotels in Lisbon", Complexity::Standard)]
    fn complexity_classification(#[case] query: &str, #[case] expected: Complexity) {
        assert_eq!(assess_complexity(query), expected);
    }

    #[test]
    fn deep_decomposition_assigns_hunters_and_pads() {
        let deep = decomposer("unused").decompose_deep("what is rust", 4);
        assert_eq!(deep.complexity, Some(Complexity::Simple));
        assert_eq!(
            deep.hunter_types(),
            vec![
                HunterType::SourceScout,
                HunterType::DeepAnalyst,
                HunterType::General,
                HunterType::General
            ]
        );
        let subtasks = deep.decomposition.subtasks();
        assert!(subtasks[0].text.starts_with("Specialized in rapid source discovery"));
        assert_eq!(subtasks[3].text, "Additional research on: what is rust");
    }

    #[test]
    fn deep_decomposition_truncates_team() {
        let deep = decomposer("unused").decompose_deep("best budget hotels in Lisbon", 2);
        assert_eq!(
            deep.hunter_types(),
            vec![HunterType::SourceScout, HunterType::DeepAnalyst]
        );
    }

    #[tokio::test]
    async fn custom_template_is_rendered() {
        let d = decomposer("[\"x\"]").with_prompt_template(Some("{num_agents}: {user_input}".into()));
        assert_eq!(d.render_prompt("tea", 1), "1: tea");
        assert!(!d.decompose("tea", 1).await.unwrap().is_fallback());
    }
}
