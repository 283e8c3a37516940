//! Web search tool
//!
//! [`SearchTool`] exposes `search_web` to the model and delegates to a
//! [`SearchBackend`]. Backends never fail: network problems surface as an
//! empty result list or as documents with `extraction_success: false`.
//!
//! The default backend, [`DaedraBackend`], searches through the daedra crate
//! (DuckDuckGo) and optionally fetches each hit as markdown.

use crate::tools::registry::{Tool, SEARCH_TOOL};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Coarse authority label attached to each search document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authority {
    High,
    Medium,
    Low,
    Unknown,
}

impl Authority {
    /// Credibility score used when a document is recorded as a source.
    pub fn credibility(&self) -> f32 {
        match self {
            Authority::High => 0.9,
            Authority::Medium => 0.7,
            Authority::Low => 0.4,
            Authority::Unknown => 0.5,
        }
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub url: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub key_facts: Vec<String>,
    pub extraction_success: bool,
    #[serde(default)]
    pub word_count: usize,
    pub authority: Authority,
}

/// Search provider consumed by [`SearchTool`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: usize, deep_extract: bool)
        -> Vec<SearchDocument>;
}

/// `search_web` tool.
pub struct SearchTool {
    backend: Arc<dyn SearchBackend>,
    default_max_results: usize,
    default_deep_extract: bool,
}

impl SearchTool {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            default_max_results: 5,
            default_deep_extract: true,
        }
    }

    pub fn with_defaults(mut self, max_results: usize, deep_extract: bool) -> Self {
        self.default_max_results = max_results.max(1);
        self.default_deep_extract = deep_extract;
        self
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        SEARCH_TOOL
    }

    fn description(&self) -> &str {
        "Search the web and extract readable content from the top results"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return",
                    "default": self.default_max_results
                },
                "deep_extract": {
                    "type": "boolean",
                    "description": "Fetch and extract full page content for each result",
                    "default": self.default_deep_extract
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| AppError::InvalidInput("Missing 'query' parameter".to_string()))?;

        let max_results = args
            .get("max_results")
            .and_then(|v| v.as_u64())
            .map(|n| n.max(1) as usize)
            .unwrap_or(self.default_max_results);

        let deep_extract = args
            .get("deep_extract")
            .and_then(|v| v.as_bool())
            .unwrap_or(self.default_deep_extract);

        let documents = self.backend.search(query, max_results, deep_extract).await;
        tracing::debug!(query, results = documents.len(), "Search finished");

        serde_json::to_value(documents)
            .map_err(|e| AppError::ToolExecution(format!("Failed to encode results: {}", e)))
    }
}

/// DuckDuckGo search via daedra, with optional page extraction.
pub struct DaedraBackend {
    fetch_concurrency: usize,
}

impl DaedraBackend {
    pub fn new(fetch_concurrency: usize) -> Self {
        Self {
            fetch_concurrency: fetch_concurrency.max(1),
        }
    }

    async fn extract(hit: SearchDocument) -> SearchDocument {
        let fetch_args = daedra::VisitPageArgs {
            url: hit.url.clone(),
            include_images: false,
            selector: None,
        };

        match daedra::tools::fetch::fetch_page(&fetch_args).await {
            Ok(page) => {
                let content = json!(page.content).as_str().unwrap_or_default().to_string();
                let word_count = json!(page.word_count).as_u64().unwrap_or(0) as usize;
                SearchDocument {
                    key_facts: key_facts(&content),
                    content,
                    word_count,
                    extraction_success: true,
                    ..hit
                }
            }
            Err(e) => {
                tracing::debug!(url = %hit.url, error = %e, "Page extraction failed");
                hit
            }
        }
    }
}

impl Default for DaedraBackend {
    fn default() -> Self {
        Self::new(3)
    }
}

#[async_trait]
impl SearchBackend for DaedraBackend {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        deep_extract: bool,
    ) -> Vec<SearchDocument> {
        let search_args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: max_results,
                ..Default::default()
            }),
        };

        let hits: Vec<SearchDocument> = match daedra::tools::search::perform_search(&search_args).await {
            Ok(response) => response
                .data
                .iter()
                .take(max_results)
                .map(|r| {
                    let url = json!(r.url).as_str().unwrap_or_default().to_string();
                    SearchDocument {
                        authority: authority_for(&url),
                        title: json!(r.title).as_str().unwrap_or_default().to_string(),
                        content: json!(r.description).as_str().unwrap_or_default().to_string(),
                        url,
                        key_facts: Vec::new(),
                        extraction_success: false,
                        word_count: 0,
                    }
                })
                .collect(),
            Err(e) => {
                tracing::warn!(query, error = %e, "Search request failed");
                return Vec::new();
            }
        };

        if !deep_extract {
            return hits;
        }

        stream::iter(hits)
            .map(Self::extract)
            .buffered(self.fetch_concurrency)
            .collect()
            .await
    }
}

fn authority_for(url: &str) -> Authority {
    let host = reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase));
    match host {
        Some(h) if h.ends_with(".gov") || h.ends_with(".edu") || h.contains(".gov.") => {
            Authority::High
        }
        Some(h) if h.ends_with(".org") => Authority::Medium,
        Some(_) => Authority::Unknown,
        None => Authority::Low,
    }
}

/// Bullet lines from extracted markdown, at most five.
fn key_facts(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")))
        .filter(|line| line.len() > 20)
        .take(5)
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(url: &str) -> SearchDocument {
        SearchDocument {
            url: url.to_string(),
            title: "Hotel guide".to_string(),
            content: "Cheap stays".to_string(),
            key_facts: vec![],
            extraction_success: true,
            word_count: 2,
            authority: Authority::Unknown,
        }
    }

    #[tokio::test]
    async fn search_applies_defaults() {
        let mut backend = MockSearchBackend::new();
        backend
            .expect_search()
            .withf(|q, max, deep| q == "lisbon hotels" && *max == 5 && *deep)
            .times(1)
            .returning(|_, _, _| vec![document("https://example.com/a")]);

        let tool = SearchTool::new(Arc::new(backend));
        let result = tool.execute(json!({"query": "lisbon hotels"})).await.unwrap();
        assert_eq!(result[0]["url"], "https://example.com/a");
        assert_eq!(result[0]["authority"], "unknown");
    }

    #[tokio::test]
    async fn search_honours_explicit_arguments() {
        let mut backend = MockSearchBackend::new();
        backend
            .expect_search()
            .withf(|_, max, deep| *max == 2 && !*deep)
            .returning(|_, _, _| Vec::new());

        let tool = SearchTool::new(Arc::new(backend));
        let result = tool
            .execute(json!({"query": "x", "max_results": 2, "deep_extract": false}))
            .await
            .unwrap();
        assert_eq!(result, json!([]));
    }

    #[tokio::test]
    async fn test_search_missing_query() {
        let tool = SearchTool::new(Arc::new(MockSearchBackend::new()));
        let result = tool.execute(json!({})).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn schema_reports_configured_defaults() {
        let tool = SearchTool::new(Arc::new(MockSearchBackend::new())).with_defaults(8, false);
        let schema = tool.parameters_schema();
        assert_eq!(schema["properties"]["max_results"]["default"], 8);
        assert_eq!(schema["properties"]["deep_extract"]["default"], false);
        assert_eq!(schema["required"][0], "query");
    }

    #[test]
    fn authority_by_domain() {
        assert_eq!(authority_for("https://www.nasa.gov/x"), Authority::High);
        assert_eq!(authority_for("https://wikipedia.org/wiki"), Authority::Medium);
        assert_eq!(authority_for("https://blog.example.com"), Authority::Unknown);
        assert_eq!(authority_for("not a url"), Authority::Low);
    }

    #[test]
    fn key_facts_takes_long_bullets() {
        let content = "# Title\n- short\n- Lisbon hostels average 25 EUR per night\n* Alfama is the oldest district in town\nplain";
        let facts = key_facts(content);
        assert_eq!(facts.len(), 2);
        assert!(facts[0].starts_with("Lisbon hostels"));
    }
}
