use crate::types::{AppError, Result, ToolDefinition};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Asynchronous tool capability.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, args: Value) -> Result<Value>;
}

/// Synchronous tool capability.
///
/// Registered through [`ToolRegistry::register_sync`], which wraps it in
/// [`Blocking`] so callers always see an awaitable [`Tool`].
pub trait SyncTool: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    fn call(&self, args: Value) -> Result<Value>;
}

/// Adapter running a [`SyncTool`] on the blocking thread pool.
pub struct Blocking<T>(Arc<T>);

impl<T: SyncTool> Blocking<T> {
    pub fn new(tool: T) -> Self {
        Self(Arc::new(tool))
    }
}

#[async_trait]
impl<T: SyncTool> Tool for Blocking<T> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    fn parameters_schema(&self) -> Value {
        self.0.parameters_schema()
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let tool = Arc::clone(&self.0);
        tokio::task::spawn_blocking(move || tool.call(args))
            .await
            .map_err(|e| AppError::ToolExecution(format!("blocking tool did not finish: {}", e)))?
    }
}

/// Result of dispatching one tool call. Never an error: failures are carried
/// as an `{"error": ...}` payload the model can read.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    /// Canonical tool name after alias resolution
    pub name: String,
    pub result: Value,
    pub success: bool,
}

/// Canonical name of the web search tool.
pub const SEARCH_TOOL: &str = "search_web";

/// Canonical name of the reserved completion tool.
pub const COMPLETE_TOOL: &str = "mark_task_complete";

const SEARCH_ALIASES: [&str; 9] = [
    "google",
    "bing",
    "duckduckgo",
    "web_search",
    "search",
    "websearch",
    "searchweb",
    "crawl",
    "crawl4ai",
];

const SEARCH_ARGUMENT_ALIASES: [(&str, &str); 8] = [
    ("q", "query"),
    ("maxResults", "max_results"),
    ("limit", "max_results"),
    ("num_results", "max_results"),
    ("topK", "max_results"),
    ("deepExtract", "deep_extract"),
    ("deep", "deep_extract"),
    ("search_query", "query"),
];

/// Name-keyed tool table with alias resolution.
///
/// Built once at startup and shared as `Arc<ToolRegistry>`; nothing mutates
/// it after construction.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    aliases: HashMap<String, String>,
    argument_aliases: HashMap<String, Vec<(String, String)>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            aliases: HashMap::new(),
            argument_aliases: HashMap::new(),
        }
    }

    /// Registry with the research tool set: web search over `backend` and
    /// the completion tool, plus the standard search aliases.
    pub fn with_research_tools(search: crate::tools::search::SearchTool) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(search));
        registry.register_sync(crate::tools::complete::MarkTaskComplete);
        registry.install_search_aliases();
        registry
    }

    /// Registry holding only the completion tool and the search aliases.
    pub fn with_completion_only() -> Self {
        let mut registry = Self::new();
        registry.register_sync(crate::tools::complete::MarkTaskComplete);
        registry.install_search_aliases();
        registry
    }

    fn install_search_aliases(&mut self) {
        for alias in SEARCH_ALIASES {
            self.alias(alias, SEARCH_TOOL);
        }
        for (alias, canonical) in SEARCH_ARGUMENT_ALIASES {
            self.argument_alias(SEARCH_TOOL, alias, canonical);
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn register_sync<T: SyncTool>(&mut self, tool: T) {
        self.register(Arc::new(Blocking::new(tool)));
    }

    /// Map `alias` (case-insensitive) onto `canonical`.
    pub fn alias(&mut self, alias: &str, canonical: &str) {
        self.aliases
            .insert(alias.to_lowercase(), canonical.to_string());
    }

    /// Rename argument key `alias` to `canonical` for calls to `tool`.
    pub fn argument_alias(&mut self, tool: &str, alias: &str, canonical: &str) {
        self.argument_aliases
            .entry(tool.to_string())
            .or_default()
            .push((alias.to_string(), canonical.to_string()));
    }

    /// Resolve a model-supplied tool name to its canonical identifier.
    pub fn canonical_name(&self, name: &str) -> String {
        let trimmed = name.trim();
        if self.tools.contains_key(trimmed) {
            return trimmed.to_string();
        }
        let lowered = trimmed.to_lowercase();
        self.aliases.get(&lowered).cloned().unwrap_or(lowered)
    }

    /// Look up a tool by name or alias.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>> {
        let canonical = self.canonical_name(name);
        self.tools
            .get(&canonical)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Unknown tool: {}", name)))
    }

    /// Rewrite aliased argument keys for `tool`. A key is only renamed when
    /// the canonical key is absent.
    pub fn normalize_arguments(&self, tool: &str, args: Value) -> Value {
        let Value::Object(mut map) = args else {
            return args;
        };

        if let Some(aliases) = self.argument_aliases.get(tool) {
            for (alias, canonical) in aliases {
                if map.contains_key(canonical) {
                    continue;
                }
                if let Some(value) = map.remove(alias) {
                    map.insert(canonical.clone(), value);
                }
            }
        }

        Value::Object(map)
    }

    /// Tool schemas sorted by name.
    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Execute a tool, propagating lookup and execution errors.
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value> {
        let tool = self.resolve(name)?;
        let args = self.normalize_arguments(tool.name(), args);
        tool.execute(args).await
    }

    /// Execute a tool and convert every failure into an error payload.
    pub async fn dispatch(&self, name: &str, args: Value) -> ToolOutcome {
        let canonical = self.canonical_name(name);
        let Some(tool) = self.tools.get(&canonical).cloned() else {
            tracing::warn!(tool = %name, "Unknown tool requested");
            return ToolOutcome {
                name: canonical,
                result: json!({ "error": format!("Unknown tool: {}", name) }),
                success: false,
            };
        };

        let args = self.normalize_arguments(&canonical, args);
        match tool.execute(args).await {
            Ok(result) => ToolOutcome {
                name: canonical,
                result,
                success: true,
            },
            Err(e) => {
                tracing::warn!(tool = %canonical, error = %e, "Tool execution failed");
                let message = match e {
                    AppError::ToolExecution(msg) => msg,
                    other => other.to_string(),
                };
                ToolOutcome {
                    name: canonical,
                    result: json!({ "error": format!("Tool execution failed: {}", message) }),
                    success: false,
                }
            }
        }
    }

    /// Get a sorted list of all registered tool names
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a tool is registered under this name or alias
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(&self.canonical_name(name))
    }
}
