//! TOML-based configuration for huntpack
//!
//! Settings for the LLM endpoint, agents, orchestration, search and sessions
//! are read from a TOML file (`huntpack.toml`). String values may reference
//! environment variables as `${VAR}` or `$VAR`; unknown variables are left
//! as written.
//!
//! # Hot Reloading
//!
//! In server mode `HuntConfigManager` watches the file and swaps in the new
//! configuration. Sessions already running keep the settings they started with.

use crate::research::coordinator::ExecutionMode;
use crate::research::executor::ExecutionBackend;
use arc_swap::ArcSwap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "huntpack.toml";

static ENV_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("valid env placeholder pattern")
});

/// Root configuration structure loaded from huntpack.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuntConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Chat endpoint; required
    pub llm: LlmConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub orchestrator: OrchestratorSettings,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub sessions: SessionConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// e.g. `http://localhost:11434`
    pub base_url: String,

    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_request_timeout() -> u64 {
    300
}

impl LlmConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// ============= Agent Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Budget for standard-mode agents
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Budget for hunters in the deep modes
    #[serde(default = "default_research_max_iterations")]
    pub research_max_iterations: usize,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
}

fn default_max_iterations() -> usize {
    10
}

fn default_research_max_iterations() -> usize {
    15
}

fn default_system_prompt() -> String {
    crate::agents::hunter::DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_tool_timeout() -> u64 {
    60
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            research_max_iterations: default_research_max_iterations(),
            system_prompt: default_system_prompt(),
            tool_timeout_secs: default_tool_timeout(),
        }
    }
}

// ============= Orchestrator Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    #[serde(default = "default_parallel_agents")]
    pub parallel_agents: usize,

    /// Per batch
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,

    #[serde(default = "default_aggregation_strategy")]
    pub aggregation_strategy: String,

    /// Placeholders: `{user_input}`, `{num_agents}`
    #[serde(default)]
    pub question_generation_prompt: Option<String>,

    /// Placeholders: `{num_responses}`, `{agent_responses}`
    #[serde(default)]
    pub synthesis_prompt: Option<String>,

    #[serde(default = "default_true")]
    pub deep_research: bool,

    #[serde(default)]
    pub execution_mode: ExecutionMode,

    /// Overrides the backend implied by the execution mode
    #[serde(default)]
    pub backend: Option<ExecutionBackend>,
}

fn default_parallel_agents() -> usize {
    4
}

fn default_task_timeout() -> u64 {
    300
}

fn default_aggregation_strategy() -> String {
    "consensus".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            parallel_agents: default_parallel_agents(),
            task_timeout_secs: default_task_timeout(),
            aggregation_strategy: default_aggregation_strategy(),
            question_generation_prompt: None,
            synthesis_prompt: None,
            deep_research: true,
            execution_mode: ExecutionMode::default(),
            backend: None,
        }
    }
}

// ============= Search Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_true")]
    pub deep_extract: bool,

    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
}

fn default_max_results() -> usize {
    5
}

fn default_fetch_concurrency() -> usize {
    3
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            deep_extract: true,
            fetch_concurrency: default_fetch_concurrency(),
        }
    }
}

// ============= Session Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
}

fn default_retention_hours() -> u64 {
    24
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retention_hours: default_retention_hours(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),
}

impl HuntConfig {
    /// Defaults everywhere except the required `[llm]` section.
    pub fn with_llm(llm: LlmConfig) -> Self {
        Self {
            server: ServerConfig::default(),
            llm,
            agent: AgentConfig::default(),
            orchestrator: OrchestratorSettings::default(),
            search: SearchConfig::default(),
            sessions: SessionConfig::default(),
        }
    }

    /// Load, expand and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML text, expand environment placeholders and validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut raw: toml::Value = toml::from_str(content)?;
        expand_env_values(&mut raw);
        let config: HuntConfig = raw.try_into()?;

        config.validate()?;
        Ok(config)
    }

    /// Check required keys and value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [("llm.base_url", &self.llm.base_url), ("llm.model", &self.llm.model)] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!("{} must not be empty", key)));
            }
            if let Some(var) = unresolved_placeholder(value) {
                return Err(ConfigError::MissingEnvVar(var));
            }
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "llm.temperature must be between 0 and 2, got {}",
                self.llm.temperature
            )));
        }
        if self.orchestrator.parallel_agents < 1 {
            return Err(ConfigError::ValidationError(
                "orchestrator.parallel_agents must be at least 1".to_string(),
            ));
        }
        if self.orchestrator.task_timeout_secs < 1 {
            return Err(ConfigError::ValidationError(
                "orchestrator.task_timeout_secs must be at least 1".to_string(),
            ));
        }
        // Synthesis is the only merge strategy.
        if self.orchestrator.aggregation_strategy != "consensus" {
            return Err(ConfigError::ValidationError(format!(
                "orchestrator.aggregation_strategy '{}' is not supported (expected \"consensus\")",
                self.orchestrator.aggregation_strategy
            )));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn session_retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.sessions.retention_hours as i64)
    }
}

/// Replace `${VAR}` and `$VAR` with environment values; unknown names stay.
pub fn expand_env(input: &str) -> String {
    ENV_PATTERN
        .replace_all(input, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

fn expand_env_values(value: &mut toml::Value) {
    match value {
        toml::Value::String(s) => *s = expand_env(s),
        toml::Value::Array(items) => items.iter_mut().for_each(expand_env_values),
        toml::Value::Table(table) => table.iter_mut().for_each(|(_, v)| expand_env_values(v)),
        _ => {}
    }
}

fn unresolved_placeholder(value: &str) -> Option<String> {
    ENV_PATTERN.captures(value).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    })
}

// ============= Hot Reloading Configuration Manager =============

/// Thread-safe configuration manager with hot reloading support
pub struct HuntConfigManager {
    config: Arc<ArcSwap<HuntConfig>>,
    config_path: PathBuf,
    watcher: RwLock<Option<RecommendedWatcher>>,
}

impl HuntConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        // Absolute path for reliable file watching
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(ConfigError::ReadError)?
                .join(path)
        };

        let config = HuntConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
            watcher: RwLock::new(None),
        })
    }

    /// Manager without a backing file; reload and watching are unavailable.
    pub fn from_config(config: HuntConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            watcher: RwLock::new(None),
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<HuntConfig> {
        self.config.load_full()
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Manually reload the configuration from disk
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!(path = ?self.config_path, "Reloading configuration");

        let new_config = HuntConfig::load(&self.config_path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Start watching for configuration file changes
    pub fn start_watching(&self) -> Result<(), ConfigError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let config_path = self.config_path.clone();
        let config_arc = Arc::clone(&self.config);
        let file_name = self.config_path.file_name().map(|n| n.to_os_string());

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let touches_config = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_config && (event.kind.is_modify() || event.kind.is_create()) {
                        // Debounced in the receiver
                        let _ = tx.send(());
                    }
                }
                Err(e) => {
                    error!(error = ?e, "Config watcher error");
                }
            }
        })?;

        // Editors replace files, so watch the parent directory
        if let Some(parent) = self.config_path.parent() {
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }

        *self.watcher.write() = Some(watcher);

        tokio::spawn(async move {
            let mut last_reload: Option<std::time::Instant> = None;
            let debounce_duration = Duration::from_millis(500);

            while rx.recv().await.is_some() {
                if last_reload.is_some_and(|t| t.elapsed() < debounce_duration) {
                    continue;
                }

                // Let the write finish
                tokio::time::sleep(Duration::from_millis(100)).await;

                match HuntConfig::load(&config_path) {
                    Ok(new_config) => {
                        config_arc.store(Arc::new(new_config));
                        info!("Configuration hot-reloaded successfully");
                        last_reload = Some(std::time::Instant::now());
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to hot-reload config, keeping previous config");
                    }
                }
            }
        });

        info!(path = ?self.config_path, "Configuration hot-reload watcher started");
        Ok(())
    }

    /// Stop watching for configuration changes
    pub fn stop_watching(&self) {
        *self.watcher.write() = None;
        info!("Configuration hot-reload watcher stopped");
    }
}

impl Clone for HuntConfigManager {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            config_path: self.config_path.clone(),
            watcher: RwLock::new(None), // Watcher is not cloned
        }
    }
}
