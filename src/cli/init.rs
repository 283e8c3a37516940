//! Init command implementation
//!
//! Writes a default `huntpack.toml` plus `.env.example` and `.gitignore`.

use super::output::Output;
use crate::utils::toml_config::DEFAULT_CONFIG_FILE;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
pub enum InitResult {
    Success,
    /// huntpack.toml exists and `--force` was not given
    AlreadyExists,
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    pub host: String,
    pub port: u16,
    /// Ollama endpoint
    pub base_url: String,
    pub model: String,
}

impl InitConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            force: false,
            host: "127.0.0.1".to_string(),
            port: 3000,
            base_url: "http://localhost:11434".to_string(),
            model: "qwen2.5:7b".to_string(),
        }
    }
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing huntpack");

    let base_path = &config.path;
    if !base_path.exists() {
        if let Err(e) = fs::create_dir_all(base_path) {
            output.error(&format!("Failed to create {}: {}", base_path.display(), e));
            return InitResult::Error(e.to_string());
        }
        output.created_dir(&base_path.display().to_string());
    }

    let config_path = base_path.join(DEFAULT_CONFIG_FILE);
    if config_path.exists() && !config.force {
        output.warning(&format!("{} already exists!", DEFAULT_CONFIG_FILE));
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    output.subheader("Creating configuration files");

    if let Err(e) = write_file(&config_path, &generate_config_toml(&config), config.force) {
        output.error(&format!("Failed to create {}: {}", DEFAULT_CONFIG_FILE, e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", DEFAULT_CONFIG_FILE);

    let env_example_path = base_path.join(".env.example");
    if let Err(e) = write_file(&env_example_path, &generate_env_example(&config), config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("env", ".env.example");

    let gitignore_path = base_path.join(".gitignore");
    if gitignore_path.exists() {
        output.skipped(".gitignore", "already exists");
    } else if let Err(e) = write_file(&gitignore_path, GITIGNORE, false) {
        output.warning(&format!("Failed to create .gitignore: {}", e));
    } else {
        output.created("file", ".gitignore");
    }

    output.complete("huntpack initialized successfully!");

    output.header("Next Steps");
    output.newline();
    output.info("1. Start Ollama (if not running):");
    output.command("ollama serve");
    output.command(&format!("ollama pull {}", config.model));
    output.newline();
    output.info("2. Run a research session:");
    output.command("huntpack research \"best budget hotels in Lisbon\"");
    output.newline();
    output.info("3. Or start the server:");
    output.command("huntpack serve");

    output.hint(&format!(
        "Server will be available at http://{}:{}",
        config.host, config.port
    ));

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

/// Default configuration file contents.
pub fn generate_config_toml(config: &InitConfig) -> String {
    format!(
        r#"# huntpack configuration
# String values may reference environment variables as ${{VAR}} or $VAR.

[server]
host = "{host}"
port = {port}
log_level = "info"
# pretty | json
log_format = "pretty"

[llm]
base_url = "${{OLLAMA_BASE_URL}}"
model = "{model}"
temperature = 0.7
top_p = 0.9
request_timeout_secs = 300

[agent]
max_iterations = 10
research_max_iterations = 15
tool_timeout_secs = 60

[orchestrator]
parallel_agents = 4
task_timeout_secs = 300
aggregation_strategy = "consensus"
deep_research = true
# standard | phased | parallel
execution_mode = "phased"
# Uncomment to force the executor backend (tasks | threads)
# backend = "tasks"

[search]
max_results = 5
deep_extract = true
fetch_concurrency = 3

[sessions]
retention_hours = 24
"#,
        host = config.host,
        port = config.port,
        model = config.model,
    )
}

fn generate_env_example(config: &InitConfig) -> String {
    format!(
        r#"# huntpack environment variables
# Copy this file to .env and adjust.

# REQUIRED: Ollama endpoint referenced by huntpack.toml
OLLAMA_BASE_URL={}

# Optional: log filter, overrides server.log_level
RUST_LOG=info,huntpack=debug
"#,
        config.base_url
    )
}

const GITIGNORE: &str = r#"# Environment
.env
.env.local

# Rust
/target/

# OS
.DS_Store
"#;
