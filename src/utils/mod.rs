//! Configuration utilities.

/// TOML configuration, environment expansion and hot reload.
pub mod toml_config;

pub use toml_config::{ConfigError, HuntConfig, HuntConfigManager, LlmConfig, DEFAULT_CONFIG_FILE};
