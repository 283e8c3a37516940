//! CLI module for huntpack
//!
//! Provides command-line interface parsing for the `huntpack` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// huntpack - multi-agent research orchestration
///
/// Decomposes a research query into subtasks, runs web-searching agents on
/// them against a local Ollama endpoint and merges their answers.
#[derive(Parser, Debug)]
#[command(
    name = "huntpack",
    version,
    about = "huntpack - multi-agent research orchestration",
    long_about = "Decomposes a research query into subtasks, runs web-searching agents on them\n\
                  against a local Ollama endpoint and synthesizes one answer.\n\n\
                  Use 'research' for a one-off session or 'serve' for the HTTP/WebSocket API.",
    after_help = "EXAMPLES:\n    \
                  huntpack init                                  # Write huntpack.toml and .env.example\n    \
                  huntpack research \"budget hotels in Lisbon\"    # Phased deep research\n    \
                  huntpack research -m standard -n 3 \"query\"     # Three general agents\n    \
                  huntpack serve                                 # Start the API server\n    \
                  huntpack --config my.toml serve                # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "huntpack.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one research session and print its progress and answer
    Research {
        /// The research query
        query: String,

        /// Execution mode: standard, phased or parallel
        #[arg(short, long)]
        mode: Option<String>,

        /// Number of agents (defaults to orchestrator.parallel_agents)
        #[arg(short = 'n', long)]
        agents: Option<usize>,

        /// Print the full outcome as JSON instead of progress lines
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP and WebSocket server
    Serve,

    /// Initialize a huntpack project with configuration files
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "3000")]
        port: u16,

        /// Ollama model to configure
        #[arg(long, default_value = "qwen2.5:7b")]
        model: String,
    },

    /// Show configuration information
    Config {
        /// Only validate the configuration file
        #[arg(long)]
        validate: bool,
    },

    /// List hunter profiles and team compositions
    Roles,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
