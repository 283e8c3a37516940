//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the huntpack CLI.

use owo_colors::OwoColorize;
use serde_json::Value;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the huntpack banner
    pub fn banner(&self) {
        let lines = [
            r" _                 _                    _",
            r"| |__  _   _ _ __ | |_ _ __   __ _  ___| | __",
            r"| '_ \| | | | '_ \| __| '_ \ / _` |/ __| |/ /",
            r"| | | | |_| | | | | |_| |_) | (_| | (__|   <",
            r"|_| |_|\__,_|_| |_|\__| .__/ \__,_|\___|_|\_\",
            r"                      |_|",
        ];
        println!();
        for (i, line) in lines.iter().enumerate() {
            if !self.colored {
                println!("   {}", line);
            } else if i < 3 {
                println!("   {}", line.bright_cyan().bold());
            } else {
                println!("   {}", line.blue().bold());
            }
        }
        if self.colored {
            println!(
                "\n   {} {}\n",
                "Multi-agent research orchestration".bright_white().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!(
                "\n   Multi-agent research orchestration v{}\n",
                env!("CARGO_PKG_VERSION")
            );
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a file creation message
    pub fn created(&self, file_type: &str, path: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "✓".green().bold(),
                file_type.dimmed(),
                path.bright_white()
            );
        } else {
            println!("  [CREATED] {} {}", file_type, path);
        }
    }

    /// Print a file skipped message
    pub fn skipped(&self, path: &str, reason: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "○".yellow(),
                path.dimmed(),
                format!("({})", reason).yellow()
            );
        } else {
            println!("  [SKIPPED] {} ({})", path, reason);
        }
    }

    /// Print a directory creation message
    pub fn created_dir(&self, path: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "✓".green().bold(),
                "directory".dimmed(),
                path.bright_white()
            );
        } else {
            println!("  [CREATED] directory {}", path);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a subheader
    pub fn subheader(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.cyan().bold());
        } else {
            println!("\n  --- {} ---", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print a command suggestion
    pub fn command(&self, cmd: &str) {
        if self.colored {
            println!("     {}", format!("$ {}", cmd).bright_cyan());
        } else {
            println!("     $ {}", cmd);
        }
    }

    /// Print completion message with next steps
    pub fn complete(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "🚀".green(), message.bright_green().bold());
        } else {
            println!("\n  [DONE] {}", message);
        }
    }

    /// Print a table header row
    pub fn table_header(&self, columns: &[&str]) {
        if self.colored {
            let header: String = columns
                .iter()
                .map(|c| format!("{:<15}", c))
                .collect::<Vec<_>>()
                .join(" ");
            println!("    {}", header.bright_white().bold());
            println!("    {}", "─".repeat(columns.len() * 16).dimmed());
        } else {
            let header: String = columns
                .iter()
                .map(|c| format!("{:<15}", c))
                .collect::<Vec<_>>()
                .join(" ");
            println!("    {}", header);
            println!("    {}", "-".repeat(columns.len() * 16));
        }
    }

    /// Print a table row
    pub fn table_row(&self, values: &[&str]) {
        let row: String = values
            .iter()
            .map(|v| format!("{:<15}", v))
            .collect::<Vec<_>>()
            .join(" ");
        println!("    {}", row);
    }

    /// Print one research event envelope (`{type, data, session_id}`).
    pub fn event(&self, envelope: &Value) {
        let data = &envelope["data"];
        let text = |key: &str| data[key].as_str().unwrap_or_default().to_string();
        match envelope["type"].as_str().unwrap_or_default() {
            "orchestration_start" => {
                self.subheader(&format!("Researching: {}", text("query")));
                self.kv("session", &text("session_id"));
                self.kv("type", &text("research_type"));
            }
            "task_decomposed" => {
                if let Some(reason) = data["fallback_reason"].as_str() {
                    self.warning(&format!("Using fallback decomposition ({})", reason));
                }
                let hunters = data["hunter_types"].as_array().cloned().unwrap_or_default();
                let subtasks = data["subtasks"].as_array().cloned().unwrap_or_default();
                self.info(&format!("Decomposed into {} subtasks", subtasks.len()));
                for (i, subtask) in subtasks.iter().enumerate() {
                    let hunter = hunters
                        .get(i)
                        .and_then(Value::as_str)
                        .unwrap_or("general");
                    self.list_item(&format!(
                        "[{}] {}: {}",
                        i,
                        hunter,
                        subtask.as_str().unwrap_or_default()
                    ));
                }
            }
            "research_plan_created" => {
                self.info(&format!(
                    "Research plan created with {} todos",
                    data["total_todos"].as_u64().unwrap_or(0)
                ));
            }
            "agent_progress" => {
                let agent = data["agent_id"].as_u64().unwrap_or(0);
                let status = text("status");
                let line = format!("agent {} ({}) {}", agent, text("hunter_type"), status);
                if status == "COMPLETED" {
                    let secs = data["execution_time"].as_f64().unwrap_or(0.0);
                    self.success(&format!("{} in {:.1}s", line, secs));
                } else if status.starts_with("FAILED") {
                    self.error(&line);
                } else {
                    self.info(&line);
                }
            }
            "agent_step" => {
                if let Some(tool) = data["step_data"]["tool"].as_str() {
                    let agent = data["agent_id"].as_u64().unwrap_or(0);
                    if self.colored {
                        println!(
                            "      {} {}",
                            format!("agent {}", agent).dimmed(),
                            format!("{} {}", text("step_type"), tool).dimmed()
                        );
                    } else {
                        println!("      agent {} {} {}", agent, text("step_type"), tool);
                    }
                }
            }
            "synthesis_starting" => {
                self.info(&format!(
                    "Synthesizing {}/{} agent results",
                    data["successful_agents"].as_u64().unwrap_or(0),
                    data["total_agents"].as_u64().unwrap_or(0)
                ));
            }
            "orchestration_complete" => {
                let secs = data["total_time"].as_f64().unwrap_or(0.0);
                self.complete(&format!("Research complete in {:.1}s", secs));
            }
            "research_error" => self.error(&text("error")),
            other => self.info(other),
        }
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }
}
