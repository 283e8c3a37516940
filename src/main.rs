use anyhow::Context;
use huntpack::{
    api::routes::build_app,
    cli::{
        init::{self, InitConfig, InitResult},
        output::Output,
        Cli, Commands,
    },
    research::{roles::Complexity, ChannelSink},
    types::HunterType,
    utils::toml_config::{HuntConfig, LogFormat},
    AppState, ExecutionMode, HunterRoleSystem, HuntConfigManager, ResearchRequest,
};
use std::{path::Path, sync::Arc, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often expired sessions are purged while serving.
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Commands::Init {
            path,
            force,
            host,
            port,
            model,
        } => {
            let mut config = InitConfig::new(path);
            config.force = force;
            config.host = host;
            config.port = port;
            config.model = model;
            match init::run(config, &output) {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => anyhow::bail!(e),
            }
        }
        Commands::Roles => {
            print_roles(&HunterRoleSystem::new(), &output);
            Ok(())
        }
        Commands::Config { validate } => {
            let config = load_config(&cli.config, &output)?;
            if validate {
                output.success(&format!("{} is valid", cli.config.display()));
            } else {
                print_config(&config, &output);
            }
            Ok(())
        }
        Commands::Research {
            query,
            mode,
            agents,
            json,
        } => {
            let config = load_config(&cli.config, &output)?;
            let default_level = if cli.verbose { "debug" } else { "warn" };
            init_tracing(default_level, &config.server.log_format);
            let mode = mode
                .map(|m| m.parse::<ExecutionMode>())
                .transpose()
                .context("invalid --mode")?;
            run_research(config, query, mode, agents, json, &output).await
        }
        Commands::Serve => {
            let manager = HuntConfigManager::new(&cli.config)
                .with_context(|| format!("failed to load {}", cli.config.display()))?;
            let config = manager.config();
            let level = if cli.verbose {
                "debug".to_string()
            } else {
                config.server.log_level.clone()
            };
            init_tracing(&level, &config.server.log_format);
            serve(manager).await
        }
    }
}

fn init_tracing(default_level: &str, format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{},tower_http=info", default_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn load_config(path: &Path, output: &Output) -> anyhow::Result<HuntConfig> {
    match HuntConfig::load(path) {
        Ok(config) => Ok(config),
        Err(e) => {
            output.error(&e.to_string());
            output.hint("Run `huntpack init` to create a configuration file");
            Err(e.into())
        }
    }
}

async fn run_research(
    config: HuntConfig,
    query: String,
    mode: Option<ExecutionMode>,
    agents: Option<usize>,
    json: bool,
    output: &Output,
) -> anyhow::Result<()> {
    let state = AppState::from_config(Arc::new(HuntConfigManager::from_config(config)))?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let mut request = ResearchRequest::new(query).session_id(session_id.clone());
    if let Some(mode) = mode {
        request = request.mode(mode);
    }
    if let Some(agents) = agents {
        request = request.agents(agents);
    }

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let sink = Arc::new(ChannelSink::new(session_id, tx));
    let orchestrator = state.orchestrator();
    let run = tokio::spawn(async move { orchestrator.run(request, sink).await });

    // Timed-out agents may still hold the sink, so stop at the terminal event.
    while let Some(envelope) = rx.recv().await {
        if !json {
            output.event(&envelope);
        }
        if matches!(
            envelope["type"].as_str(),
            Some("orchestration_complete" | "research_error")
        ) {
            break;
        }
    }

    let outcome = run.await.context("research task panicked")??;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        output.header("Answer");
        output.newline();
        println!("{}", outcome.final_result);
        output.newline();
        output.kv(
            "agents",
            &format!(
                "{}/{} succeeded",
                outcome.successful_agents(),
                outcome.agent_results.len()
            ),
        );
        output.kv("synthesis", &format!("{:?}", outcome.synthesis));
    }
    Ok(())
}

async fn serve(manager: HuntConfigManager) -> anyhow::Result<()> {
    if let Err(e) = manager.start_watching() {
        tracing::warn!(error = %e, "Config hot reload disabled");
    }
    let manager = Arc::new(manager);
    let state = AppState::from_config(manager.clone())?;

    let sessions = state.sessions.clone();
    let cleanup_config = manager.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let retention = cleanup_config.config().session_retention();
            match sessions.cleanup_older_than(retention).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Expired sessions removed"),
                Err(e) => tracing::warn!(error = %e, "Session cleanup failed"),
            }
        }
    });

    let addr = manager.config().server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "huntpack server listening");

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.stop_watching();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

fn print_config(config: &HuntConfig, output: &Output) {
    output.header("Configuration");

    output.subheader("Server");
    output.kv("address", &config.server_addr());
    output.kv("log_level", &config.server.log_level);

    output.subheader("LLM");
    output.kv("base_url", &config.llm.base_url);
    output.kv("model", &config.llm.model);
    output.kv("temperature", &config.llm.temperature.to_string());

    output.subheader("Orchestrator");
    let orch = &config.orchestrator;
    output.kv("execution_mode", orch.execution_mode.as_str());
    output.kv("parallel_agents", &orch.parallel_agents.to_string());
    output.kv("task_timeout_secs", &orch.task_timeout_secs.to_string());
    output.kv("deep_research", &orch.deep_research.to_string());

    output.subheader("Agents");
    output.kv("max_iterations", &config.agent.max_iterations.to_string());
    output.kv(
        "research_max_iterations",
        &config.agent.research_max_iterations.to_string(),
    );

    output.subheader("Sessions");
    output.kv(
        "retention_hours",
        &config.sessions.retention_hours.to_string(),
    );
}

fn print_roles(roles: &HunterRoleSystem, output: &Output) {
    output.header("Hunters");
    for hunter in HunterType::SEQUENCE {
        if let Some(profile) = roles.profile(hunter) {
            output.subheader(profile.name);
            output.kv("type", hunter.as_str());
            output.kv("expertise", profile.expertise.as_str());
            output.kv("focus", profile.description);
            output.kv("tools", &profile.primary_tools.join(", "));
            for strategy in profile.search_strategies {
                output.list_item(strategy);
            }
        }
    }

    output.header("Teams");
    output.newline();
    output.table_header(&["Complexity", "Coverage", "Members"]);
    for complexity in [
        Complexity::Simple,
        Complexity::Standard,
        Complexity::Complex,
        Complexity::VerificationHeavy,
    ] {
        let team = roles.optimal_team(complexity);
        let coverage = roles.validate_team_coverage(&team);
        let members = team
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        output.table_row(&[
            complexity.as_str(),
            &format!("{:.0}%", coverage.coverage_score),
            &members,
        ]);
    }
}
