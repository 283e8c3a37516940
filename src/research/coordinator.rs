//! Research orchestration
//!
//! The [`Orchestrator`] owns one research session from query to answer:
//!
//! ```text
//! Initializing -> Decomposing -> Planning -> Executing -> Synthesizing -> Completed
//!                      \             \            \              \
//!                       +-------------+------------+--------------+--> Failed
//! ```
//!
//! Execution depends on [`ExecutionMode`]:
//!
//! - `Standard`: every subtask goes to a plain agent, all in one batch.
//! - `Phased`: agents are grouped by hunter type and the groups run in
//!   hand-off order; a group starts only after the previous one resolved.
//!   `general` agents form a trailing group.
//! - `Parallel`: same team and shared plan as `Phased`, one batch.
//!
//! Every batch goes through the [`ParallelGroupExecutor`]; an agent that
//! fails, panics or times out is recorded and never aborts its siblings.

use crate::agents::hunter::{AgentContext, HunterAgent};
use crate::agents::runtime::RuntimeConfig;
use crate::db::sessions::{ResearchSession, SessionAgent, SessionPhase, SessionStore};
use crate::llm::LLMClient;
use crate::research::decomposer::{Decomposition, DeepDecomposition, FallbackFamily, TaskDecomposer};
use crate::research::events::{AgentProgressEvent, EventSink, ResearchEvent};
use crate::research::executor::{ExecutionBackend, ParallelGroupExecutor, UnitOutcome};
use crate::research::memory::{MemorySnapshot, ResearchMemory};
use crate::research::plan::{PlanProgress, ResearchPlan};
use crate::research::progress::{AgentProgress, ProgressTracker};
use crate::research::roles::{Complexity, HunterRoleSystem};
use crate::research::synthesis::{ResultSynthesizer, SynthesisMethod};
use crate::tools::registry::ToolRegistry;
use crate::types::{AgentRunResult, AgentStatus, AppError, HunterType, Result, Subtask};
use crate::utils::toml_config::HuntConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Plain agents, one batch.
    Standard,
    /// Hunter groups in hand-off order.
    #[default]
    #[serde(alias = "deep")]
    Phased,
    /// Hunter team, one batch.
    Parallel,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Standard => "standard",
            ExecutionMode::Phased => "phased",
            ExecutionMode::Parallel => "parallel",
        }
    }

    /// Uses the hunter team, shared memory and plan.
    pub fn is_deep(&self) -> bool {
        !matches!(self, ExecutionMode::Standard)
    }

    /// Executor backend used unless configuration overrides it.
    pub fn default_backend(&self) -> ExecutionBackend {
        match self {
            ExecutionMode::Standard => ExecutionBackend::Threads,
            ExecutionMode::Phased | ExecutionMode::Parallel => ExecutionBackend::Tasks,
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(ExecutionMode::Standard),
            "phased" | "deep" => Ok(ExecutionMode::Phased),
            "parallel" => Ok(ExecutionMode::Parallel),
            other => Err(AppError::InvalidInput(format!(
                "Unknown execution mode '{}', expected standard, phased or parallel",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub parallel_agents: usize,
    /// Bound for one batch (one phase in phased mode).
    pub task_timeout: Duration,
    /// Assign hunter types in the deep modes; when off, deep modes run
    /// `general` agents that still share memory.
    pub deep_research: bool,
    pub execution_mode: ExecutionMode,
    pub backend: Option<ExecutionBackend>,
    pub question_prompt: Option<String>,
    pub synthesis_prompt: Option<String>,
    pub system_prompt: String,
    /// Budget for standard agents.
    pub agent_runtime: RuntimeConfig,
    /// Budget for hunters.
    pub hunter_runtime: RuntimeConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            parallel_agents: 4,
            task_timeout: Duration::from_secs(300),
            deep_research: true,
            execution_mode: ExecutionMode::default(),
            backend: None,
            question_prompt: None,
            synthesis_prompt: None,
            system_prompt: crate::agents::hunter::DEFAULT_SYSTEM_PROMPT.to_string(),
            agent_runtime: RuntimeConfig::default(),
            hunter_runtime: RuntimeConfig::research(),
        }
    }
}

impl From<&HuntConfig> for OrchestratorConfig {
    fn from(config: &HuntConfig) -> Self {
        let tool_timeout = Duration::from_secs(config.agent.tool_timeout_secs);
        Self {
            parallel_agents: config.orchestrator.parallel_agents,
            task_timeout: Duration::from_secs(config.orchestrator.task_timeout_secs),
            deep_research: config.orchestrator.deep_research,
            execution_mode: config.orchestrator.execution_mode,
            backend: config.orchestrator.backend,
            question_prompt: config.orchestrator.question_generation_prompt.clone(),
            synthesis_prompt: config.orchestrator.synthesis_prompt.clone(),
            system_prompt: config.agent.system_prompt.clone(),
            agent_runtime: RuntimeConfig {
                max_iterations: config.agent.max_iterations,
                tool_timeout,
            },
            hunter_runtime: RuntimeConfig {
                max_iterations: config.agent.research_max_iterations,
                tool_timeout,
            },
        }
    }
}

/// One research run as requested by a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    #[serde(default)]
    pub mode: Option<ExecutionMode>,
    #[serde(default)]
    pub agents: Option<usize>,
    /// Generated when absent.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ResearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn agents(mut self, agents: usize) -> Self {
        self.agents = Some(agents);
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// How the subtasks were produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecompositionInfo {
    Generated,
    Fallback { family: FallbackFamily, reason: String },
}

impl From<&Decomposition> for DecompositionInfo {
    fn from(decomposition: &Decomposition) -> Self {
        match decomposition {
            Decomposition::Generated(_) => DecompositionInfo::Generated,
            Decomposition::Fallback { family, reason, .. } => DecompositionInfo::Fallback {
                family: *family,
                reason: reason.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchOutcome {
    pub session_id: String,
    pub query: String,
    pub mode: ExecutionMode,
    pub final_result: String,
    /// Sorted by agent id.
    pub agent_results: Vec<AgentRunResult>,
    pub subtasks: Vec<Subtask>,
    pub decomposition: DecompositionInfo,
    pub complexity: Option<Complexity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemorySnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanProgress>,
    pub synthesis: SynthesisMethod,
    pub total_time_ms: u64,
}

impl ResearchOutcome {
    pub fn successful_agents(&self) -> usize {
        self.agent_results.iter().filter(|r| r.is_success()).count()
    }
}

/// Shared state of one session's agents.
struct Team {
    ctx: AgentContext,
    tracker: Arc<ProgressTracker>,
}

pub struct Orchestrator {
    llm: Arc<dyn LLMClient>,
    tools: Arc<ToolRegistry>,
    roles: Arc<HunterRoleSystem>,
    sessions: Arc<dyn SessionStore>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        tools: Arc<ToolRegistry>,
        roles: Arc<HunterRoleSystem>,
        sessions: Arc<dyn SessionStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            llm,
            tools,
            roles,
            sessions,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Run one research session to completion.
    ///
    /// Agent, tool and synthesis failures are absorbed into the outcome. An
    /// error is returned only when the session cannot start or the
    /// decomposition call itself fails; a `research_error` event is sent first.
    #[tracing::instrument(skip(self, request, events), fields(query = %request.query))]
    pub async fn run(
        &self,
        request: ResearchRequest,
        events: Arc<dyn EventSink>,
    ) -> Result<ResearchOutcome> {
        let started = Instant::now();
        let query = request.query.trim().to_string();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Research query must not be empty".to_string()));
        }
        let mode = request.mode.unwrap_or(self.config.execution_mode);
        let num_agents = request.agents.unwrap_or(self.config.parallel_agents).max(1);
        let session_id = request
            .session_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut session = ResearchSession::new(&session_id, &query);
        if let Err(e) = self.sessions.create(session.clone()).await {
            events.send(ResearchEvent::ResearchError {
                error: e.to_string(),
            });
            return Err(e);
        }
        tracing::info!(%session_id, %mode, num_agents, "Research session started");

        events.send(ResearchEvent::OrchestrationStart {
            query: query.clone(),
            num_agents,
            research_type: if mode.is_deep() { "deep_research" } else { "standard" }.to_string(),
            session_id: session_id.clone(),
        });

        // Decomposing
        self.enter_phase(&mut session, SessionPhase::Decomposing).await;
        let deep = match self.decompose(&query, num_agents, mode).await {
            Ok(deep) => deep,
            Err(e) => {
                self.fail(&mut session, events.as_ref(), &e).await;
                return Err(e);
            }
        };
        let hunter_types = deep.hunter_types();
        let subtasks = deep.decomposition.subtasks().to_vec();
        events.send(ResearchEvent::TaskDecomposed {
            subtasks: subtasks.iter().map(|s| s.text.clone()).collect(),
            hunter_types: hunter_types.clone(),
            research_complexity: deep.complexity.map(|c| c.as_str().to_string()),
            deep_research: mode.is_deep(),
            fallback_reason: deep.decomposition.fallback_reason().map(String::from),
        });

        session.agents = subtasks
            .iter()
            .enumerate()
            .map(|(agent_id, subtask)| SessionAgent {
                agent_id,
                hunter_type: subtask.hunter(),
                subtask: subtask.text.clone(),
                status: AgentProgress::Queued.to_string(),
            })
            .collect();

        // Planning
        self.enter_phase(&mut session, SessionPhase::Planning).await;
        let (memory, plan) = if mode.is_deep() {
            let memory = Arc::new(ResearchMemory::new(&session_id, &query));
            let plan = Arc::new(ResearchPlan::generate(&query, &hunter_types));
            events.send(ResearchEvent::ResearchPlanCreated {
                total_todos: plan.progress().total,
                hunter_types: plan.hunter_types().to_vec(),
            });
            (Some(memory), Some(plan))
        } else {
            (None, None)
        };

        let team = Team {
            ctx: AgentContext {
                llm: self.llm.clone(),
                tools: self.tools.clone(),
                roles: self.roles.clone(),
                memory: memory.clone(),
                plan: plan.clone(),
                events: events.clone(),
                system_prompt: self.config.system_prompt.clone(),
                runtime: if mode.is_deep() {
                    self.config.hunter_runtime.clone()
                } else {
                    self.config.agent_runtime.clone()
                },
            },
            tracker: Arc::new(ProgressTracker::new(0..subtasks.len())),
        };

        // Executing
        self.enter_phase(&mut session, SessionPhase::Executing).await;
        let executor = ParallelGroupExecutor::new(
            self.config.backend.unwrap_or_else(|| mode.default_backend()),
            self.config.task_timeout,
        );
        let mut results: Vec<AgentRunResult> = Vec::with_capacity(subtasks.len());
        for (index, group) in execution_groups(&subtasks, mode).into_iter().enumerate() {
            tracing::info!(group = index, agents = group.len(), "Executing agent group");
            let batch = self
                .run_group(&executor, &team, &subtasks, &group, &mut session, events.as_ref())
                .await;
            results.extend(batch);
        }
        results.sort_by_key(|r| r.agent_id);

        // Synthesizing
        self.enter_phase(&mut session, SessionPhase::Synthesizing).await;
        let successful = results.iter().filter(|r| r.is_success()).count();
        events.send(ResearchEvent::SynthesisStarting {
            successful_agents: successful,
            total_agents: results.len(),
        });
        let context = memory
            .as_deref()
            .map(|memory| synthesis_context(&query, memory, plan.as_deref()));
        let synthesis = ResultSynthesizer::new(self.llm.clone())
            .with_template(self.config.synthesis_prompt.clone())
            .synthesize(&results, context.as_deref())
            .await;
        tracing::info!(method = ?synthesis.method, successful, total = results.len(), "Synthesis finished");

        // Completed
        let total_time = started.elapsed();
        session.final_result = Some(synthesis.text.clone());
        self.enter_phase(&mut session, SessionPhase::Completed).await;
        events.send(ResearchEvent::OrchestrationComplete {
            final_result: synthesis.text.clone(),
            agent_results: results.clone(),
            total_time: total_time.as_secs_f64(),
        });
        tracing::info!(%session_id, elapsed_ms = total_time.as_millis() as u64, "Research session completed");

        Ok(ResearchOutcome {
            session_id,
            query,
            mode,
            final_result: synthesis.text,
            agent_results: results,
            subtasks,
            decomposition: DecompositionInfo::from(&deep.decomposition),
            complexity: deep.complexity,
            memory: memory.map(|m| m.export_memory()),
            plan: plan.map(|p| p.progress()),
            synthesis: synthesis.method,
            total_time_ms: total_time.as_millis() as u64,
        })
    }

    async fn decompose(&self, query: &str, n: usize, mode: ExecutionMode) -> Result<DeepDecomposition> {
        let decomposer = TaskDecomposer::new(self.llm.clone(), self.roles.clone())
            .with_prompt_template(self.config.question_prompt.clone());
        if mode.is_deep() && self.config.deep_research {
            Ok(decomposer.decompose_deep(query, n))
        } else {
            decomposer.decompose_general(query, n).await
        }
    }

    /// Run the agents at `group` indices as one batch.
    async fn run_group(
        &self,
        executor: &ParallelGroupExecutor,
        team: &Team,
        subtasks: &[Subtask],
        group: &[usize],
        session: &mut ResearchSession,
        events: &dyn EventSink,
    ) -> Vec<AgentRunResult> {
        for &agent_id in group {
            session.set_agent_status(agent_id, AgentProgress::Processing.to_string());
        }
        self.save(session).await;

        let units: Vec<_> = group
            .iter()
            .map(|&agent_id| agent_unit(agent_id, subtasks[agent_id].clone(), team))
            .collect();
        let batch_start = Instant::now();
        let outcomes = executor.run(units).await;
        let batch_ms = batch_start.elapsed().as_millis() as u64;

        let mut results = Vec::with_capacity(group.len());
        for (&agent_id, outcome) in group.iter().zip(outcomes) {
            let subtask = subtasks[agent_id].clone();
            let result = match outcome {
                UnitOutcome::Completed(result) => result,
                UnitOutcome::Panicked(message) => {
                    tracing::error!(agent_id, error = %message, "Agent panicked");
                    AgentRunResult::failed(agent_id, subtask, AgentStatus::Error, message, batch_ms)
                }
                UnitOutcome::TimedOut => AgentRunResult::failed(
                    agent_id,
                    subtask,
                    AgentStatus::Timeout,
                    format!("Timed out after {}s", executor.timeout().as_secs()),
                    batch_ms,
                ),
            };

            let progress = if result.is_success() {
                AgentProgress::Completed
            } else {
                AgentProgress::Failed(result.response.clone())
            };
            team.tracker
                .update(agent_id, progress.clone(), Some(result.response.clone()));
            session.set_agent_status(agent_id, progress.to_string());
            events.send(ResearchEvent::AgentProgress(AgentProgressEvent {
                agent_id,
                status: progress.to_string(),
                progress: progress.percent(),
                subtask: result.subtask.text.clone(),
                hunter_type: result.subtask.hunter(),
                result: result.is_success().then(|| result.response.clone()),
                findings_count: Some(result.findings_count),
                execution_time: Some(result.execution_time_ms as f64 / 1000.0),
            }));
            results.push(result);
        }
        self.save(session).await;
        results
    }

    async fn enter_phase(&self, session: &mut ResearchSession, phase: SessionPhase) {
        tracing::debug!(session_id = %session.session_id, ?phase, "Session phase");
        session.set_phase(phase);
        self.save(session).await;
    }

    async fn fail(&self, session: &mut ResearchSession, events: &dyn EventSink, error: &AppError) {
        tracing::error!(session_id = %session.session_id, error = %error, "Research session failed");
        session.set_phase(SessionPhase::Failed);
        self.save(session).await;
        events.send(ResearchEvent::ResearchError {
            error: error.to_string(),
        });
    }

    /// Snapshot persistence never interrupts a run.
    async fn save(&self, session: &ResearchSession) {
        if let Err(e) = self.sessions.update(session.clone()).await {
            tracing::warn!(session_id = %session.session_id, error = %e, "Failed to persist session snapshot");
        }
    }
}

/// One agent run as an executor unit; errors become `Error` results.
fn agent_unit(
    agent_id: usize,
    subtask: Subtask,
    team: &Team,
) -> impl std::future::Future<Output = AgentRunResult> + Send + 'static {
    let ctx = team.ctx.clone();
    let tracker = team.tracker.clone();
    async move {
        let hunter_type = subtask.hunter();
        tracker.update(agent_id, AgentProgress::Processing, None);
        ctx.events.send(ResearchEvent::AgentProgress(AgentProgressEvent {
            agent_id,
            status: AgentProgress::Processing.to_string(),
            progress: AgentProgress::Processing.percent(),
            subtask: subtask.text.clone(),
            hunter_type,
            result: None,
            findings_count: None,
            execution_time: None,
        }));

        let start = Instant::now();
        let agent = HunterAgent::new(agent_id, hunter_type, ctx);
        let outcome = agent.run(&subtask.text).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(report) => {
                let findings = report.finding_ids.len();
                AgentRunResult::success(agent_id, subtask, report.response, elapsed_ms, findings)
            }
            Err(e) => {
                tracing::warn!(agent_id, error = %e, "Agent run failed");
                AgentRunResult::failed(agent_id, subtask, AgentStatus::Error, e.to_string(), elapsed_ms)
            }
        }
    }
}

/// Agent indices per batch, in execution order.
pub fn execution_groups(subtasks: &[Subtask], mode: ExecutionMode) -> Vec<Vec<usize>> {
    if mode != ExecutionMode::Phased {
        return vec![(0..subtasks.len()).collect()];
    }
    HunterType::SEQUENCE
        .iter()
        .chain(std::iter::once(&HunterType::General))
        .map(|hunter| {
            subtasks
                .iter()
                .enumerate()
                .filter(|(_, s)| s.hunter() == *hunter)
                .map(|(i, _)| i)
                .collect::<Vec<_>>()
        })
        .filter(|group| !group.is_empty())
        .collect()
}

/// Header handed to the synthesizer in the deep modes.
pub fn synthesis_context(query: &str, memory: &ResearchMemory, plan: Option<&ResearchPlan>) -> String {
    let mut context = format!(
        "DEEP RESEARCH SYNTHESIS\n\nOriginal Query: {}\nTotal Findings: {}\n\nHunter Contributions:\n",
        query,
        memory.finding_count()
    );
    let contributions = memory.contributions();
    if contributions.is_empty() {
        context.push_str("• none\n");
    }
    for (hunter, count) in &contributions {
        context.push_str(&format!("• {}: {} findings\n", hunter.title(), count));
    }
    context.push_str(&format!(
        "\nResearch Memory: {} findings, {} sources",
        memory.finding_count(),
        memory.source_count()
    ));
    if let Some(plan) = plan {
        context.push_str(&format!(
            "\nResearch Plan: {:.0}% complete",
            plan.progress().percentage
        ));
    }
    context
}
