//! Hunter agents
//!
//! A [`HunterAgent`] wraps one [`AgentRuntime`] run with the collaboration
//! steps around it: claim todos from the shared plan, build a specialized
//! prompt from the role profile and the team's memory, run, extract findings
//! from the answer, post them to memory and complete the todos.
//!
//! `general` agents skip the role profile; without memory or plan they are
//! plain research agents.

use crate::agents::runtime::{AgentRuntime, RuntimeConfig, RuntimeOutcome, StepObserver, ToolCallRecord};
use crate::llm::LLMClient;
use crate::research::events::{AgentStepEvent, EventSink, ResearchEvent};
use crate::research::memory::{FindingType, NewFinding, NewSource, ResearchMemory, VerificationStatus};
use crate::research::plan::{PlanningHandle, ResearchPlan, ResearchTodo};
use crate::research::roles::HunterRoleSystem;
use crate::tools::registry::{ToolRegistry, SEARCH_TOOL};
use crate::tools::search::SearchDocument;
use crate::types::{HunterType, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// System prompt for agents without a role profile.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a thorough research assistant. Use the search_web tool to find current, \
credible information, cite the URLs you rely on, and write a well-structured answer. \
When your answer is complete, call mark_task_complete.";

/// Everything an agent shares with the rest of its session.
#[derive(Clone)]
pub struct AgentContext {
    pub llm: Arc<dyn LLMClient>,
    pub tools: Arc<ToolRegistry>,
    pub roles: Arc<HunterRoleSystem>,
    pub memory: Option<Arc<ResearchMemory>>,
    pub plan: Option<Arc<ResearchPlan>>,
    pub events: Arc<dyn EventSink>,
    pub system_prompt: String,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollaborationSummary {
    pub hunter_type: HunterType,
    pub findings_contributed: usize,
    pub specialization_focus: String,
    pub collaboration_notes: Vec<String>,
    pub next_steps: Vec<String>,
    pub team_handoffs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HunterReport {
    pub hunter_id: String,
    pub hunter_type: HunterType,
    pub response: String,
    pub finding_ids: Vec<String>,
    pub source_ids: Vec<String>,
    pub todos_completed: Vec<String>,
    pub quality_score: f32,
    pub collaboration: CollaborationSummary,
    pub outcome: RuntimeOutcome,
}

pub struct HunterAgent {
    agent_id: usize,
    hunter_type: HunterType,
    ctx: AgentContext,
}

impl HunterAgent {
    pub fn new(agent_id: usize, hunter_type: HunterType, ctx: AgentContext) -> Self {
        Self {
            agent_id,
            hunter_type,
            ctx,
        }
    }

    pub fn agent_id(&self) -> usize {
        self.agent_id
    }

    pub fn hunter_type(&self) -> HunterType {
        self.hunter_type
    }

    /// `{hunter_type}_{agent_id}`
    pub fn hunter_id(&self) -> String {
        format!("{}_{}", self.hunter_type, self.agent_id)
    }

    #[tracing::instrument(skip(self, subtask), fields(agent_id = self.agent_id, hunter = %self.hunter_type))]
    pub async fn run(&self, subtask: &str) -> Result<HunterReport> {
        let hunter_id = self.hunter_id();
        let observer = Arc::new(HunterSteps {
            agent_id: self.agent_id,
            hunter_type: self.hunter_type,
            events: self.ctx.events.clone(),
            steps: AtomicUsize::new(0),
        });

        let planning = self
            .ctx
            .plan
            .as_ref()
            .map(|plan| PlanningHandle::new(plan.clone(), self.hunter_type));
        // Claims every ready todo for this hunter type, not just the next one,
        // so a team with one hunter per type still drains its whole template.
        let todos: Vec<ResearchTodo> = planning
            .as_ref()
            .map(PlanningHandle::claim_available)
            .unwrap_or_default();
        for todo in &todos {
            observer.on_step(
                "todo_started",
                json!({ "todo_id": todo.id, "description": todo.description }),
            );
        }
        if planning.is_some() && todos.is_empty() {
            tracing::debug!("No available todos for hunter");
        }

        let system_prompt = self.specialized_prompt(subtask, todos.first())?;
        let user_input = if self.is_specialized() {
            format!("Execute your specialized research for: {}", subtask)
        } else {
            subtask.to_string()
        };

        let runtime = AgentRuntime::new(self.ctx.llm.clone(), self.ctx.tools.clone(), self.ctx.runtime.clone())
            .with_observer(observer.clone());
        let outcome = runtime.run(&system_prompt, &user_input).await?;

        let mut finding_ids = Vec::new();
        let mut source_ids = Vec::new();
        let findings = extract_findings(self.hunter_type, &hunter_id, &outcome.content);
        let quality_score = quality_score(&findings);

        if let Some(memory) = &self.ctx.memory {
            source_ids = register_sources(memory, &hunter_id, self.hunter_type, &outcome.tool_calls);
            if self.hunter_type == HunterType::FactChecker {
                apply_verification(memory, &hunter_id, &outcome.content);
            }
            finding_ids = findings
                .into_iter()
                .map(|finding| memory.add_finding(finding))
                .collect();
        }

        let mut todos_completed = Vec::new();
        if let Some(planning) = &planning {
            for todo in &todos {
                let elapsed = (Utc::now() - todo.created_at).num_milliseconds() as f64 / 1000.0;
                let mut results = Map::new();
                results.insert("findings_count".into(), json!(finding_ids.len()));
                results.insert("execution_time".into(), json!(elapsed));
                results.insert("quality_score".into(), json!(quality_score));
                if planning.complete(&todo.id, results) {
                    observer.on_step(
                        "todo_completed",
                        json!({ "todo_id": todo.id, "findings_count": finding_ids.len() }),
                    );
                    todos_completed.push(todo.id.clone());
                }
            }
        }

        tracing::info!(
            findings = finding_ids.len(),
            sources = source_ids.len(),
            todos = todos_completed.len(),
            iterations = outcome.iterations,
            "Hunter finished"
        );

        Ok(HunterReport {
            collaboration: self.collaboration_summary(finding_ids.len()),
            hunter_id,
            hunter_type: self.hunter_type,
            response: outcome.content.clone(),
            finding_ids,
            source_ids,
            todos_completed,
            quality_score,
            outcome,
        })
    }

    fn is_specialized(&self) -> bool {
        self.ctx.roles.profile(self.hunter_type).is_some()
    }

    fn specialized_prompt(&self, subtask: &str, todo: Option<&ResearchTodo>) -> Result<String> {
        let mut prompt = if self.is_specialized() {
            self.ctx.roles.generate_system_prompt(self.hunter_type, subtask)?
        } else {
            self.ctx.system_prompt.clone()
        };

        if let Some(memory) = &self.ctx.memory {
            let context = memory.generate_research_context(self.hunter_type);
            if !context.is_empty() {
                prompt.push_str("\n\nTEAM RESEARCH CONTEXT:\n");
                prompt.push_str(&context);
            }
        }

        if let Some(todo) = todo {
            prompt.push_str(&format!(
                "\n\nCURRENT TODO:\n{}\nPriority: {}/5\nEstimated time: {} minutes",
                todo.description, todo.priority, todo.estimated_minutes
            ));
        }

        if self.ctx.memory.is_some() || self.is_specialized() {
            prompt.push_str(&collaboration_instructions(self.hunter_type));
        }
        Ok(prompt)
    }

    fn collaboration_summary(&self, findings: usize) -> CollaborationSummary {
        let mut summary = CollaborationSummary {
            hunter_type: self.hunter_type,
            findings_contributed: findings,
            specialization_focus: self
                .ctx
                .roles
                .profile(self.hunter_type)
                .map(|p| p.expertise.as_str().to_string())
                .unwrap_or_else(|| "general".to_string()),
            collaboration_notes: Vec::new(),
            next_steps: Vec::new(),
            team_handoffs: Vec::new(),
        };
        let (note, follow_up) = match self.hunter_type {
            HunterType::SourceScout => (
                "Source map created for team analysis",
                Some("High-quality sources ready for deep analyst"),
            ),
            HunterType::DeepAnalyst => (
                "Detailed content analysis completed",
                Some("Claims and facts ready for verification"),
            ),
            HunterType::FactChecker => (
                "Verification and cross-referencing completed",
                Some("Validated findings ready for synthesis"),
            ),
            HunterType::InsightSynthesizer => {
                summary
                    .next_steps
                    .push("Research deliverable ready for presentation".to_string());
                ("Final synthesis and insights generated", None)
            }
            HunterType::General => return summary,
        };
        summary.collaboration_notes.push(note.to_string());
        if let Some(handoff) = follow_up {
            summary.team_handoffs.push(handoff.to_string());
        }
        summary
    }
}

/// Emits `agent_step` events and counts steps for progress.
struct HunterSteps {
    agent_id: usize,
    hunter_type: HunterType,
    events: Arc<dyn EventSink>,
    steps: AtomicUsize,
}

impl StepObserver for HunterSteps {
    fn on_step(&self, step_type: &str, data: Value) {
        let steps = self.steps.fetch_add(1, Ordering::Relaxed) + 1;
        self.events.send(ResearchEvent::AgentStep(AgentStepEvent::new(
            self.agent_id,
            self.hunter_type,
            step_type,
            data,
            steps,
        )));
    }
}

/// Appended to every hunter's system prompt.
pub fn collaboration_instructions(hunter_type: HunterType) -> String {
    let focus = match hunter_type {
        HunterType::SourceScout => {
            "\n• Focus on SOURCE DISCOVERY and EVALUATION\n\
             • Create comprehensive source map for the team\n\
             • Prioritize credible, recent, and diverse sources\n\
             • Assess source quality and relevance scores\n\
             • Note sources that need deeper analysis by analysts\n"
        }
        HunterType::DeepAnalyst => {
            "\n• Focus on DEEP CONTENT ANALYSIS of sources found by scouts\n\
             • Extract detailed facts, figures, and examples\n\
             • Identify patterns and themes in the information\n\
             • Note claims that need verification by fact checkers\n\
             • Prepare detailed findings for synthesis\n"
        }
        HunterType::FactChecker => {
            "\n• Focus on VERIFICATION and CROSS-REFERENCING\n\
             • Validate claims made by analysts against multiple sources\n\
             • Check dates, statistics, and factual assertions\n\
             • Identify contradictions and resolve them\n\
             • Provide confidence scores for verified information\n"
        }
        HunterType::InsightSynthesizer => {
            "\n• Focus on SYNTHESIS and INSIGHT GENERATION\n\
             • Combine all team findings into coherent insights\n\
             • Identify actionable recommendations and implications\n\
             • Create comprehensive summary of research\n\
             • Highlight key findings and their significance\n"
        }
        HunterType::General => "",
    };

    format!(
        "\n\nCOLLABORATION PROTOCOL:\n{}\n\
         • ALWAYS coordinate with team through shared research memory\n\
         • BUILD on previous hunters' work, don't duplicate effort\n\
         • MAINTAIN your specialized focus while supporting team goals",
        focus
    )
}

const FACT_INDICATORS: [&str; 4] = ["according to", "studies show", "research indicates", "data shows"];
const VERIFY_KEYWORDS: [&str; 3] = ["verified", "confirmed", "cross-referenced"];
const DISPUTE_KEYWORDS: [&str; 2] = ["disputed", "contradict"];

/// Structured findings recognized in a hunter's free-text answer.
pub fn extract_findings(hunter_type: HunterType, hunter_id: &str, text: &str) -> Vec<NewFinding> {
    let lower = text.to_lowercase();
    match hunter_type {
        HunterType::SourceScout => {
            let sources: Vec<String> = text
                .lines()
                .filter(|line| {
                    let l = line.to_lowercase();
                    l.contains("http") || l.contains("www.")
                })
                .map(|line| line.trim().to_string())
                .collect();
            if sources.is_empty() {
                return Vec::new();
            }
            let count = sources.len();
            vec![NewFinding::new(
                hunter_id,
                hunter_type,
                FindingType::Source,
                format!("Discovered {} sources for research", count),
            )
            .sources(sources.into_iter().take(10).collect())
            .confidence(0.8)
            .tags(&["source_discovery"])
            .metadata("source_count", json!(count))]
        }
        HunterType::DeepAnalyst => {
            let facts: Vec<String> = text
                .lines()
                .map(str::trim)
                .filter(|line| {
                    let l = line.to_lowercase();
                    FACT_INDICATORS.iter().any(|i| l.contains(i))
                })
                .map(String::from)
                .collect();
            if facts.is_empty() {
                return Vec::new();
            }
            vec![NewFinding::new(
                hunter_id,
                hunter_type,
                FindingType::Fact,
                format!("Extracted {} factual insights from sources", facts.len()),
            )
            .confidence(0.7)
            .tags(&["deep_analysis", "facts"])
            .metadata("fact_count", json!(facts.len()))
            .metadata("facts", json!(facts.iter().take(5).collect::<Vec<_>>()))]
        }
        HunterType::FactChecker if VERIFY_KEYWORDS.iter().any(|k| lower.contains(k)) => {
            vec![NewFinding::new(
                hunter_id,
                hunter_type,
                FindingType::Verification,
                "Verification analysis completed for team findings",
            )
            .confidence(0.9)
            .tags(&["verification", "fact_check"])
            .metadata("verification_type", json!("cross_reference"))]
        }
        HunterType::InsightSynthesizer if text.chars().count() > 500 => {
            vec![NewFinding::new(
                hunter_id,
                hunter_type,
                FindingType::Synthesis,
                "Comprehensive research synthesis completed",
            )
            .confidence(0.8)
            .tags(&["synthesis", "insights"])
            .metadata("synthesis_length", json!(text.chars().count()))]
        }
        _ => Vec::new(),
    }
}

/// Mean of confidence times type weight, capped at 1.0.
pub fn quality_score(findings: &[NewFinding]) -> f32 {
    if findings.is_empty() {
        return 0.0;
    }
    let total: f32 = findings
        .iter()
        .map(|f| f.confidence * f.finding_type.weight())
        .sum();
    (total / findings.len() as f32).min(1.0)
}

/// Record every document returned by successful `search_web` calls.
fn register_sources(
    memory: &ResearchMemory,
    hunter_id: &str,
    hunter_type: HunterType,
    calls: &[ToolCallRecord],
) -> Vec<String> {
    calls
        .iter()
        .filter(|call| call.success && call.name == SEARCH_TOOL)
        .filter_map(|call| serde_json::from_value::<Vec<SearchDocument>>(call.result.clone()).ok())
        .flatten()
        .filter(|doc| !doc.url.is_empty())
        .map(|doc| {
            memory.add_source(NewSource {
                credibility_score: doc.authority.credibility(),
                recency_score: 0.6,
                relevance_score: 0.7,
                extracted: doc.extraction_success,
                summary: doc.key_facts.first().cloned().unwrap_or_default(),
                url: doc.url,
                title: doc.title,
                discovered_by: hunter_id.to_string(),
                discoverer_type: hunter_type,
                tags: vec![SEARCH_TOOL.to_string()],
            })
        })
        .collect()
}

/// Mark other hunters' unverified facts according to the checker's verdict.
fn apply_verification(memory: &ResearchMemory, hunter_id: &str, text: &str) -> usize {
    let lower = text.to_lowercase();
    let verdict = if DISPUTE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        VerificationStatus::Disputed
    } else if VERIFY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        VerificationStatus::Verified
    } else {
        return 0;
    };

    let evidence: String = text.chars().take(200).collect();
    memory
        .findings_by_type(FindingType::Fact)
        .into_iter()
        .filter(|f| f.hunter_type != HunterType::FactChecker)
        .filter(|f| f.verification_status == VerificationStatus::Unverified)
        .filter(|f| memory.verify_finding(&f.id, hunter_id, verdict, vec![evidence.clone()]))
        .count()
}
