//! End-to-end research sessions against a scripted model.

mod common;

use common::mocks::{RecordingSink, ScriptedLLM, StaticSearch, FINDINGS_PREFIX};
use huntpack::db::{InMemorySessionStore, SessionPhase, SessionStatus, SessionStore};
use huntpack::research::coordinator::DecompositionInfo;
use huntpack::research::synthesis::SynthesisMethod;
use huntpack::research::{
    ExecutionBackend, ExecutionMode, HunterRoleSystem, Orchestrator, OrchestratorConfig,
    ResearchEvent, ResearchRequest,
};
use huntpack::tools::{SearchTool, ToolRegistry};
use huntpack::types::{AgentStatus, HunterType};
use std::sync::Arc;
use std::time::Duration;

const LISBON: &str = "best budget hotels in Lisbon";

struct Harness {
    llm: Arc<ScriptedLLM>,
    sessions: Arc<InMemorySessionStore>,
    sink: Arc<RecordingSink>,
    orchestrator: Orchestrator,
}

fn harness(llm: ScriptedLLM, config: OrchestratorConfig) -> Harness {
    let llm = Arc::new(llm);
    let sessions = Arc::new(InMemorySessionStore::new());
    let tools = Arc::new(ToolRegistry::with_research_tools(SearchTool::new(Arc::new(
        StaticSearch,
    ))));
    let orchestrator = Orchestrator::new(
        llm.clone(),
        tools,
        Arc::new(HunterRoleSystem::new()),
        sessions.clone(),
        config,
    );
    Harness {
        llm,
        sessions,
        sink: Arc::new(RecordingSink::default()),
        orchestrator,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn standard_mode_runs_general_agents_and_merges() {
    let questions = [
        "Which Lisbon districts have cheap hotels?",
        "What do budget hotels in Lisbon cost?",
        "Which hostels in Lisbon are best rated?",
        "When is Lisbon cheapest to visit?",
    ];
    let h = harness(
        ScriptedLLM::new().with_questions(&questions),
        OrchestratorConfig::default(),
    );

    let outcome = h
        .orchestrator
        .run(
            ResearchRequest::new(LISBON)
                .mode(ExecutionMode::Standard)
                .agents(4)
                .session_id("lisbon"),
            h.sink.clone(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.session_id, "lisbon");
    assert!(matches!(outcome.decomposition, DecompositionInfo::Generated));
    assert_eq!(outcome.agent_results.len(), 4);
    for (i, result) in outcome.agent_results.iter().enumerate() {
        assert_eq!(result.agent_id, i);
        assert_eq!(result.status, AgentStatus::Success);
        assert_eq!(result.subtask.hunter(), HunterType::General);
        assert_eq!(result.response, format!("{}{}", FINDINGS_PREFIX, questions[i]));
    }
    assert_eq!(outcome.synthesis, SynthesisMethod::Merged);
    assert_eq!(outcome.final_result, "Merged answer");
    assert!(outcome.memory.is_none());
    assert!(outcome.plan.is_none());
    assert!(outcome.complexity.is_none());

    let prompt = &h.llm.synthesis_prompts()[0];
    assert!(!prompt.starts_with("DEEP RESEARCH SYNTHESIS"));
    assert!(prompt.contains("You have 4 different research perspectives"));

    let session = h.sessions.get("lisbon").await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.current_phase, SessionPhase::Completed);
    assert_eq!(session.progress, 100.0);
    assert_eq!(session.final_result.as_deref(), Some("Merged answer"));
    assert!(session.agents.iter().all(|a| a.status == "COMPLETED"));
}

#[tokio::test(flavor = "multi_thread")]
async fn events_follow_session_lifecycle() {
    let h = harness(ScriptedLLM::new(), OrchestratorConfig::default());

    h.orchestrator
        .run(
            ResearchRequest::new(LISBON).mode(ExecutionMode::Standard).agents(2),
            h.sink.clone(),
        )
        .await
        .unwrap();

    let types = h.sink.types();
    assert_eq!(types[0], "orchestration_start");
    assert_eq!(types[1], "task_decomposed");
    assert!(!types.contains(&"research_plan_created"));
    assert_eq!(types[types.len() - 2], "synthesis_starting");
    assert_eq!(types[types.len() - 1], "orchestration_complete");

    let events = h.sink.events.lock();
    let progress: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ResearchEvent::AgentProgress(p) => Some(p.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(progress.len(), 4);
    assert_eq!(
        progress.iter().filter(|p| p.status == "COMPLETED").count(),
        2
    );
    assert!(progress
        .iter()
        .filter(|p| p.status == "COMPLETED")
        .all(|p| p.progress == 100 && p.result.is_some()));

    assert!(events.iter().any(|e| matches!(
        e,
        ResearchEvent::AgentStep(step) if step.step_type == "tool_completed"
    )));
}

#[tokio::test(flavor = "multi_thread")]
async fn synthesis_failure_concatenates_responses() {
    let h = harness(
        ScriptedLLM::new()
            .with_questions(&["first angle", "second angle"])
            .failing_synthesis(),
        OrchestratorConfig::default(),
    );

    let outcome = h
        .orchestrator
        .run(
            ResearchRequest::new(LISBON).mode(ExecutionMode::Standard).agents(2),
            h.sink.clone(),
        )
        .await
        .unwrap();

    assert!(matches!(outcome.synthesis, SynthesisMethod::Concatenated { .. }));
    let first = outcome
        .final_result
        .find("=== Agent 1 Response ===\nFindings for: first angle")
        .unwrap();
    let second = outcome
        .final_result
        .find("=== Agent 2 Response ===\nFindings for: second angle")
        .unwrap();
    assert!(first < second);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_agent_does_not_sink_the_batch() {
    let h = harness(
        ScriptedLLM::new()
            .with_questions(&["alpha", "beta crash", "gamma"])
            .failing_agents_matching("crash"),
        OrchestratorConfig::default(),
    );

    let outcome = h
        .orchestrator
        .run(
            ResearchRequest::new(LISBON)
                .mode(ExecutionMode::Standard)
                .agents(3)
                .session_id("partial"),
            h.sink.clone(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.agent_results.len(), 3);
    assert_eq!(outcome.successful_agents(), 2);
    let failed = &outcome.agent_results[1];
    assert_eq!(failed.status, AgentStatus::Error);
    assert!(failed.response.contains("model crashed"));
    assert_eq!(outcome.synthesis, SynthesisMethod::Merged);

    let prompt = &h.llm.synthesis_prompts()[0];
    assert!(prompt.contains("You have 2 different research perspectives"));
    assert!(!prompt.contains("model crashed"));

    let session = h.sessions.get("partial").await.unwrap().unwrap();
    assert_eq!(session.progress, 2.0 / 3.0 * 100.0);
    assert!(session.agents[1].status.starts_with("FAILED: "));
}

#[tokio::test(flavor = "multi_thread")]
async fn all_agents_failing_yields_fixed_message() {
    let h = harness(
        ScriptedLLM::new()
            .with_questions(&["crash one", "crash two"])
            .failing_agents_matching("crash"),
        OrchestratorConfig::default(),
    );

    let outcome = h
        .orchestrator
        .run(
            ResearchRequest::new(LISBON).mode(ExecutionMode::Standard).agents(2),
            h.sink.clone(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.synthesis, SynthesisMethod::NoResults);
    assert_eq!(
        outcome.final_result,
        huntpack::research::synthesis::ALL_AGENTS_FAILED
    );
    assert!(h.llm.synthesis_prompts().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_decomposition_falls_back() {
    let h = harness(
        ScriptedLLM::new().with_decomposition_reply("I think you should look at hotels."),
        OrchestratorConfig::default(),
    );

    let outcome = h
        .orchestrator
        .run(
            ResearchRequest::new(LISBON).mode(ExecutionMode::Standard).agents(3),
            h.sink.clone(),
        )
        .await
        .unwrap();

    match &outcome.decomposition {
        DecompositionInfo::Fallback { reason, .. } => assert!(reason.starts_with("Invalid JSON")),
        other => panic!("expected fallback, got {:?}", other),
    }
    assert_eq!(outcome.subtasks.len(), 3);
    assert_eq!(outcome.agent_results.len(), 3);

    let events = h.sink.events.lock();
    assert!(events.iter().any(|e| matches!(
        e,
        ResearchEvent::TaskDecomposed { fallback_reason: Some(_), .. }
    )));
}

#[tokio::test(flavor = "multi_thread")]
async fn decomposition_error_fails_the_session() {
    let h = harness(
        ScriptedLLM::new().failing_decomposition(),
        OrchestratorConfig::default(),
    );

    let err = h
        .orchestrator
        .run(
            ResearchRequest::new(LISBON)
                .mode(ExecutionMode::Standard)
                .session_id("broken"),
            h.sink.clone(),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("connection refused"));

    let types = h.sink.types();
    assert_eq!(types.last(), Some(&"research_error"));
    assert!(!types.contains(&"task_decomposed"));

    let session = h.sessions.get("broken").await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
    assert_eq!(session.current_phase, SessionPhase::Failed);
}

#[tokio::test]
async fn empty_query_is_rejected_before_any_event() {
    let h = harness(ScriptedLLM::new(), OrchestratorConfig::default());

    let result = h
        .orchestrator
        .run(ResearchRequest::new("   "), h.sink.clone())
        .await;

    assert!(result.is_err());
    assert!(h.sink.types().is_empty());
    assert!(h.sessions.list().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_session_id_is_reported() {
    let h = harness(ScriptedLLM::new(), OrchestratorConfig::default());
    let request = || {
        ResearchRequest::new(LISBON)
            .mode(ExecutionMode::Standard)
            .agents(1)
            .session_id("dup")
    };

    h.orchestrator.run(request(), h.sink.clone()).await.unwrap();
    let sink = Arc::new(RecordingSink::default());
    assert!(h.orchestrator.run(request(), sink.clone()).await.is_err());
    assert_eq!(sink.types(), vec!["research_error"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn phased_mode_runs_hunters_in_sequence() {
    let h = harness(ScriptedLLM::new(), OrchestratorConfig::default());

    let outcome = h
        .orchestrator
        .run(
            ResearchRequest::new(LISBON).mode(ExecutionMode::Phased).agents(5),
            h.sink.clone(),
        )
        .await
        .unwrap();

    let hunters: Vec<HunterType> = outcome.subtasks.iter().map(|s| s.hunter()).collect();
    assert_eq!(
        hunters,
        vec![
            HunterType::SourceScout,
            HunterType::DeepAnalyst,
            HunterType::FactChecker,
            HunterType::InsightSynthesizer,
            HunterType::General,
        ]
    );
    assert_eq!(outcome.successful_agents(), 5);

    // Each phase finishes before the next one starts.
    let order: Vec<(usize, bool)> = h
        .sink
        .events
        .lock()
        .iter()
        .filter_map(|e| match e {
            ResearchEvent::AgentProgress(p) => Some((p.agent_id, p.status == "COMPLETED")),
            _ => None,
        })
        .collect();
    let expected: Vec<(usize, bool)> = (0..5).flat_map(|id| [(id, false), (id, true)]).collect();
    assert_eq!(order, expected);

    let plan = outcome.plan.unwrap();
    assert_eq!(plan.completed, plan.total);
    assert_eq!(plan.percentage, 100.0);

    let memory = outcome.memory.unwrap();
    assert!(!memory.sources.is_empty());

    let prompt = &h.llm.synthesis_prompts()[0];
    assert!(prompt.starts_with("DEEP RESEARCH SYNTHESIS"));
    assert!(prompt.contains("Research Plan: 100% complete"));
}

#[tokio::test(flavor = "multi_thread")]
async fn parallel_mode_leaves_dependent_todos_unclaimed() {
    let h = harness(
        ScriptedLLM::new().with_agent_delay(Duration::from_millis(20)),
        OrchestratorConfig::default(),
    );

    let outcome = h
        .orchestrator
        .run(
            ResearchRequest::new(LISBON).mode(ExecutionMode::Parallel).agents(4),
            h.sink.clone(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.successful_agents(), 4);
    let plan = outcome.plan.unwrap();
    assert!(plan.completed > 0);
    assert!(plan.completed < plan.total);
    assert!(plan.pending > 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_timeout_marks_agents_timed_out() {
    let config = OrchestratorConfig {
        task_timeout: Duration::from_millis(50),
        backend: Some(ExecutionBackend::Tasks),
        ..OrchestratorConfig::default()
    };
    let h = harness(
        ScriptedLLM::new().with_agent_delay(Duration::from_secs(5)),
        config,
    );

    let outcome = h
        .orchestrator
        .run(
            ResearchRequest::new(LISBON).mode(ExecutionMode::Standard).agents(2),
            h.sink.clone(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.agent_results.len(), 2);
    for result in &outcome.agent_results {
        assert_eq!(result.status, AgentStatus::Timeout);
        assert!(result.response.starts_with("Timed out after"));
    }
    assert_eq!(outcome.synthesis, SynthesisMethod::NoResults);
}

#[tokio::test(flavor = "multi_thread")]
async fn deep_mode_without_hunters_uses_general_agents() {
    let config = OrchestratorConfig {
        deep_research: false,
        ..OrchestratorConfig::default()
    };
    let h = harness(ScriptedLLM::new(), config);

    let outcome = h
        .orchestrator
        .run(
            ResearchRequest::new(LISBON).mode(ExecutionMode::Phased).agents(2),
            h.sink.clone(),
        )
        .await
        .unwrap();

    assert!(outcome
        .subtasks
        .iter()
        .all(|s| s.hunter() == HunterType::General));
    assert!(outcome.memory.is_some());
    assert_eq!(outcome.plan.unwrap().total, 0);
}
