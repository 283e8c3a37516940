//! Research plan and todo engine
//!
//! A [`ResearchPlan`] is generated once per session: four template todos per
//! hunter type, in hand-off order. Every todo of a later hunter type depends
//! on the final todo of the type before it, so a type's work only becomes
//! available once the previous specialization has finished.
//!
//! Todos move strictly `Pending -> InProgress -> Completed`. `Blocked` exists
//! for callers that want to park a todo; nothing in the base flow uses it.

use crate::types::HunterType;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TodoStatus {
    fn marker(&self) -> &'static str {
        match self {
            TodoStatus::Pending => "[ ]",
            TodoStatus::InProgress => "[~]",
            TodoStatus::Completed => "[x]",
            TodoStatus::Blocked => "[!]",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchTodo {
    pub id: String,
    pub description: String,
    pub hunter_type: HunterType,
    /// 1 is most urgent.
    pub priority: u8,
    pub status: TodoStatus,
    pub estimated_minutes: u32,
    pub dependency_ids: Vec<String>,
    pub results: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanProgress {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub percentage: f64,
    /// Minutes left across pending and in-progress todos.
    pub estimated_time_remaining: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub plan_id: String,
    pub query: String,
    pub hunter_types: Vec<HunterType>,
    pub todos: Vec<ResearchTodo>,
    pub created_at: DateTime<Utc>,
    pub progress: PlanProgress,
}

fn templates(hunter_type: HunterType) -> &'static [&'static str] {
    match hunter_type {
        HunterType::SourceScout => &[
            "Identify and evaluate 8-10 high-quality sources",
            "Assess source credibility and relevance scores",
            "Map information landscape and coverage gaps",
            "Create source quality ranking matrix",
        ],
        HunterType::DeepAnalyst => &[
            "Perform deep content extraction from top 5 sources",
            "Analyze information patterns and themes",
            "Extract detailed facts, figures, and examples",
            "Identify information quality and gaps",
        ],
        HunterType::FactChecker => &[
            "Cross-reference claims across multiple sources",
            "Verify statistics and factual assertions",
            "Identify conflicting information and resolve",
            "Validate source dates and currency",
        ],
        HunterType::InsightSynthesizer => &[
            "Synthesize findings into coherent insights",
            "Identify actionable recommendations",
            "Create structured summary with key points",
            "Prepare final research deliverable",
        ],
        HunterType::General => &[],
    }
}

pub struct ResearchPlan {
    plan_id: String,
    query: String,
    hunter_types: Vec<HunterType>,
    created_at: DateTime<Utc>,
    todos: RwLock<Vec<ResearchTodo>>,
}

impl ResearchPlan {
    /// Build the plan for the given hunter types.
    ///
    /// Types are reordered into hand-off order and deduplicated; `General`
    /// contributes no todos.
    pub fn generate(query: impl Into<String>, hunter_types: &[HunterType]) -> Self {
        let query = query.into();
        let created_at = Utc::now();

        let mut ordered: Vec<HunterType> = HunterType::SEQUENCE
            .iter()
            .copied()
            .filter(|t| hunter_types.contains(t))
            .collect();
        ordered.dedup();

        let mut todos: Vec<ResearchTodo> = Vec::new();
        for hunter_type in &ordered {
            let handoff = todos.last().map(|t| t.id.clone());
            let base_priority: u8 = if *hunter_type == HunterType::SourceScout { 1 } else { 2 };

            for (i, template) in templates(*hunter_type).iter().enumerate() {
                todos.push(ResearchTodo {
                    id: format!("todo_{:03}", todos.len()),
                    description: format!("{} for: {}", template, query),
                    hunter_type: *hunter_type,
                    priority: base_priority + i as u8,
                    status: TodoStatus::Pending,
                    estimated_minutes: 8 + 3 * i as u32,
                    dependency_ids: handoff.iter().cloned().collect(),
                    results: Map::new(),
                    created_at,
                    completed_at: None,
                });
            }
        }

        tracing::debug!(todos = todos.len(), "Research plan generated");

        Self {
            plan_id: format!("plan_{}", created_at.timestamp()),
            query,
            hunter_types: ordered,
            created_at,
            todos: RwLock::new(todos),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn hunter_types(&self) -> &[HunterType] {
        &self.hunter_types
    }

    pub fn todo(&self, id: &str) -> Option<ResearchTodo> {
        self.todos.read().iter().find(|t| t.id == id).cloned()
    }

    pub fn todos_for(&self, hunter_type: HunterType) -> Vec<ResearchTodo> {
        self.todos
            .read()
            .iter()
            .filter(|t| t.hunter_type == hunter_type)
            .cloned()
            .collect()
    }

    /// Pending todos of `hunter_type` whose dependencies are all completed,
    /// most urgent first.
    pub fn available_todos(&self, hunter_type: HunterType) -> Vec<ResearchTodo> {
        let todos = self.todos.read();
        available_ids(&todos, hunter_type)
            .into_iter()
            .filter_map(|id| todos.iter().find(|t| t.id == id).cloned())
            .collect()
    }

    /// `Pending -> InProgress`. Returns `false` if the todo is not pending.
    pub fn start_todo(&self, id: &str) -> bool {
        let mut todos = self.todos.write();
        match todos.iter_mut().find(|t| t.id == id) {
            Some(todo) if todo.status == TodoStatus::Pending => {
                todo.status = TodoStatus::InProgress;
                true
            }
            _ => false,
        }
    }

    /// `InProgress -> Completed`, merging `results` into the todo.
    /// Returns `false` if the todo is not in progress.
    pub fn complete_todo(&self, id: &str, results: Map<String, Value>) -> bool {
        let mut todos = self.todos.write();
        match todos.iter_mut().find(|t| t.id == id) {
            Some(todo) if todo.status == TodoStatus::InProgress => {
                todo.status = TodoStatus::Completed;
                todo.completed_at = Some(Utc::now());
                todo.results.extend(results);
                true
            }
            _ => false,
        }
    }

    /// `Pending -> Blocked`.
    pub fn block_todo(&self, id: &str) -> bool {
        let mut todos = self.todos.write();
        match todos.iter_mut().find(|t| t.id == id) {
            Some(todo) if todo.status == TodoStatus::Pending => {
                todo.status = TodoStatus::Blocked;
                true
            }
            _ => false,
        }
    }

    /// Atomically claim the most urgent available todo for `hunter_type`.
    pub fn claim_next(&self, hunter_type: HunterType) -> Option<ResearchTodo> {
        self.claim(hunter_type, 1).into_iter().next()
    }

    /// Atomically claim every available todo for `hunter_type`.
    pub fn claim_available(&self, hunter_type: HunterType) -> Vec<ResearchTodo> {
        self.claim(hunter_type, usize::MAX)
    }

    fn claim(&self, hunter_type: HunterType, limit: usize) -> Vec<ResearchTodo> {
        let mut todos = self.todos.write();
        let ids: Vec<String> = available_ids(&todos, hunter_type)
            .into_iter()
            .take(limit)
            .collect();

        let mut claimed: Vec<ResearchTodo> = todos
            .iter_mut()
            .filter(|t| ids.contains(&t.id))
            .map(|t| {
                t.status = TodoStatus::InProgress;
                t.clone()
            })
            .collect();
        claimed.sort_by_key(|t| t.priority);
        claimed
    }

    /// Ids from `todo_id` back to the root, following the first dependency.
    pub fn dependency_chain(&self, todo_id: &str) -> Vec<String> {
        let todos = self.todos.read();
        let mut chain = Vec::new();
        let mut current = Some(todo_id.to_string());

        while let Some(id) = current {
            if chain.contains(&id) {
                break;
            }
            current = todos
                .iter()
                .find(|t| t.id == id)
                .and_then(|t| t.dependency_ids.first().cloned());
            chain.push(id);
        }
        chain
    }

    pub fn progress(&self) -> PlanProgress {
        let todos = self.todos.read();
        let total = todos.len();
        let count = |status: TodoStatus| todos.iter().filter(|t| t.status == status).count();
        let completed = count(TodoStatus::Completed);
        let in_progress = count(TodoStatus::InProgress);

        PlanProgress {
            total,
            completed,
            in_progress,
            pending: total - completed - in_progress,
            percentage: if total > 0 {
                completed as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            estimated_time_remaining: todos
                .iter()
                .filter(|t| matches!(t.status, TodoStatus::Pending | TodoStatus::InProgress))
                .map(|t| t.estimated_minutes)
                .sum(),
        }
    }

    pub fn snapshot(&self) -> PlanSnapshot {
        PlanSnapshot {
            plan_id: self.plan_id.clone(),
            query: self.query.clone(),
            hunter_types: self.hunter_types.clone(),
            todos: self.todos.read().clone(),
            created_at: self.created_at,
            progress: self.progress(),
        }
    }
}

fn available_ids(todos: &[ResearchTodo], hunter_type: HunterType) -> Vec<String> {
    let done = |id: &String| {
        todos
            .iter()
            .find(|t| &t.id == id)
            .map(|t| t.status == TodoStatus::Completed)
            .unwrap_or(true)
    };

    let mut available: Vec<&ResearchTodo> = todos
        .iter()
        .filter(|t| t.hunter_type == hunter_type && t.status == TodoStatus::Pending)
        .filter(|t| t.dependency_ids.iter().all(done))
        .collect();
    available.sort_by_key(|t| t.priority);
    available.into_iter().map(|t| t.id.clone()).collect()
}

/// A hunter-type-scoped view of a shared plan.
#[derive(Clone)]
pub struct PlanningHandle {
    plan: Arc<ResearchPlan>,
    hunter_type: HunterType,
}

impl PlanningHandle {
    pub fn new(plan: Arc<ResearchPlan>, hunter_type: HunterType) -> Self {
        Self { plan, hunter_type }
    }

    pub fn hunter_type(&self) -> HunterType {
        self.hunter_type
    }

    pub fn next_todo(&self) -> Option<ResearchTodo> {
        self.plan.available_todos(self.hunter_type).into_iter().next()
    }

    pub fn claim_available(&self) -> Vec<ResearchTodo> {
        self.plan.claim_available(self.hunter_type)
    }

    pub fn start(&self, todo_id: &str) -> bool {
        self.plan.start_todo(todo_id)
    }

    pub fn complete(&self, todo_id: &str, results: Map<String, Value>) -> bool {
        self.plan.complete_todo(todo_id, results)
    }

    /// Status of this hunter's todos plus overall progress.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "RESEARCH PLAN for {}:\nQuery: {}\n\n",
            self.hunter_type.as_str().to_uppercase(),
            self.plan.query()
        );

        for (i, todo) in self.plan.todos_for(self.hunter_type).iter().enumerate() {
            summary.push_str(&format!(
                "{} {}. {}\n",
                todo.status.marker(),
                i + 1,
                todo.description
            ));
            if !todo.dependency_ids.is_empty() {
                summary.push_str(&format!(
                    "   Depends on: {}\n",
                    todo.dependency_ids.join(", ")
                ));
            }
        }

        let progress = self.plan.progress();
        summary.push_str(&format!(
            "\nOVERALL PROGRESS: {}/{} todos completed ({:.1}%)\n",
            progress.completed, progress.total, progress.percentage
        ));
        summary
    }
}
