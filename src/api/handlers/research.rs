use crate::{
    research::{events::TracingSink, ResearchOutcome, ResearchRequest},
    types::{AppError, Result},
    AppState,
};
use axum::{extract::State, Json};
use std::sync::Arc;

/// Run a research session and return its outcome.
///
/// Progress events go to the log; use `/ws` to stream them.
pub async fn run_research(
    State(state): State<AppState>,
    Json(payload): Json<ResearchRequest>,
) -> Result<Json<ResearchOutcome>> {
    if payload.query.trim().is_empty() {
        return Err(AppError::InvalidInput("query must not be empty".to_string()));
    }
    if payload.agents == Some(0) {
        return Err(AppError::InvalidInput("agents must be at least 1".to_string()));
    }

    let outcome = state
        .orchestrator()
        .run(payload, Arc::new(TracingSink))
        .await?;
    Ok(Json(outcome))
}
