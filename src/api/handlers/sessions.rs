use crate::{
    db::ResearchSession,
    types::{AppError, Result},
    AppState,
};
use axum::{
    extract::{Path, State},
    Json,
};

/// All stored sessions, newest first.
pub async fn list_sessions(State(state): State<AppState>) -> Result<Json<Vec<ResearchSession>>> {
    Ok(Json(state.sessions.list().await?))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ResearchSession>> {
    state
        .sessions
        .get(&session_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))
}
