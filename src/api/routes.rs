use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(crate::api::handlers::roles::health))
        .route("/api/roles", get(crate::api::handlers::roles::list_roles))
        .route(
            "/api/research",
            post(crate::api::handlers::research::run_research),
        )
        .route(
            "/api/sessions",
            get(crate::api::handlers::sessions::list_sessions),
        )
        .route(
            "/api/sessions/{id}",
            get(crate::api::handlers::sessions::get_session),
        )
        .route("/ws", get(crate::api::handlers::ws::research_ws))
}

/// Router with CORS and request tracing, bound to `state`.
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
