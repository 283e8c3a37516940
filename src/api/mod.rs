//! HTTP API Handlers and Routes
//!
//! REST and WebSocket surface of the research server, built on Axum.
//!
//! # API Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /api/roles` - Hunter profiles and team compositions
//! - `POST /api/research` - Run one research session and return its outcome
//! - `GET /api/sessions` - Stored session snapshots, newest first
//! - `GET /api/sessions/{id}` - One session snapshot
//! - `GET /ws` - Streaming research: send `{query, mode?, agents?}`, receive
//!   `{type, data, session_id}` event envelopes

/// Request handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
