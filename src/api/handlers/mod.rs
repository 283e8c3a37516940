//! API request handlers.

/// Research run handler.
pub mod research;
/// Health check and hunter role listing.
pub mod roles;
/// Session snapshot handlers.
pub mod sessions;
/// Streaming research over WebSocket.
pub mod ws;
