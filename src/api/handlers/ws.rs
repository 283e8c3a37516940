//! Streaming research over a WebSocket.
//!
//! The client sends one JSON request `{query, mode?, agents?}` and receives
//! `{type, data, session_id}` envelopes until `orchestration_complete` or
//! `research_error`. Closing the socket cancels the run.

use crate::{
    research::{events::ChannelSink, ResearchEvent, ResearchRequest},
    AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn research_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    let mut run: Option<tokio::task::JoinHandle<()>> = None;

    tracing::debug!("Research WebSocket connected");

    loop {
        tokio::select! {
            Some(envelope) = rx.recv() => {
                let terminal = is_terminal(&envelope);
                if sink.send(Message::Text(envelope.to_string().into())).await.is_err() {
                    tracing::debug!("Failed to send event, client gone");
                    break;
                }
                if terminal {
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if run.is_some() {
                            tracing::debug!("Ignoring message, research already running");
                            continue;
                        }
                        match parse_request(text.as_str()) {
                            Ok(request) => run = Some(start_run(&state, request, tx.clone())),
                            Err(error) => {
                                let envelope = ResearchEvent::ResearchError { error }.envelope("");
                                if sink.send(Message::Text(envelope.to_string().into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        tracing::debug!("Research WebSocket closed by client");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    if let Some(handle) = run {
        if !handle.is_finished() {
            tracing::info!("Cancelling research run for closed WebSocket");
            handle.abort();
        }
    }
    let _ = sink.close().await;
}

fn start_run(
    state: &AppState,
    mut request: ResearchRequest,
    tx: mpsc::UnboundedSender<Value>,
) -> tokio::task::JoinHandle<()> {
    let session_id = request
        .session_id
        .take()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    request.session_id = Some(session_id.clone());

    let orchestrator = state.orchestrator();
    let sink = Arc::new(ChannelSink::new(session_id, tx));
    tokio::spawn(async move {
        // Failures already reached the client as research_error
        if let Err(e) = orchestrator.run(request, sink).await {
            tracing::warn!(error = %e, "WebSocket research run failed");
        }
    })
}

fn parse_request(text: &str) -> Result<ResearchRequest, String> {
    let request: ResearchRequest =
        serde_json::from_str(text).map_err(|e| format!("Invalid request: {}", e))?;
    if request.query.trim().is_empty() {
        return Err("Invalid request: query must not be empty".to_string());
    }
    Ok(request)
}

fn is_terminal(envelope: &Value) -> bool {
    matches!(
        envelope.get("type").and_then(Value::as_str),
        Some("orchestration_complete" | "research_error")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_parsing() {
        let request = parse_request(r#"{"query": "best budget hotels in Lisbon", "agents": 2}"#).unwrap();
        assert_eq!(request.agents, Some(2));
        assert!(parse_request(r#"{"query": "   "}"#).is_err());
        assert!(parse_request("not json").unwrap_err().starts_with("Invalid request"));
    }

    #[test]
    fn terminal_envelopes() {
        assert!(is_terminal(&json!({"type": "orchestration_complete"})));
        assert!(is_terminal(&json!({"type": "research_error"})));
        assert!(!is_terminal(&json!({"type": "agent_step"})));
    }
}
