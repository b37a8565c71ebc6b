use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::debug;

use crate::metrics::aggregate;
use crate::session::SessionIntent;
use crate::state::SharedState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: SharedState) {
    // Send the current session snapshot so a reconnecting client catches up
    // before live intents start flowing.
    let snapshot = {
        let coordinator = state.coordinator.read().await;
        coordinator.session().map(|session| SessionIntent::Progress {
            session_id: session.id.clone(),
            metrics: aggregate(&session.records, session.total),
            results: session.records.clone(),
        })
    };
    if let Some(snapshot) = snapshot {
        if let Ok(json) = serde_json::to_string(&snapshot) {
            if socket.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
    }

    let mut rx = state.intent_tx.subscribe();
    let mut shutdown_rx = state.shutdown_tx.subscribe();

    loop {
        tokio::select! {
            // Shutdown notification — tell client and close
            _ = shutdown_rx.recv() => {
                let _ = socket.send(Message::Text(r#"{"type":"shutdown"}"#.into())).await;
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            // Session intents — forward as-is
            result = rx.recv() => {
                match result {
                    Ok(intent) => {
                        if let Ok(json) = serde_json::to_string(&intent) {
                            if socket.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    // Lagged receivers just resubscribe at the next snapshot.
                    Err(_) => break,
                }
            }
            // Client messages — handle ping/pong/close
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {} // Ignore text/binary from client
                }
            }
        }
    }

    debug!("WebSocket client disconnected");
}
