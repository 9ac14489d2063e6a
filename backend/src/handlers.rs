use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use shared::events::{ClientMessage, ServerEvent};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::broadcast::Subscription;
use crate::AppState;

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Pong replies waiting for the forwarder; extra pings are dropped.
const REPLY_QUEUE: usize = 16;

/// Registers a display and builds its welcome frame. The subscription comes
/// first so any event published after the spin-state snapshot is queued
/// behind the welcome instead of lost.
async fn join(state: &AppState) -> (Subscription, ServerEvent) {
    let subscription = state.hub.subscribe();
    let welcome = ServerEvent::Connected {
        message: "Connected to lucky wheel server".to_string(),
        is_spinning: state.coordinator.is_spinning().await,
    };
    (subscription, welcome)
}

/// One display connection: a welcome frame, then every broadcast plus pong
/// replies, until the client leaves or the server shuts down.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (Subscription { id, receiver: mut events }, welcome) = join(&state).await;
    let welcome = match serde_json::to_string(&welcome) {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to encode welcome message: {}", e);
            state.hub.unsubscribe(id);
            return;
        }
    };
    if let Err(e) = sender.send(Message::Text(welcome)).await {
        warn!("Error sending welcome message: {:?}", e);
        state.hub.unsubscribe(id);
        return;
    }

    let (reply_tx, mut replies) = mpsc::channel::<String>(REPLY_QUEUE);

    // Forward broadcasts and replies to the socket. Ends when the hub drops
    // this subscription.
    let mut shutdown = state.shutdown.clone();
    let mut forward = tokio::spawn(async move {
        loop {
            let text = tokio::select! {
                event = events.recv() => match event {
                    Some(text) => text,
                    None => break,
                },
                Some(text) = replies.recv() => text,
                _ = shutdown.wait() => break,
            };
            if let Err(e) = sender.send(Message::Text(text)).await {
                debug!("WebSocket send error: {:?} - Connection will be closed", e);
                break;
            }
        }
        if let Err(e) = sender.close().await {
            debug!("Failed to close WebSocket connection gracefully: {:?}", e);
        }
    });

    let mut shutdown = state.shutdown.clone();
    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = reply_to(&text) {
                        match serde_json::to_string(&reply) {
                            Ok(reply) => {
                                if reply_tx.try_send(reply).is_err() {
                                    debug!("Dropping pong for busy display {}", id);
                                }
                            }
                            Err(e) => error!("Failed to encode pong: {}", e),
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket error from display {}: {:?}", id, e);
                    break;
                }
            },
            _ = &mut forward => break,
            _ = shutdown.wait() => break,
        }
    }

    state.hub.unsubscribe(id);
}

/// Answers `ping` with `pong` echoing its data; other messages are ignored.
fn reply_to(text: &str) -> Option<ServerEvent> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) if message.kind == "ping" => Some(ServerEvent::Pong(message.data)),
        Ok(message) => {
            debug!("Ignoring {} message from display", message.kind);
            None
        }
        Err(e) => {
            warn!("Invalid message format from display: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ping_gets_pong_with_same_data() {
        let reply = reply_to(r#"{"type": "ping", "data": {"ts": 1700000000}}"#);
        assert_eq!(reply, Some(ServerEvent::Pong(json!({"ts": 1700000000}))));
    }

    #[test]
    fn test_other_messages_ignored() {
        assert_eq!(reply_to(r#"{"type": "hello"}"#), None);
        assert_eq!(reply_to("not json"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_during_spin_still_sees_lock_clear() {
        let state = crate::test_support::test_state().await;
        state.coordinator.spin().await.unwrap();

        let (mut subscription, welcome) = join(&state).await;
        assert_eq!(
            welcome,
            ServerEvent::Connected {
                message: "Connected to lucky wheel server".to_string(),
                is_spinning: true,
            }
        );

        tokio::time::sleep(std::time::Duration::from_millis(8100)).await;
        let queued = subscription.receiver.try_recv().unwrap();
        let event: ServerEvent = serde_json::from_str(&queued).unwrap();
        assert_eq!(event, ServerEvent::SpinLockCleared { is_spinning: false });
        state.hub.unsubscribe(subscription.id);
    }

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, "OK");
    }
}
