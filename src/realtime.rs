//! Realtime socket transport wrapped around the HTTP app.
//!
//! `GET /ws?conversation_id=<id>[&latest_event_id=<n>]` upgrades to a
//! WebSocket bound to one conversation stream; every other request falls
//! through to the HTTP app untouched, so HTTP middleware never sees socket
//! traffic.
//!
//! # Protocol
//! ```json
//! // server → client: one frame per event
//! {"id": 4, "source": "agent", "timestamp": "...", "kind": "message", "content": "Ping"}
//!
//! // client → server: publish a user message
//! {"type": "message", "content": "hello"}
//! ```

use std::sync::Arc;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Notify};

use crate::conversation::ConversationManager;
use crate::events::{Event, EventKind, EventSource, EventSubscriber};
use crate::observability::metrics;

/// Events buffered per socket before the client counts as stalled.
const SOCKET_BUFFER: usize = 1024;

/// Messages a socket client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Message { content: String },
}

#[derive(Debug, Deserialize)]
pub struct SocketParams {
    pub conversation_id: String,
    /// Replay starts after this id; omitted means replay everything retained.
    pub latest_event_id: Option<u64>,
}

/// Put the socket route in front of `http_app`.
pub fn wrap(http_app: Router, conversations: Arc<ConversationManager>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(conversations)
        .fallback_service(http_app)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(conversations): State<Arc<ConversationManager>>,
    Query(params): Query<SocketParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, conversations, params))
}

async fn handle_socket(
    mut socket: WebSocket,
    conversations: Arc<ConversationManager>,
    params: SocketParams,
) {
    let Some(conversation) = conversations.get(&params.conversation_id) else {
        tracing::debug!(conversation_id = %params.conversation_id, "Socket for unknown conversation");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::POLICY,
                reason: "conversation not found".into(),
            })))
            .await;
        return;
    };

    let stream = Arc::clone(&conversation.stream);
    let mut closed = conversation.closed();
    let callback_id = uuid::Uuid::new_v4().to_string();

    // Subscribe before reading history so nothing falls in the gap;
    // duplicates are dropped by id below. A full buffer means the client
    // stopped reading: it is disconnected and may resume from its last id.
    let (tx, mut rx) = mpsc::channel::<Event>(SOCKET_BUFFER);
    let lagged = Arc::new(Notify::new());
    let lagged_signal = Arc::clone(&lagged);
    stream.subscribe(EventSubscriber::Realtime, &callback_id, move |event| {
        if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(event.clone()) {
            lagged_signal.notify_one();
        }
    });
    let replay = stream.get_events(params.latest_event_id);

    metrics::record_realtime_connection(1.0);
    tracing::info!(
        conversation_id = %conversation.id,
        callback_id = %callback_id,
        replay = replay.len(),
        "Socket client connected"
    );

    let (mut sender, mut receiver) = socket.split();

    let mut last_sent = params.latest_event_id;
    let mut send_task = tokio::spawn(async move {
        for event in replay {
            if !forward(&mut sender, &mut last_sent, event).await {
                return;
            }
        }
        let deleted = async move {
            let _ = closed.wait_for(|closed| *closed).await;
        };
        tokio::pin!(deleted);
        let close = loop {
            tokio::select! {
                _ = &mut deleted => {
                    break CloseFrame {
                        code: close_code::AWAY,
                        reason: "conversation deleted".into(),
                    };
                }
                _ = lagged.notified() => {
                    break CloseFrame {
                        code: close_code::AGAIN,
                        reason: "client too slow; reconnect with latest_event_id".into(),
                    };
                }
                event = rx.recv() => match event {
                    Some(event) => {
                        if !forward(&mut sender, &mut last_sent, event).await {
                            return;
                        }
                    }
                    None => return,
                },
            }
        };
        let _ = sender.send(Message::Close(Some(close))).await;
    });

    loop {
        tokio::select! {
            _ = &mut send_task => break,
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Message { content }) => {
                        stream.add_event(EventKind::message(content), EventSource::User);
                    }
                    Err(e) => {
                        tracing::debug!(callback_id = %callback_id, error = %e, "Invalid socket message");
                    }
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(callback_id = %callback_id, error = %e, "Socket error");
                    break;
                }
            },
        }
    }

    stream.unsubscribe(EventSubscriber::Realtime, &callback_id);
    send_task.abort();
    metrics::record_realtime_connection(-1.0);
    tracing::info!(conversation_id = %conversation.id, callback_id = %callback_id, "Socket client disconnected");
}

/// Send one event unless the client already has it. False once the socket is gone.
async fn forward(
    sender: &mut SplitSink<WebSocket, Message>,
    last_sent: &mut Option<u64>,
    event: Event,
) -> bool {
    if last_sent.is_some_and(|id| event.id <= id) {
        return true;
    }
    let Ok(json) = serde_json::to_string(&event) else {
        return true;
    };
    if sender.send(Message::Text(json.into())).await.is_err() {
        return false;
    }
    *last_sent = Some(event.id);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn app() -> Router {
        let http_app = Router::new().route("/api/health", get(|| async { "http" }));
        wrap(http_app, Arc::new(ConversationManager::default()))
    }

    #[tokio::test]
    async fn non_socket_paths_fall_through() {
        let response = app()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"http");
    }

    #[tokio::test]
    async fn plain_get_on_socket_path_is_rejected() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/ws?conversation_id=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[test]
    fn client_message_format() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"message","content":"hi"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Message { content: "hi".into() });
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"other"}"#).is_err());
    }
}
