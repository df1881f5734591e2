//! Duplex websocket binding
//!
//! One socket carries inbound requests and outbound pushes. Each inbound frame
//! is dispatched on its own task, so replies may leave in any order; ids keep
//! them correlated. Unparseable frames are dropped without a reply.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::header,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::mcp::{
    rpc::{is_json_rpc_error, RequestEnvelope},
    server::{handle_json_rpc_request, ready_notification},
};
use crate::session::{Session, SessionError, SessionTransport};
use crate::AppState;

pub const WS_SUBPROTOCOL: &str = "mcp";
pub const WS_DESCRIPTION: &str = "MCP WebSocket endpoint. Connect with subprotocol 'mcp' at /mcp.";

struct WebSocketTransport {
    outbound: mpsc::UnboundedSender<Message>,
    shutdown: CancellationToken,
}

impl SessionTransport for WebSocketTransport {
    fn send(&self, payload: String, _event: Option<&str>) -> Result<(), SessionError> {
        self.outbound
            .send(Message::Text(payload.into()))
            .map_err(|_| SessionError::Closed)
    }

    fn close(&self) {
        self.shutdown.cancel();
    }

    fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.outbound.is_closed()
    }
}

/// `GET /mcp`: upgrades to a websocket, or describes the endpoint to plain requests.
pub async fn mcp_websocket(
    State(state): State<AppState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match upgrade {
        Ok(ws) => ws
            .protocols([WS_SUBPROTOCOL])
            .on_upgrade(move |socket| handle_socket(socket, state))
            .into_response(),
        Err(_) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            WS_DESCRIPTION,
        )
            .into_response(),
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    let writer_shutdown = CancellationToken::new();

    let session = state.sessions.create(WebSocketTransport {
        outbound: outbound_tx,
        shutdown: writer_shutdown.clone(),
    });
    let session_id = session.id().clone();
    let session_shutdown = session.shutdown_token();
    info!(session_id = %session_id, "websocket connected");

    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = writer_shutdown.cancelled() => break,
                message = outbound_rx.recv() => match message {
                    Some(message) => {
                        if sink.send(message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        let _ = sink.close().await;
    });

    session.send(&ready_notification(), None);

    loop {
        let frame = tokio::select! {
            _ = session_shutdown.cancelled() => break,
            frame = stream.next() => frame,
        };

        let raw = match frame {
            Some(Ok(Message::Text(text))) => text.to_string(),
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    debug!(session_id = %session_id, "dropping non-utf8 binary frame");
                    continue;
                }
            },
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(err)) => {
                debug!(session_id = %session_id, error = %err, "websocket read failed");
                break;
            }
        };

        dispatch_frame(&state, &session, &raw);
    }

    state.sessions.remove(&session_id);
    let _ = writer.await;
    info!(session_id = %session_id, "websocket disconnected");
}

/// Parses one inbound frame and dispatches it on its own task.
///
/// Returns `None` when the frame is not a request envelope; nothing is sent back.
pub fn dispatch_frame(
    state: &AppState,
    session: &Arc<Session>,
    raw: &str,
) -> Option<JoinHandle<()>> {
    let request = match RequestEnvelope::parse(raw) {
        Ok(request) => request,
        Err(err) => {
            debug!(session_id = %session.id(), error = %err, "dropping malformed frame");
            return None;
        }
    };

    let state = state.clone();
    let session = Arc::clone(session);
    Some(tokio::spawn(async move {
        if let Some(response) = handle_json_rpc_request(&state, request).await {
            debug!(
                session_id = %session.id(),
                error_reply = is_json_rpc_error(&response),
                "pushing reply"
            );
            session.send(&response, None);
        }
    }))
}
