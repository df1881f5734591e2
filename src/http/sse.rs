//! Event stream binding with a POST side channel
//!
//! `GET /sse` opens a one-way stream and announces its session id. Requests
//! arrive as `POST /sse?session=<id>` (or `x-session-id`), are dispatched
//! before the POST returns, and their replies are pushed onto the stream.

use std::{convert::Infallible, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::AppError;
use crate::mcp::{
    rpc::{is_json_rpc_error, notification, RequestEnvelope},
    server::{handle_json_rpc_request, ready_notification},
};
use crate::session::{SessionError, SessionId, SessionRegistry, SessionTransport, MESSAGE_EVENT};
use crate::AppState;

pub const SESSION_HEADER: &str = "x-session-id";

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

struct EventStreamTransport {
    outbound: mpsc::UnboundedSender<Event>,
    shutdown: CancellationToken,
}

impl SessionTransport for EventStreamTransport {
    fn send(&self, payload: String, event: Option<&str>) -> Result<(), SessionError> {
        let mut frame = Event::default().data(payload);
        if let Some(event) = event {
            frame = frame.event(event);
        }
        self.outbound.send(frame).map_err(|_| SessionError::Closed)
    }

    fn close(&self) {
        self.shutdown.cancel();
    }

    fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.outbound.is_closed()
    }
}

/// Evicts the session once the response stream is dropped (client went away).
struct StreamGuard {
    sessions: Arc<SessionRegistry>,
    id: SessionId,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session: Option<String>,
}

/// `GET /sse`: opens the stream, announces the session, then starts the heartbeat.
pub async fn open_stream(State(state): State<AppState>) -> Response {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Event>();
    let shutdown = CancellationToken::new();

    let session = state.sessions.create(EventStreamTransport {
        outbound: outbound_tx,
        shutdown: shutdown.clone(),
    });

    session.send(
        &notification(
            "notifications/session",
            json!({ "session": session.id().as_str() }),
        ),
        Some(MESSAGE_EVENT),
    );
    session.send(&ready_notification(), Some(MESSAGE_EVENT));
    session.spawn_heartbeat(state.heartbeat_interval);

    let guard = StreamGuard {
        sessions: Arc::clone(&state.sessions),
        id: session.id().clone(),
    };
    let stream = UnboundedReceiverStream::new(outbound_rx)
        .take_until(shutdown.cancelled_owned())
        .map(move |event| {
            let _ = &guard;
            Ok::<Event, Infallible>(event)
        });

    (
        [
            (header::CACHE_CONTROL, "no-cache, no-transform"),
            (X_ACCEL_BUFFERING, "no"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        Sse::new(stream),
    )
        .into_response()
}

/// `POST /sse`: handles one request for an existing session and acknowledges with 204.
pub async fn submit(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let outcome = submit_request(&state, query, &headers, &body).await;
    let cors = [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")];

    match outcome {
        Ok(()) => (StatusCode::NO_CONTENT, cors).into_response(),
        Err(err) => (cors, err).into_response(),
    }
}

async fn submit_request(
    state: &AppState,
    query: SessionQuery,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), AppError> {
    let session_id = query
        .session
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        })
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(AppError::SessionNotFound)?;

    let session = state
        .sessions
        .lookup(&SessionId::from(session_id))
        .ok_or(AppError::SessionNotFound)?;

    let request: RequestEnvelope =
        serde_json::from_slice(body).map_err(|_| AppError::InvalidBody)?;

    if let Some(response) = handle_json_rpc_request(state, request).await {
        debug!(
            session_id = %session.id(),
            error_reply = is_json_rpc_error(&response),
            "pushing reply"
        );
        session.send(&response, Some(MESSAGE_EVENT));
    }

    Ok(())
}

/// `OPTIONS /sse`: permissive CORS preflight.
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET,POST,OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "content-type,x-session-id"),
        ],
    )
}
