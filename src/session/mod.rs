//! Transport-independent sessions
//!
//! A [`Session`] wraps whichever transport binding accepted the connection
//! behind the [`SessionTransport`] capability (send, close, closed). The
//! dispatcher and tools only ever see a `Session`.

pub mod registry;

use std::{fmt, sync::Arc, time::Duration};

use chrono::Utc;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

pub use registry::SessionRegistry;

/// Event tag for protocol envelopes on tagged transports.
pub const MESSAGE_EVENT: &str = "message";
/// Event tag for heartbeats, kept apart from protocol traffic.
pub const PING_EVENT: &str = "ping";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session transport is closed")]
    Closed,
}

/// Capability a transport binding supplies for outbound traffic.
pub trait SessionTransport: Send + Sync {
    /// Pushes one serialized message. `event` labels it on transports that tag events.
    fn send(&self, payload: String, event: Option<&str>) -> Result<(), SessionError>;
    fn close(&self);
    fn is_closed(&self) -> bool;
}

pub struct Session {
    id: SessionId,
    transport: Box<dyn SessionTransport>,
    shutdown: CancellationToken,
}

impl Session {
    pub fn new(id: SessionId, transport: Box<dyn SessionTransport>) -> Self {
        Self {
            id,
            transport,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Pushes a message. Sends to a closed session are dropped; returns whether it was queued.
    pub fn send(&self, message: &Value, event: Option<&str>) -> bool {
        if self.is_closed() {
            debug!(session_id = %self.id, "dropping message for closed session");
            return false;
        }

        match self.transport.send(message.to_string(), event) {
            Ok(()) => true,
            Err(err) => {
                debug!(session_id = %self.id, error = %err, "dropping message for closed session");
                false
            }
        }
    }

    pub fn close(&self) {
        self.shutdown.cancel();
        self.transport.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.transport.is_closed()
    }

    /// Cancelled when the session is closed or evicted from the registry.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Starts a periodic `ping` push that stops with the session.
    pub fn spawn_heartbeat(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let session = Arc::clone(self);
        let shutdown = self.shutdown_token();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let beat = json!({ "ts": Utc::now().timestamp_millis() });
                        if !session.send(&beat, Some(PING_EVENT)) {
                            break;
                        }
                        trace!(session_id = %session.id, "sent heartbeat");
                    }
                }
            }
        })
    }
}
