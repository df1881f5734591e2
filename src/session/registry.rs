use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use super::{Session, SessionId, SessionTransport};

/// Process-wide table of live sessions.
///
/// Every entry belongs to a transport that still accepts pushes: closed
/// sessions are evicted on lookup and `remove` closes what it evicts.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an identifier, wraps the transport and stores the session.
    pub fn create(&self, transport: impl SessionTransport + 'static) -> Arc<Session> {
        let id = SessionId::generate();
        let session = Arc::new(Session::new(id.clone(), Box::new(transport)));
        self.sessions.insert(id.clone(), Arc::clone(&session));
        info!(session_id = %id, active = self.sessions.len(), "session opened");
        session
    }

    pub fn lookup(&self, id: &SessionId) -> Option<Arc<Session>> {
        let session = self.sessions.get(id).map(|entry| Arc::clone(entry.value()))?;
        if session.is_closed() {
            self.remove(id);
            return None;
        }
        Some(session)
    }

    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        let (_, session) = self.sessions.remove(id)?;
        session.close();
        info!(session_id = %id, active = self.sessions.len(), "session closed");
        Some(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
