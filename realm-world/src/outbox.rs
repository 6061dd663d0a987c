//! Buffers encoded events produced while the world lock is held, so
//! they can be flushed to the registry after the lock is released
//! (`spec.md` §4.7 "broadcast events generated during a tick are
//! flushed after the tick completes").

use std::sync::Arc;

use crate::entity::SessionId;
use crate::registry::SessionRegistry;

pub struct Outbox {
    registry: Arc<SessionRegistry>,
    pending: Vec<(SessionId, Vec<u8>)>,
}

impl Outbox {
    pub fn new(registry: Arc<SessionRegistry>) -> Outbox {
        Outbox { registry, pending: Vec::new() }
    }

    pub fn push(&mut self, session_id: SessionId, bytes: Vec<u8>) {
        self.pending.push((session_id, bytes));
    }

    pub fn push_many(&mut self, session_ids: impl IntoIterator<Item = SessionId>, bytes: Vec<u8>) {
        for session_id in session_ids {
            self.pending.push((session_id, bytes.clone()));
        }
    }

    pub fn flush(self) {
        for (session_id, bytes) in self.pending {
            self.registry.send(session_id, bytes);
        }
    }
}

impl Default for Outbox {
    /// An outbox with no registry silently drops everything pushed to
    /// it. Only used by tests that don't exercise delivery.
    fn default() -> Outbox {
        Outbox { registry: Arc::new(SessionRegistry::new()), pending: Vec::new() }
    }
}
