//! Registry of live outbound channels, one per connected session
//! (`spec.md` §4.1 "writer task owns a bounded outbound channel").
//! Shared between the connection layer (which registers/unregisters on
//! connect/disconnect) and the world (which looks sessions up to
//! deliver broadcasts).

use crossbeam_channel::Sender;
use hashbrown::HashMap;
use std::sync::Mutex;

use crate::entity::SessionId;

#[derive(Default)]
pub struct SessionRegistry {
    senders: Mutex<HashMap<SessionId, Sender<Vec<u8>>>>,
}

impl SessionRegistry {
    pub fn new() -> SessionRegistry {
        SessionRegistry::default()
    }

    pub fn register(&self, session_id: SessionId, sender: Sender<Vec<u8>>) {
        self.senders.lock().expect("registry lock poisoned").insert(session_id, sender);
    }

    pub fn unregister(&self, session_id: SessionId) {
        self.senders.lock().expect("registry lock poisoned").remove(&session_id);
    }

    /// Enqueues `bytes` for `session_id`. A full outbound buffer
    /// (`try_send` failing) is treated the same as the connection being
    /// gone: delivery is best-effort, the writer thread is responsible
    /// for closing a connection that can't keep up (`spec.md` §4.1).
    pub fn send(&self, session_id: SessionId, bytes: Vec<u8>) -> bool {
        let senders = self.senders.lock().expect("registry lock poisoned");
        match senders.get(&session_id) {
            Some(sender) => sender.try_send(bytes).is_ok(),
            None => false,
        }
    }
}
