//! Per-connection session state (`spec.md` §3 "Session", §4.1). Indexed
//! by `session_id`; a `Session`'s own `Mutex` serializes the commands
//! of one connection the same way the teacher serializes per-channel
//! state (`lib/flux/src/session.rs`), satisfying §5's "per-connection
//! command order is preserved" via a per-session lock rather than a
//! session-affinity hint into the worker pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use hashbrown::HashMap;

use realm_shared::ids::CharIndex;

pub type SessionId = u64;

/// What a session is doing beyond plain movement/chat — tracked so
/// commerce and banking handlers can validate "you must have started a
/// trade with this merchant first" without a separate state machine
/// crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Trading { merchant: CharIndex },
}

pub struct Session {
    pub session_id: SessionId,
    pub user_id: Option<u64>,
    pub char_index: Option<CharIndex>,
    pub login_attempts: u32,
    pub created_at: u64,
    pub last_activity_at: u64,
    pub activity: Activity,
}

impl Session {
    fn new(session_id: SessionId, now: u64) -> Session {
        Session {
            session_id,
            user_id: None,
            char_index: None,
            login_attempts: 0,
            created_at: now,
            last_activity_at: now,
            activity: Activity::Idle,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Issues unique session ids and owns every live [`Session`], one
/// `Mutex` each so dispatch for a given connection is always
/// single-threaded regardless of which worker thread picks up its next
/// command.
#[derive(Default)]
pub struct SessionTable {
    next_id: AtomicU64,
    sessions: Mutex<HashMap<SessionId, std::sync::Arc<Mutex<Session>>>>,
}

impl SessionTable {
    pub fn new() -> SessionTable {
        SessionTable { next_id: AtomicU64::new(1), sessions: Mutex::new(HashMap::new()) }
    }

    pub fn create(&self, now: u64) -> SessionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut table = self.sessions.lock().expect("session table poisoned");
        table.insert(id, std::sync::Arc::new(Mutex::new(Session::new(id, now))));
        id
    }

    pub fn remove(&self, session_id: SessionId) -> Option<std::sync::Arc<Mutex<Session>>> {
        self.sessions.lock().expect("session table poisoned").remove(&session_id)
    }

    pub fn get(&self, session_id: SessionId) -> Option<std::sync::Arc<Mutex<Session>>> {
        self.sessions.lock().expect("session table poisoned").get(&session_id).cloned()
    }
}
