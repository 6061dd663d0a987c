//! Error taxonomy from `spec.md` §7, shaped after the teacher's
//! `NetworkError { Wait, Fatal(ErrorType) }` split
//! (`lib/flux/src/shared.rs`): every error here is either something a
//! handler recovers from and reports to the client, or something that
//! tears the connection down.

use thiserror::Error;

/// Malformed frame, unknown opcode, or a field out of its declared range.
/// Always fatal to the connection (`spec.md` §4.2, §7).
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ProtocolError {
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),
    #[error("declared field length {declared} exceeds {remaining} remaining bytes")]
    LengthUnderflow { declared: usize, remaining: usize },
    #[error("string field exceeds maximum length {max}")]
    StringTooLong { max: usize },
    #[error("value {value} out of range {min}..={max}")]
    OutOfRange { value: i64, min: i64, max: i64 },
    #[error("invalid string encoding")]
    InvalidEncoding,
    #[error("unexpected end of frame")]
    Truncated,
}

/// Authentication failures. Bad credentials keep the session open for a
/// rate-limited retry; everything else is effectively a protocol error
/// from the client's point of view.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum AuthError {
    #[error("unknown account")]
    UnknownAccount,
    #[error("incorrect password")]
    BadCredentials,
    #[error("session not authenticated")]
    NotAuthenticated,
    #[error("privileged operation requires authentication")]
    PrivilegeRequired,
    #[error("too many login attempts, try again later")]
    RateLimited,
}

/// Gameplay rule not satisfied. Reported to the client as a `CONSOLE_MSG`
/// and the session continues (`spec.md` §4.3, §7).
#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum PreconditionFailed {
    #[error("you are dead")]
    Dead,
    #[error("target out of range")]
    OutOfRange,
    #[error("ability is on cooldown")]
    OnCooldown,
    #[error("inventory is full")]
    InventoryFull,
    #[error("not enough gold")]
    InsufficientGold,
    #[error("not enough items")]
    InsufficientItems,
    #[error("target is not attackable")]
    NotAttackable,
    #[error("tile is blocked")]
    Blocked,
    #[error("you are not in a party")]
    NoParty,
    #[error("you are not in a clan")]
    NoClan,
    #[error("party is full")]
    PartyFull,
    #[error("clan is full")]
    ClanFull,
    #[error("only the leader can do that")]
    NotLeader,
    #[error("that command is not available")]
    NotAvailable,
}

/// Concurrent mutation detected while staging a commit (e.g. the
/// destination tile was claimed by someone else between validation and
/// commit). Retried at most once by the caller; if it still conflicts,
/// surfaces as a `CONSOLE_MSG` (`spec.md` §4.4, §7).
#[derive(Debug, Error, Eq, PartialEq)]
pub enum Conflict {
    #[error("tile {0:?} is occupied")]
    TileOccupied((u16, u8, u8)),
    #[error("ground item at {0:?} already taken")]
    GroundItemGone((u16, u8, u8)),
}

/// Transient or permanent failure talking to the KV store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("transient store error: {0}")]
    Transient(String),
    #[error("permanent store error: {0}")]
    Permanent(String),
}

/// Target entity vanished between validation and use (disconnected,
/// already dead, already despawned).
#[derive(Debug, Error, Eq, PartialEq)]
pub enum NotFound {
    #[error("entity not found")]
    Entity,
    #[error("session not found")]
    Session,
    #[error("item not found")]
    Item,
}

/// Aggregate error type returned by command handlers (`spec.md` §4.3).
/// Handlers never raise across the dispatch boundary: every fallible
/// handler returns `Result<(), HandlerError>` and dispatch decides the
/// user-facing consequence.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Precondition(#[from] PreconditionFailed),
    #[error(transparent)]
    Conflict(#[from] Conflict),
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl HandlerError {
    /// Whether this error must close the connection rather than just
    /// report a console message (`spec.md` §7 propagation policy).
    pub fn is_fatal(&self) -> bool {
        matches!(self, HandlerError::Protocol(_))
    }

    /// Short, localized, stack-trace-free reason suitable to show a
    /// player (`spec.md` §7 "user-visible failures").
    pub fn console_message(&self) -> String {
        match self {
            HandlerError::Protocol(_) => "protocol error".to_string(),
            HandlerError::Auth(e) => e.to_string(),
            HandlerError::Precondition(e) => e.to_string(),
            HandlerError::Conflict(_) => "that action could not be completed, try again".to_string(),
            HandlerError::NotFound(_) => "target is gone".to_string(),
            HandlerError::Persistence(_) => "server is busy, try again".to_string(),
            HandlerError::Internal(_) => "an internal error occurred".to_string(),
        }
    }
}
