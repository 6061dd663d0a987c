//! Infrastructure shared by every `realm-*` crate: logging, time, ids,
//! configuration and the error taxonomy from the error handling design.

pub mod config;
pub mod error;
pub mod ids;
pub mod logging;
pub mod time;

/// Wire protocol version. Bump on any incompatible change to the opcode
/// schema so mismatched clients are rejected during the handshake.
pub const PROTOCOL_VERSION: u16 = 1;

/// Default tick period for the simulation scheduler (§4.7).
pub const DEFAULT_TICK_MS: u64 = 500;
