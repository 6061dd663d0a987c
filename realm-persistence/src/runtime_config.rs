//! Live-tunable effect parameters and server flags (`spec.md` §4.9
//! `config:effects:*`, `server:*` key categories). These override the
//! startup TOML config without a restart; operators poke them directly
//! in the KV store.

use realm_shared::error::HandlerError;

use crate::keys;
use crate::store::Store;

/// Reads a numeric effect override, falling back to `default` if unset
/// or malformed.
pub fn effect_override(store: &Store, name: &str, default: u64) -> Result<u64, HandlerError> {
    match store.hget(&keys::config_effects(name), "value")? {
        Some(raw) => Ok(raw.parse().unwrap_or(default)),
        None => Ok(default),
    }
}

pub fn set_effect_override(store: &Store, name: &str, value: u64) -> Result<(), HandlerError> {
    store.hset(&keys::config_effects(name), "value", &value.to_string())?;
    Ok(())
}

/// Server-wide flag (e.g. a maintenance/read-only mode toggle).
pub fn server_flag(store: &Store, name: &str) -> Result<bool, HandlerError> {
    Ok(store.hget(&keys::server(name), "value")?.as_deref() == Some("1"))
}

pub fn set_server_flag(store: &Store, name: &str, value: bool) -> Result<(), HandlerError> {
    store.hset(&keys::server(name), "value", if value { "1" } else { "0" })?;
    Ok(())
}
