//! Account creation and login (`spec.md` §4.1 "Connect / Login").

use realm_shared::error::{AuthError, HandlerError};

use crate::credentials::{hash_password, verify_password};
use crate::keys;
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub user_id: u64,
    pub password_hash: String,
}

/// Looks up `name` and returns its account record, or `None` if the
/// account does not exist.
pub fn find(store: &Store, name: &str) -> Result<Option<AccountRecord>, HandlerError> {
    let fields = store.hget_all(&keys::account(name))?;
    if fields.is_empty() {
        return Ok(None);
    }
    let user_id = fields
        .get("user_id")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| anyhow::anyhow!("corrupt account record for {name}"))?;
    let password_hash = fields
        .get("password_hash")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("corrupt account record for {name}"))?;
    Ok(Some(AccountRecord { user_id, password_hash }))
}

/// Authenticates `name`/`password`, returning the account's user id.
pub fn login(store: &Store, name: &str, password: &str) -> Result<u64, HandlerError> {
    let record = find(store, name)?.ok_or(AuthError::UnknownAccount)?;
    if !verify_password(password, &record.password_hash) {
        return Err(AuthError::BadCredentials.into());
    }
    Ok(record.user_id)
}

/// Creates a new account, allocating the next user id from
/// `accounts:counter`. Returns [`AuthError::UnknownAccount`]'s sibling
/// precondition-style error if the name is already taken.
pub fn create(store: &Store, name: &str, password: &str) -> Result<u64, HandlerError> {
    if store.exists(&keys::account(name))? {
        return Err(anyhow::anyhow!("account {name} already exists").into());
    }
    let user_id = store.incr(keys::ACCOUNTS_COUNTER, 1)? as u64;
    let hash = hash_password(password);
    store.hset(&keys::account(name), "user_id", &user_id.to_string())?;
    store.hset(&keys::account(name), "password_hash", &hash)?;
    Ok(user_id)
}
