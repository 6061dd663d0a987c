//! Player character persistence (`spec.md` §3 "Player", §4.9).
//!
//! A player's mutable state is small enough, and always read/written as
//! a unit (login load, periodic checkpoint, logout save), to store as a
//! single JSON blob under `player:{user_id}` rather than splitting it
//! across many hash fields; inventory, bank and spellbook get their own
//! keys because they're read and mutated independently of the rest of
//! the record.

use serde::{Deserialize, Serialize};

use realm_catalogs::ClassDef;
use realm_shared::error::HandlerError;

use crate::keys;
use crate::store::Store;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub user_id: u64,
    pub name: String,
    pub class_id: u8,
    pub level: u16,
    pub experience: u64,
    pub hp: i32,
    pub max_hp: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub stamina: i32,
    pub max_stamina: i32,
    pub hunger: u8,
    pub thirst: u8,
    /// `0..=2^31-1` (`spec.md` §3 supplement).
    pub gold: u32,
    pub map: u16,
    pub x: u8,
    pub y: u8,
    pub heading: u8,
    pub alive: bool,
    pub respawn_at: Option<u64>,
    pub party_id: Option<u64>,
    pub clan_id: Option<u64>,
    pub guild_rank: Option<String>,
    pub last_saved_at: u64,
}

impl PlayerRecord {
    pub fn new(user_id: u64, name: String, class: &ClassDef) -> PlayerRecord {
        PlayerRecord {
            user_id,
            name,
            class_id: class.id,
            level: 1,
            experience: 0,
            hp: class.base_hp,
            max_hp: class.base_hp,
            mana: class.base_mana,
            max_mana: class.base_mana,
            stamina: 100,
            max_stamina: 100,
            hunger: 100,
            thirst: 100,
            gold: 0,
            map: class.starting_map,
            x: class.starting_x,
            y: class.starting_y,
            heading: 0,
            alive: true,
            respawn_at: None,
            party_id: None,
            clan_id: None,
            guild_rank: None,
            last_saved_at: 0,
        }
    }
}

/// Loads a player record, returning `None` for a brand-new account that
/// has not created a character yet.
pub fn load(store: &Store, user_id: u64) -> Result<Option<PlayerRecord>, HandlerError> {
    let raw = store.hget(&keys::player(user_id), "data")?;
    match raw {
        Some(raw) => {
            let record = serde_json::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("corrupt player record for {user_id}: {e}"))?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

pub fn save(store: &Store, record: &PlayerRecord) -> Result<(), HandlerError> {
    let raw = serde_json::to_string(record)
        .map_err(|e| anyhow::anyhow!("failed to serialize player record: {e}"))?;
    store.hset(&keys::player(record.user_id), "data", &raw)?;
    Ok(())
}
