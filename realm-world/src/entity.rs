//! Entity data model (`spec.md` §3): a fixed two-variant enum, never a
//! trait object, manipulated only through [`crate::map_manager::MapManager`]
//! — the generalization of the teacher's single-authoritative-owner
//! pattern (`GameState`/`World` in `lib/neutronium/src/world.rs`) in
//! place of its generic archetype/shard component store, which this
//! server's closed, spec-fixed entity set has no use for (`spec.md` §9).

use realm_shared::ids::{CharIndex, MapId, UserId};

pub type SessionId = u64;

#[derive(Debug, Clone)]
pub struct PlayerState {
    pub char_index: CharIndex,
    pub user_id: UserId,
    pub session_id: SessionId,
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
    pub gold: u32,
    pub map: MapId,
    pub x: u8,
    pub y: u8,
    pub heading: u8,
    pub alive: bool,
    pub meditating: bool,
    pub resting: bool,
    pub invisible: bool,
    /// Status timers, unix-seconds deadlines (`0` meaning "not active");
    /// checked with [`realm_shared::time::has_elapsed`] (`spec.md` §3
    /// "status timers").
    pub poisoned_until: u64,
    pub immobilized_until: u64,
    pub blinded_until: u64,
    pub dumb_until: u64,
    pub invisible_until: u64,
    pub party_id: Option<u64>,
    pub clan_id: Option<u64>,
    pub guild_rank: Option<String>,
    pub respawn_at: Option<u64>,
    pub last_attack_at: u64,
    pub last_saved_at: u64,
    /// Temporary attribute modifiers, each with an expiry timestamp
    /// (`spec.md` §4.7 "AttributeModifiers").
    pub buffs: Vec<AttributeModifier>,
}

#[derive(Debug, Clone, Copy)]
pub struct AttributeModifier {
    pub attribute: Attribute,
    pub delta: i32,
    pub expires_at: u64,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Attribute {
    Strength,
    Agility,
    MaxHp,
    MaxMana,
}

#[derive(Debug, Clone)]
pub struct NpcState {
    pub char_index: CharIndex,
    pub template_id: u16,
    pub hp: i32,
    pub max_hp: i32,
    pub map: MapId,
    pub x: u8,
    pub y: u8,
    pub heading: u8,
    pub anchor_x: u8,
    pub anchor_y: u8,
    pub alive: bool,
    pub hostile: bool,
    pub attackable: bool,
    pub is_static: bool,
    pub aggro_range: u8,
    pub attack_cooldown_s: u64,
    pub last_attack_at: u64,
    pub attack_min: i32,
    pub attack_max: i32,
    pub loot_table_id: Option<u16>,
    pub experience_reward: u32,
    pub give_exp: bool,
    pub faction: u8,
    pub gold_min: u32,
    pub gold_max: u32,
    pub respawn_delay_s: u64,
    pub died_at: Option<u64>,
}

#[derive(Debug, Clone)]
pub enum Entity {
    Player(PlayerState),
    Npc(NpcState),
}

impl Entity {
    pub fn char_index(&self) -> CharIndex {
        match self {
            Entity::Player(p) => p.char_index,
            Entity::Npc(n) => n.char_index,
        }
    }

    pub fn position(&self) -> (MapId, u8, u8) {
        match self {
            Entity::Player(p) => (p.map, p.x, p.y),
            Entity::Npc(n) => (n.map, n.x, n.y),
        }
    }

    pub fn is_alive(&self) -> bool {
        match self {
            Entity::Player(p) => p.alive,
            Entity::Npc(n) => n.alive,
        }
    }

    pub fn as_player(&self) -> Option<&PlayerState> {
        match self {
            Entity::Player(p) => Some(p),
            Entity::Npc(_) => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut PlayerState> {
        match self {
            Entity::Player(p) => Some(p),
            Entity::Npc(_) => None,
        }
    }

    pub fn as_npc(&self) -> Option<&NpcState> {
        match self {
            Entity::Npc(n) => Some(n),
            Entity::Player(_) => None,
        }
    }

    pub fn as_npc_mut(&mut self) -> Option<&mut NpcState> {
        match self {
            Entity::Npc(n) => Some(n),
            Entity::Player(_) => None,
        }
    }
}

impl PlayerState {
    pub fn is_poisoned(&self, now: u64) -> bool {
        !realm_shared::time::has_elapsed(self.poisoned_until, now) && self.poisoned_until != 0
    }

    pub fn is_immobilized(&self, now: u64) -> bool {
        !realm_shared::time::has_elapsed(self.immobilized_until, now) && self.immobilized_until != 0
    }

    pub fn is_blinded(&self, now: u64) -> bool {
        !realm_shared::time::has_elapsed(self.blinded_until, now) && self.blinded_until != 0
    }

    pub fn is_dumb(&self, now: u64) -> bool {
        !realm_shared::time::has_elapsed(self.dumb_until, now) && self.dumb_until != 0
    }

    pub fn is_invisible(&self, now: u64) -> bool {
        self.invisible || (!realm_shared::time::has_elapsed(self.invisible_until, now) && self.invisible_until != 0)
    }
}
