//! Translation between the persisted [`PlayerRecord`] and the runtime
//! [`PlayerSpawn`]/[`PlayerState`] shapes. Kept out of `realm-world` and
//! `realm-persistence` since it only exists to join the two at login and
//! checkpoint time — neither crate should know about the other's type.

use realm_persistence::player::PlayerRecord;
use realm_world::entity::PlayerState;
use realm_world::map_manager::PlayerSpawn;

pub fn record_to_spawn(record: &PlayerRecord) -> PlayerSpawn {
    PlayerSpawn {
        user_id: record.user_id,
        name: record.name.clone(),
        class_id: record.class_id,
        level: record.level,
        experience: record.experience,
        hp: record.hp,
        max_hp: record.max_hp,
        mana: record.mana,
        max_mana: record.max_mana,
        stamina: record.stamina,
        max_stamina: record.max_stamina,
        hunger: record.hunger,
        thirst: record.thirst,
        gold: record.gold,
        map: record.map,
        x: record.x,
        y: record.y,
        heading: record.heading,
        alive: record.alive,
        party_id: record.party_id,
        clan_id: record.clan_id,
        guild_rank: record.guild_rank.clone(),
        respawn_at: record.respawn_at,
        last_saved_at: record.last_saved_at,
    }
}

pub fn player_to_record(p: &PlayerState) -> PlayerRecord {
    PlayerRecord {
        user_id: p.user_id,
        name: p.name.clone(),
        class_id: p.class_id,
        level: p.level,
        experience: p.experience,
        hp: p.hp,
        max_hp: p.max_hp,
        mana: p.mana,
        max_mana: p.max_mana,
        stamina: p.stamina,
        max_stamina: p.max_stamina,
        hunger: p.hunger,
        thirst: p.thirst,
        gold: p.gold,
        map: p.map,
        x: p.x,
        y: p.y,
        heading: p.heading,
        alive: p.alive,
        respawn_at: p.respawn_at,
        party_id: p.party_id,
        clan_id: p.clan_id,
        guild_rank: p.guild_rank.clone(),
        last_saved_at: p.last_saved_at,
    }
}
