//! Party lifecycle (`spec.md` §4.10 "parties"): create, invite, leave,
//! with auto-disband when the leader leaves or membership drops to one.

use realm_persistence::social::{self, PartyRecord};
use realm_persistence::Store;
use realm_shared::error::{HandlerError, NotFound, PreconditionFailed};
use realm_shared::ids::CharIndex;
use realm_world::entity::Entity;
use realm_world::map_manager::MapManager;

pub const MAX_PARTY_MEMBERS: usize = 5;

/// Finds the online player character named `name`, case-sensitive
/// (`spec.md` §3 "character names are unique").
pub fn find_online_by_name(world: &MapManager, name: &str) -> Option<CharIndex> {
    world
        .all_entities()
        .find_map(|e| e.as_player().filter(|p| p.name == name).map(|p| p.char_index))
}

pub fn create(world: &mut MapManager, store: &Store, leader: CharIndex) -> Result<u64, HandlerError> {
    let user_id = match world.get_entity(leader).ok_or(NotFound::Entity)? {
        Entity::Player(p) if p.party_id.is_some() => return Err(anyhow::anyhow!("already in a party").into()),
        Entity::Player(p) => p.user_id,
        Entity::Npc(_) => return Err(anyhow::anyhow!("NPCs do not form parties").into()),
    };

    let party_id = store.incr(realm_persistence::keys::PARTY_COUNTER, 1)? as u64;
    social::save_party(store, &PartyRecord { party_id, leader_user_id: user_id, member_user_ids: vec![user_id] })?;
    social::add_party_member(store, party_id, user_id)?;

    if let Some(Entity::Player(p)) = world.get_entity_mut(leader) {
        p.party_id = Some(party_id);
    }

    Ok(party_id)
}

pub fn invite(world: &mut MapManager, store: &Store, leader: CharIndex, target_name: &str) -> Result<(), HandlerError> {
    let (party_id, leader_user_id) = match world.get_entity(leader).ok_or(NotFound::Entity)? {
        Entity::Player(p) => (p.party_id.ok_or(PreconditionFailed::NoParty)?, p.user_id),
        Entity::Npc(_) => return Err(anyhow::anyhow!("NPCs do not invite").into()),
    };

    let party = social::load_party(store, party_id)?.ok_or(PreconditionFailed::NoParty)?;
    if party.leader_user_id != leader_user_id {
        return Err(PreconditionFailed::NotLeader.into());
    }
    if party.member_user_ids.len() >= MAX_PARTY_MEMBERS {
        return Err(PreconditionFailed::PartyFull.into());
    }

    let target = find_online_by_name(world, target_name).ok_or(NotFound::Entity)?;
    let target_user_id = match world.get_entity(target) {
        Some(Entity::Player(p)) if p.party_id.is_some() => return Err(anyhow::anyhow!("target is already in a party").into()),
        Some(Entity::Player(p)) => p.user_id,
        _ => return Err(NotFound::Entity.into()),
    };

    social::add_party_member(store, party_id, target_user_id)?;
    if let Some(Entity::Player(p)) = world.get_entity_mut(target) {
        p.party_id = Some(party_id);
    }

    Ok(())
}

/// Removes `leaver` from their party. Disbands it outright if the
/// leader leaves, or if removing the member leaves nobody behind.
pub fn leave(world: &mut MapManager, store: &Store, leaver: CharIndex) -> Result<(), HandlerError> {
    let (party_id, user_id) = match world.get_entity(leaver).ok_or(NotFound::Entity)? {
        Entity::Player(p) => (p.party_id.ok_or(PreconditionFailed::NoParty)?, p.user_id),
        Entity::Npc(_) => return Err(anyhow::anyhow!("NPCs do not leave parties").into()),
    };

    let party = social::load_party(store, party_id)?.ok_or(PreconditionFailed::NoParty)?;

    if let Some(Entity::Player(p)) = world.get_entity_mut(leaver) {
        p.party_id = None;
    }

    if party.leader_user_id == user_id || party.member_user_ids.len() <= 2 {
        social::disband_party(store, party_id)?;
        for entity in world.all_entities_mut() {
            if let Entity::Player(p) = entity {
                if p.party_id == Some(party_id) {
                    p.party_id = None;
                }
            }
        }
    } else {
        social::remove_party_member(store, party_id, user_id)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use realm_catalogs::maps::MapDef;
    use realm_catalogs::MapCatalog;
    use realm_world::map_manager::PlayerSpawn;

    fn spawn(world: &mut MapManager, user_id: u64, name: &str, x: u8, y: u8) -> CharIndex {
        world
            .add_player(
                user_id,
                PlayerSpawn {
                    user_id,
                    name: name.into(),
                    class_id: 0,
                    level: 1,
                    experience: 0,
                    hp: 50,
                    max_hp: 50,
                    mana: 0,
                    max_mana: 0,
                    stamina: 100,
                    max_stamina: 100,
                    hunger: 100,
                    thirst: 100,
                    gold: 0,
                    map: 1,
                    x,
                    y,
                    heading: 0,
                    alive: true,
                    party_id: None,
                    clan_id: None,
                    guild_rank: None,
                    respawn_at: None,
                    last_saved_at: 0,
                },
            )
            .unwrap()
            .0
    }

    fn world() -> MapManager {
        let mut maps = MapCatalog::default();
        maps.maps.insert(1, MapDef::new_empty(1, "test"));
        MapManager::new(maps)
    }

    #[test]
    fn find_online_by_name_matches_exact_name() {
        let mut w = world();
        spawn(&mut w, 1, "Hero", 5, 5);
        assert!(find_online_by_name(&w, "Hero").is_some());
        assert!(find_online_by_name(&w, "Nobody").is_none());
    }
}
