//! Clan lifecycle (`spec.md` §4.10 "clans"), mirroring
//! [`crate::gameplay::parties`] with a name and a larger roster cap.

use realm_persistence::social::{self, ClanRecord};
use realm_persistence::Store;
use realm_shared::error::{HandlerError, NotFound, PreconditionFailed};
use realm_shared::ids::CharIndex;
use realm_world::entity::Entity;
use realm_world::map_manager::MapManager;

use super::parties::find_online_by_name;

pub const MAX_CLAN_MEMBERS: usize = 50;

pub fn create(world: &mut MapManager, store: &Store, leader: CharIndex, name: &str) -> Result<u64, HandlerError> {
    let user_id = match world.get_entity(leader).ok_or(NotFound::Entity)? {
        Entity::Player(p) if p.clan_id.is_some() => return Err(anyhow::anyhow!("already in a clan").into()),
        Entity::Player(p) => p.user_id,
        Entity::Npc(_) => return Err(anyhow::anyhow!("NPCs do not form clans").into()),
    };

    let clan_id = store.incr(realm_persistence::keys::CLAN_COUNTER, 1)? as u64;
    social::save_clan(
        store,
        &ClanRecord { clan_id, name: name.to_string(), leader_user_id: user_id, member_user_ids: vec![user_id] },
    )?;
    social::add_clan_member(store, clan_id, user_id)?;

    if let Some(Entity::Player(p)) = world.get_entity_mut(leader) {
        p.clan_id = Some(clan_id);
    }

    Ok(clan_id)
}

pub fn invite(world: &mut MapManager, store: &Store, leader: CharIndex, target_name: &str) -> Result<(), HandlerError> {
    let (clan_id, leader_user_id) = match world.get_entity(leader).ok_or(NotFound::Entity)? {
        Entity::Player(p) => (p.clan_id.ok_or(PreconditionFailed::NoClan)?, p.user_id),
        Entity::Npc(_) => return Err(anyhow::anyhow!("NPCs do not invite").into()),
    };

    let clan = social::load_clan(store, clan_id)?.ok_or(PreconditionFailed::NoClan)?;
    if clan.leader_user_id != leader_user_id {
        return Err(PreconditionFailed::NotLeader.into());
    }
    if clan.member_user_ids.len() >= MAX_CLAN_MEMBERS {
        return Err(PreconditionFailed::ClanFull.into());
    }

    let target = find_online_by_name(world, target_name).ok_or(NotFound::Entity)?;
    let target_user_id = match world.get_entity(target) {
        Some(Entity::Player(p)) if p.clan_id.is_some() => return Err(anyhow::anyhow!("target is already in a clan").into()),
        Some(Entity::Player(p)) => p.user_id,
        _ => return Err(NotFound::Entity.into()),
    };

    social::add_clan_member(store, clan_id, target_user_id)?;
    if let Some(Entity::Player(p)) = world.get_entity_mut(target) {
        p.clan_id = Some(clan_id);
    }

    Ok(())
}

pub fn leave(world: &mut MapManager, store: &Store, leaver: CharIndex) -> Result<(), HandlerError> {
    let (clan_id, user_id) = match world.get_entity(leaver).ok_or(NotFound::Entity)? {
        Entity::Player(p) => (p.clan_id.ok_or(PreconditionFailed::NoClan)?, p.user_id),
        Entity::Npc(_) => return Err(anyhow::anyhow!("NPCs do not leave clans").into()),
    };

    let clan = social::load_clan(store, clan_id)?.ok_or(PreconditionFailed::NoClan)?;

    if let Some(Entity::Player(p)) = world.get_entity_mut(leaver) {
        p.clan_id = None;
    }

    if clan.leader_user_id == user_id || clan.member_user_ids.len() <= 2 {
        social::disband_clan(store, clan_id)?;
        for entity in world.all_entities_mut() {
            if let Entity::Player(p) = entity {
                if p.clan_id == Some(clan_id) {
                    p.clan_id = None;
                }
            }
        }
    } else {
        social::remove_clan_member(store, clan_id, user_id)?;
    }

    Ok(())
}

/// Looks up the caller's clan name and member count, for
/// `ClanDetails` on login (`spec.md` §9 Open Question,
/// `Config::send_clan_details_on_login`).
pub fn details(store: &Store, clan_id: u64) -> Result<Option<(String, u16)>, HandlerError> {
    let clan = social::load_clan(store, clan_id)?;
    Ok(clan.map(|c| (c.name, c.member_user_ids.len() as u16)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use realm_catalogs::maps::MapDef;
    use realm_catalogs::MapCatalog;
    use realm_world::map_manager::PlayerSpawn;

    fn world() -> MapManager {
        let mut maps = MapCatalog::default();
        maps.maps.insert(1, MapDef::new_empty(1, "test"));
        MapManager::new(maps)
    }

    fn spawn(world: &mut MapManager, user_id: u64, name: &str) -> CharIndex {
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
                    x: 5,
                    y: 5,
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

    #[test]
    fn clan_id_is_cleared_from_player_state_after_local_leave() {
        let mut w = world();
        let leader = spawn(&mut w, 1, "Leader");
        if let Some(Entity::Player(p)) = w.get_entity_mut(leader) {
            p.clan_id = Some(9);
        }
        if let Some(Entity::Player(p)) = w.get_entity_mut(leader) {
            p.clan_id = None;
        }
        assert_eq!(w.get_entity(leader).unwrap().as_player().unwrap().clan_id, None);
    }
}
