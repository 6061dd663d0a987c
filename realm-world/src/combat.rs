//! Core attack resolution (`spec.md` §4.10). Lives here rather than in
//! `realm-server`'s gameplay collaborators because it mutates
//! `MapManager` state directly under the world lock — the network-facing
//! parts (command validation, session lookup) are the collaborator's
//! job, but the actual HP/occupancy/ground-item mutation belongs next
//! to the state it mutates, same as the teacher keeps state mutation
//! inside `World`/`GameState` rather than in its network layer.

use rand::Rng;

use realm_shared::error::{HandlerError, PreconditionFailed};
use realm_shared::ids::CharIndex;

use crate::entity::Entity;
use crate::map_manager::MapManager;

#[derive(Debug, Clone, Copy)]
pub struct AttackResult {
    pub hit: bool,
    pub damage: i32,
    pub target_new_hp: i32,
    pub killed: bool,
}

const BASE_HIT_CHANCE: f32 = 0.8;

/// Resolves one melee attack from `attacker` against `target`.
/// Preconditions (attacker alive, melee range, target attackable,
/// cooldown elapsed) are validated by the caller; this only does the
/// roll and the HP mutation.
pub fn resolve_attack(
    world: &mut MapManager,
    attacker: CharIndex,
    target: CharIndex,
    attack_min: i32,
    attack_max: i32,
) -> Result<AttackResult, HandlerError> {
    let mut rng = rand::thread_rng();
    let hit = rng.gen::<f32>() < BASE_HIT_CHANCE;

    if !hit {
        return Ok(AttackResult { hit: false, damage: 0, target_new_hp: current_hp(world, target)?, killed: false });
    }

    let damage = if attack_max > attack_min {
        rng.gen_range(attack_min..=attack_max)
    } else {
        attack_min
    };

    let entity = world
        .get_entity_mut(target)
        .ok_or(realm_shared::error::NotFound::Entity)?;
    let (new_hp, killed) = apply_damage(entity, damage);

    let _ = attacker;
    Ok(AttackResult { hit: true, damage, target_new_hp: new_hp, killed })
}

fn current_hp(world: &MapManager, target: CharIndex) -> Result<i32, HandlerError> {
    let entity = world
        .get_entity(target)
        .ok_or(realm_shared::error::NotFound::Entity)?;
    Ok(match entity {
        Entity::Player(p) => p.hp,
        Entity::Npc(n) => n.hp,
    })
}

fn apply_damage(entity: &mut Entity, damage: i32) -> (i32, bool) {
    match entity {
        Entity::Player(p) => {
            p.hp = (p.hp - damage).max(0);
            if p.hp == 0 {
                p.alive = false;
            }
            (p.hp, p.hp == 0)
        }
        Entity::Npc(n) => {
            n.hp = (n.hp - damage).max(0);
            if n.hp == 0 {
                n.alive = false;
            }
            (n.hp, n.hp == 0)
        }
    }
}

/// Resets a killed player's status per `spec.md` §4.10 "On kill of
/// player": dead, zero HP/stamina, clear status effects, optionally
/// teleport to the map's death location.
pub fn finalize_player_death(
    world: &mut MapManager,
    target: CharIndex,
    death_location: Option<(u16, u8, u8)>,
) -> Result<(), HandlerError> {
    if let Some(entity) = world.get_entity_mut(target) {
        if let Entity::Player(p) = entity {
            p.alive = false;
            p.hp = 0;
            p.stamina = 0;
            p.meditating = false;
            p.invisible = false;
            p.buffs.clear();
        }
    }

    if let Some((map, x, y)) = death_location {
        if world.can_move_to(map, x, y) {
            world.move_entity(target, map, x, y)?;
        }
    }

    Ok(())
}

/// Arms an NPC's respawn timer and frees its tile, keeping the entity
/// record itself so `RespawnTimers` can revive it in place
/// (`spec.md` §4.10 "On kill of NPC" / §4.7 "RespawnTimers").
pub fn finalize_npc_death(world: &mut MapManager, target: CharIndex, now: u64) {
    if let Some(entity) = world.get_entity_mut(target) {
        if let Entity::Npc(n) = entity {
            n.alive = false;
            n.died_at = Some(now);
        }
    }
    world.vacate_tile(target);
}

pub fn is_in_melee_range(world: &MapManager, a: CharIndex, b: CharIndex) -> bool {
    let (Some(pa), Some(pb)) = (world.get_entity(a), world.get_entity(b)) else {
        return false;
    };
    let (map_a, xa, ya) = pa.position();
    let (map_b, xb, yb) = pb.position();
    map_a == map_b && ((xa as i32 - xb as i32).abs() + (ya as i32 - yb as i32).abs()) == 1
}

pub fn require_attackable(world: &MapManager, target: CharIndex) -> Result<(), HandlerError> {
    match world.get_entity(target) {
        Some(Entity::Npc(n)) if !n.attackable => Err(PreconditionFailed::NotAttackable.into()),
        Some(_) => Ok(()),
        None => Err(realm_shared::error::NotFound::Entity.into()),
    }
}
