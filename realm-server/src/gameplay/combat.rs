//! Melee attack glue: resolves the facing tile into a target, hands the
//! roll to `realm_world::combat`, and on a kill rolls loot, gold and
//! experience (`spec.md` §4.10).

use rand::Rng;

use realm_catalogs::{Catalogs, LootTableDef};
use realm_persistence::items::SlotStack;
use realm_persistence::Store;
use realm_protocol::event::MultiMessage;
use realm_protocol::reader::Heading;
use realm_protocol::ServerEvent;
use realm_shared::error::{HandlerError, NotFound, PreconditionFailed};
use realm_shared::ids::{CharIndex, MapId};
use realm_world::broadcast::broadcast_area;
use realm_world::combat::{
    finalize_npc_death, finalize_player_death, is_in_melee_range, require_attackable, resolve_attack,
};
use realm_world::entity::Entity;
use realm_world::map_manager::MapManager;
use realm_world::outbox::Outbox;

const PLAYER_ATTACK_COOLDOWN_S: u64 = 1;
const UNARMED_MIN: i32 = 1;
const UNARMED_MAX: i32 = 5;

/// Resolves a melee `ATTACK` against whatever `attacker` is facing.
pub fn attack(
    world: &mut MapManager,
    store: &Store,
    catalogs: &Catalogs,
    outbox: &mut Outbox,
    attacker: CharIndex,
    now: u64,
) -> Result<(), HandlerError> {
    let (map, ax, ay, heading, alive, last_attack_at) = match world.get_entity(attacker).ok_or(NotFound::Entity)? {
        Entity::Player(p) => (p.map, p.x, p.y, p.heading, p.alive, p.last_attack_at),
        Entity::Npc(_) => return Err(anyhow::anyhow!("NPCs do not issue ATTACK commands").into()),
    };

    if !alive {
        return Err(PreconditionFailed::Dead.into());
    }
    if now.saturating_sub(last_attack_at) < PLAYER_ATTACK_COOLDOWN_S {
        return Err(PreconditionFailed::OnCooldown.into());
    }

    let (dx, dy) = Heading::from_u8(heading).unwrap_or(Heading::South).delta();
    let fx = (ax as i32 + dx).clamp(0, 255) as u8;
    let fy = (ay as i32 + dy).clamp(0, 255) as u8;
    let target = world.entity_index_at(map, fx, fy).ok_or(NotFound::Entity)?;

    require_attackable(world, target)?;
    if !is_in_melee_range(world, attacker, target) {
        return Err(PreconditionFailed::OutOfRange.into());
    }

    if let Some(Entity::Player(p)) = world.get_entity_mut(attacker) {
        p.last_attack_at = now;
    }

    let result = resolve_attack(world, attacker, target, UNARMED_MIN, UNARMED_MAX)?;

    if result.hit {
        broadcast_area(
            world,
            outbox,
            map,
            fx,
            fy,
            &ServerEvent::MultiMessage(MultiMessage::UserHitNpc { char_index: target.get(), damage: result.damage }),
        );
    }

    if result.killed {
        finalize_kill(world, store, catalogs, outbox, attacker, target, map, fx, fy, now)?;
    }

    Ok(())
}

/// Shared by melee kills and damage-spell kills: awards loot/gold/exp for
/// an NPC, or resets and relocates a killed player (`spec.md` §4.10 "on
/// kill of NPC" / "on kill of player").
pub fn finalize_kill(
    world: &mut MapManager,
    store: &Store,
    catalogs: &Catalogs,
    outbox: &mut Outbox,
    attacker: CharIndex,
    target: CharIndex,
    map: MapId,
    x: u8,
    y: u8,
    now: u64,
) -> Result<(), HandlerError> {
    let is_npc = matches!(world.get_entity(target), Some(Entity::Npc(_)));

    if is_npc {
        let (experience_reward, gold_min, gold_max, loot_table_id, give_exp) = match world.get_entity(target) {
            Some(Entity::Npc(n)) => (n.experience_reward, n.gold_min, n.gold_max, n.loot_table_id, n.give_exp),
            _ => unreachable!("checked above"),
        };

        finalize_npc_death(world, target, now);
        broadcast_area(world, outbox, map, x, y, &ServerEvent::MultiMessage(MultiMessage::NpcKilled { char_index: target.get() }));
        broadcast_area(world, outbox, map, x, y, &ServerEvent::CharacterRemove { char_index: target.get() });

        let mut rng = rand::thread_rng();
        let gold = if gold_max > gold_min { rng.gen_range(gold_min..=gold_max) } else { gold_min };
        let loot = loot_table_id.and_then(|id| catalogs.loot_tables.get(id)).and_then(roll_loot);

        let mut level_up_event: Option<(u64, u16)> = None;
        if let Some(Entity::Player(p)) = world.get_entity_mut(attacker) {
            p.gold = p.gold.saturating_add(gold);
            if give_exp {
                p.experience = p.experience.saturating_add(experience_reward as u64);
                if let Some(new_level) = level_up(p) {
                    level_up_event = Some((p.session_id, new_level));
                }
            }
        }
        if let Some(Entity::Player(p)) = world.get_entity(attacker) {
            outbox.push(p.session_id, ServerEvent::UpdateGold { gold: p.gold }.encode());
        }
        if let Some((session_id, new_level)) = level_up_event {
            outbox.push(session_id, ServerEvent::MultiMessage(MultiMessage::LevelUp { new_level }).encode());
        }

        if let Some(stack) = loot {
            if world.add_ground_item(map, x, y, stack).is_ok() {
                let _ = realm_persistence::ground::set(store, map, x, y, stack);
                broadcast_area(world, outbox, map, x, y, &ServerEvent::ObjectCreate { x, y, item_id: stack.item_id });
            }
        }
    } else {
        let death_location = world.death_location(map);
        finalize_player_death(world, target, death_location)?;
        broadcast_area(world, outbox, map, x, y, &ServerEvent::MultiMessage(MultiMessage::UserKilled { char_index: target.get() }));
        if let Some(Entity::Player(p)) = world.get_entity(target) {
            outbox.push(
                p.session_id,
                ServerEvent::UpdateUserStats {
                    hp: p.hp,
                    max_hp: p.max_hp,
                    mana: p.mana,
                    max_mana: p.max_mana,
                    stamina: p.stamina,
                    max_stamina: p.max_stamina,
                }
                .encode(),
            );
        }
    }

    Ok(())
}

fn level_up(p: &mut realm_world::entity::PlayerState) -> Option<u16> {
    let mut leveled = None;
    while p.experience >= experience_for_next_level(p.level) {
        p.level += 1;
        p.max_hp += 10;
        p.max_mana += 5;
        p.hp = p.max_hp;
        p.mana = p.max_mana;
        leveled = Some(p.level);
    }
    leveled
}

fn experience_for_next_level(level: u16) -> u64 {
    level as u64 * 1000
}

fn roll_loot(table: &LootTableDef) -> Option<SlotStack> {
    let mut rng = rand::thread_rng();
    for entry in &table.entries {
        if rng.gen::<f32>() < entry.chance {
            let qty = if entry.qty_max > entry.qty_min {
                rng.gen_range(entry.qty_min..=entry.qty_max)
            } else {
                entry.qty_min
            };
            return Some(SlotStack { item_id: entry.item_id, qty });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use realm_catalogs::npcs::LootEntry;
    use realm_world::entity::PlayerState;

    fn test_player() -> PlayerState {
        PlayerState {
            char_index: CharIndex::new(1),
            user_id: 1,
            session_id: 1,
            name: "Hero".into(),
            class_id: 0,
            level: 1,
            experience: 0,
            hp: 50,
            max_hp: 50,
            mana: 20,
            max_mana: 20,
            stamina: 100,
            max_stamina: 100,
            hunger: 100,
            thirst: 100,
            gold: 0,
            map: 1,
            x: 1,
            y: 1,
            heading: 0,
            alive: true,
            meditating: false,
            resting: false,
            invisible: false,
            poisoned_until: 0,
            immobilized_until: 0,
            blinded_until: 0,
            dumb_until: 0,
            invisible_until: 0,
            party_id: None,
            clan_id: None,
            guild_rank: None,
            respawn_at: None,
            last_attack_at: 0,
            last_saved_at: 0,
            buffs: Vec::new(),
        }
    }

    #[test]
    fn experience_for_next_level_scales_with_level() {
        assert_eq!(experience_for_next_level(1), 1000);
        assert_eq!(experience_for_next_level(5), 5000);
    }

    #[test]
    fn level_up_crosses_every_threshold_the_total_experience_clears() {
        // level_up compares total (non-decrementing) experience against
        // `level * 1000` each pass, so a big enough total cascades
        // through every level whose threshold it still clears.
        let mut p = test_player();
        p.experience = 2500;
        let new_level = level_up(&mut p);
        assert_eq!(new_level, Some(3));
        assert_eq!(p.level, 3);
        assert_eq!(p.hp, p.max_hp);
        assert_eq!(p.mana, p.max_mana);
    }

    #[test]
    fn level_up_stops_at_the_first_threshold_above_total_experience() {
        let mut p = test_player();
        p.experience = 6000;
        let new_level = level_up(&mut p);
        assert_eq!(new_level, Some(7));
        assert_eq!(p.level, 7);
    }

    #[test]
    fn level_up_is_none_below_threshold() {
        let mut p = test_player();
        p.experience = 10;
        assert_eq!(level_up(&mut p), None);
        assert_eq!(p.level, 1);
    }

    #[test]
    fn roll_loot_picks_guaranteed_entry() {
        let table = LootTableDef { id: 1, entries: vec![LootEntry { item_id: 42, chance: 1.0, qty_min: 1, qty_max: 1 }] };
        let stack = roll_loot(&table).expect("chance 1.0 always rolls");
        assert_eq!(stack.item_id, 42);
        assert_eq!(stack.qty, 1);
    }

    #[test]
    fn roll_loot_never_rolls_a_zero_chance_entry() {
        let table = LootTableDef { id: 1, entries: vec![LootEntry { item_id: 7, chance: 0.0, qty_min: 1, qty_max: 1 }] };
        assert!(roll_loot(&table).is_none());
    }

    #[test]
    fn roll_loot_empty_table_yields_nothing() {
        let table = LootTableDef { id: 1, entries: vec![] };
        assert!(roll_loot(&table).is_none());
    }
}
