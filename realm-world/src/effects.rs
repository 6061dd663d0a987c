//! The six periodic player-status effects registered alongside
//! [`crate::ai::NpcAiEffect`] (`spec.md` §4.7, items 1-4, 6-7).

use realm_persistence::Store;
use realm_protocol::event::MultiMessage;
use realm_protocol::ServerEvent;
use realm_shared::config::EffectsSection;
use realm_shared::ids::{CharIndex, MapId};

use crate::combat::finalize_player_death;
use crate::entity::Entity;
use crate::map_manager::MapManager;
use crate::outbox::Outbox;
use crate::tick::Effect;

pub struct HungerThirstEffect {
    interval_s: u64,
}

impl HungerThirstEffect {
    pub fn new(cfg: &EffectsSection) -> HungerThirstEffect {
        HungerThirstEffect { interval_s: cfg.hunger_thirst_interval_s }
    }
}

impl Effect for HungerThirstEffect {
    fn apply(&mut self, world: &mut MapManager, _store: &Store, outbox: &mut Outbox, _now: u64) -> anyhow::Result<()> {
        let mut notices = Vec::new();
        let mut starved: Vec<(CharIndex, MapId)> = Vec::new();
        for entity in world.all_entities_mut() {
            let Entity::Player(p) = entity else { continue };
            if !p.alive {
                continue;
            }
            p.hunger = p.hunger.saturating_sub(1);
            p.thirst = p.thirst.saturating_sub(1);
            if p.hunger == 0 || p.thirst == 0 {
                p.hp = (p.hp - 1).max(0);
                if p.hp == 0 {
                    starved.push((p.char_index, p.map));
                    continue;
                }
            }
            notices.push((
                p.session_id,
                ServerEvent::UpdateHungerAndThirst { hunger: p.hunger, max_hunger: 100, thirst: p.thirst, max_thirst: 100 },
            ));
        }
        for (session_id, event) in notices {
            outbox.push(session_id, event.encode());
        }

        // Starvation kills route through the same finalization and
        // notification path as a combat kill (`spec.md` §4.10 "on kill
        // of player"), so a dead-by-hunger player is indistinguishable
        // from a dead-by-combat one.
        for (char_index, map) in starved {
            let death_location = world.death_location(map);
            let _ = finalize_player_death(world, char_index, death_location);
            if let Some((_, x, y)) = world.get_entity(char_index).map(|e| e.position()) {
                crate::broadcast::broadcast_area(
                    world,
                    outbox,
                    map,
                    x,
                    y,
                    &ServerEvent::MultiMessage(MultiMessage::UserKilled { char_index: char_index.get() }),
                );
            }
        }
        Ok(())
    }

    fn interval_s(&self) -> u64 {
        self.interval_s
    }

    fn name(&self) -> &'static str {
        "HungerThirst"
    }
}

pub struct GoldDecayEffect {
    interval_s: u64,
    fraction: f32,
}

impl GoldDecayEffect {
    pub fn new(cfg: &EffectsSection) -> GoldDecayEffect {
        GoldDecayEffect { interval_s: cfg.gold_decay_interval_s, fraction: cfg.gold_decay_fraction }
    }
}

impl Effect for GoldDecayEffect {
    fn apply(&mut self, world: &mut MapManager, _store: &Store, outbox: &mut Outbox, _now: u64) -> anyhow::Result<()> {
        let mut notices = Vec::new();
        for entity in world.all_entities_mut() {
            let Entity::Player(p) = entity else { continue };
            if p.gold == 0 {
                continue;
            }
            let decay = ((p.gold as f32) * self.fraction) as u32;
            p.gold = p.gold.saturating_sub(decay.max(1).min(p.gold));
            notices.push((p.session_id, ServerEvent::UpdateGold { gold: p.gold }));
        }
        for (session_id, event) in notices {
            outbox.push(session_id, event.encode());
        }
        Ok(())
    }

    fn interval_s(&self) -> u64 {
        self.interval_s
    }

    fn name(&self) -> &'static str {
        "GoldDecay"
    }
}

pub struct MeditationEffect {
    interval_s: u64,
}

impl MeditationEffect {
    pub fn new(cfg: &EffectsSection) -> MeditationEffect {
        MeditationEffect { interval_s: cfg.meditation_interval_s }
    }
}

impl Effect for MeditationEffect {
    fn apply(&mut self, world: &mut MapManager, _store: &Store, outbox: &mut Outbox, _now: u64) -> anyhow::Result<()> {
        let mut notices = Vec::new();
        for entity in world.all_entities_mut() {
            let Entity::Player(p) = entity else { continue };
            if !p.meditating || !p.alive {
                continue;
            }
            let restore = ((p.max_mana as f32) * 0.05).ceil() as i32;
            p.mana = (p.mana + restore).min(p.max_mana);
            notices.push((
                p.session_id,
                ServerEvent::UpdateUserStats {
                    hp: p.hp,
                    max_hp: p.max_hp,
                    mana: p.mana,
                    max_mana: p.max_mana,
                    stamina: p.stamina,
                    max_stamina: p.max_stamina,
                },
            ));
        }
        for (session_id, event) in notices {
            outbox.push(session_id, event.encode());
        }
        Ok(())
    }

    fn interval_s(&self) -> u64 {
        self.interval_s
    }

    fn name(&self) -> &'static str {
        "Meditation"
    }
}

pub struct RegenStaminaEffect {
    interval_s: u64,
}

impl RegenStaminaEffect {
    pub fn new(cfg: &EffectsSection) -> RegenStaminaEffect {
        RegenStaminaEffect { interval_s: cfg.regen_interval_s }
    }
}

impl Effect for RegenStaminaEffect {
    fn apply(&mut self, world: &mut MapManager, _store: &Store, _outbox: &mut Outbox, _now: u64) -> anyhow::Result<()> {
        for entity in world.all_entities_mut() {
            let Entity::Player(p) = entity else { continue };
            if !p.alive {
                continue;
            }
            let restore = if p.resting { 10 } else { 2 };
            p.stamina = (p.stamina + restore).min(p.max_stamina);
        }
        Ok(())
    }

    fn interval_s(&self) -> u64 {
        self.interval_s
    }

    fn name(&self) -> &'static str {
        "RegenStamina"
    }
}

pub struct AttributeModifiersEffect {
    interval_s: u64,
}

impl AttributeModifiersEffect {
    pub fn new(cfg: &EffectsSection) -> AttributeModifiersEffect {
        AttributeModifiersEffect { interval_s: cfg.attribute_modifiers_interval_s }
    }
}

impl Effect for AttributeModifiersEffect {
    fn apply(&mut self, world: &mut MapManager, _store: &Store, _outbox: &mut Outbox, now: u64) -> anyhow::Result<()> {
        for entity in world.all_entities_mut() {
            let Entity::Player(p) = entity else { continue };
            p.buffs.retain(|b| b.expires_at > now);
        }
        Ok(())
    }

    fn interval_s(&self) -> u64 {
        self.interval_s
    }

    fn name(&self) -> &'static str {
        "AttributeModifiers"
    }
}

pub struct RespawnTimersEffect {
    interval_s: u64,
}

impl RespawnTimersEffect {
    pub fn new(cfg: &EffectsSection) -> RespawnTimersEffect {
        RespawnTimersEffect { interval_s: cfg.respawn_timers_interval_s }
    }
}

impl Effect for RespawnTimersEffect {
    fn apply(&mut self, world: &mut MapManager, _store: &Store, outbox: &mut Outbox, now: u64) -> anyhow::Result<()> {
        respawn_due_npcs(world, outbox, now);
        Ok(())
    }

    fn interval_s(&self) -> u64 {
        self.interval_s
    }

    fn name(&self) -> &'static str {
        "RespawnTimers"
    }
}

/// Revives every NPC whose respawn delay has elapsed, in place at its
/// anchor tile (`spec.md` §2 lifecycle, §4.7 RespawnTimers, §4.10
/// "schedule respawn"). Split out from [`RespawnTimersEffect::apply`]
/// since it touches no store and so is directly unit-testable.
fn respawn_due_npcs(world: &mut MapManager, outbox: &mut Outbox, now: u64) {
    let due: Vec<CharIndex> = world
        .all_entities()
        .filter_map(|e| e.as_npc())
        .filter(|n| {
            !n.alive
                && n.died_at
                    .is_some_and(|died_at| now.saturating_sub(died_at) >= n.respawn_delay_s)
        })
        .map(|n| n.char_index)
        .collect();

    // Revives the same entity record in place rather than spawning a
    // fresh one, so the NPC keeps its char_index across death.
    for char_index in due {
        if !world.respawn_npc(char_index) {
            continue;
        }
        if let Some(Entity::Npc(n)) = world.get_entity(char_index) {
            let (map, x, y, heading) = (n.map, n.x, n.y, n.heading);
            crate::broadcast::broadcast_area(
                world,
                outbox,
                map,
                x,
                y,
                &ServerEvent::CharacterCreate { char_index: char_index.get(), x, y, heading, name: String::new() },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realm_catalogs::maps::{MapCatalog, MapDef};
    use realm_catalogs::npcs::NpcTemplateDef;

    fn single_map_catalog() -> MapCatalog {
        let mut catalog = MapCatalog::default();
        catalog.maps.insert(1, MapDef::new_empty(1, "test"));
        catalog
    }

    fn rat_template() -> NpcTemplateDef {
        NpcTemplateDef {
            id: 1,
            name: "Rat".into(),
            max_hp: 10,
            hostile: true,
            attackable: true,
            merchant: false,
            banker: false,
            is_static: false,
            aggro_range: 3,
            attack_cooldown_s: 1,
            attack_min: 1,
            attack_max: 2,
            loot_table_id: None,
            experience_reward: 5,
            gold_min: 0,
            gold_max: 0,
            respawn_delay_s: 30,
        }
    }

    fn test_outbox() -> Outbox {
        Outbox::new(std::sync::Arc::new(crate::registry::SessionRegistry::new()))
    }

    #[test]
    fn dead_npc_respawns_in_place_once_its_delay_elapses() {
        let mut world = MapManager::new(single_map_catalog());
        let template = rat_template();
        let idx = world.spawn_npc(&template, 1, 5, 5).unwrap();

        crate::combat::finalize_npc_death(&mut world, idx, 1_000);

        // Dead but still present: the entity record survives so it can
        // be revived, and its old tile is free again.
        match world.get_entity(idx) {
            Some(Entity::Npc(n)) => assert!(!n.alive),
            _ => panic!("npc entity should still exist after death"),
        }
        assert!(world.can_move_to(1, 5, 5));

        let mut outbox = test_outbox();

        // Too early: delay has not elapsed yet.
        respawn_due_npcs(&mut world, &mut outbox, 1_010);
        match world.get_entity(idx) {
            Some(Entity::Npc(n)) => assert!(!n.alive),
            _ => panic!("npc entity should still exist"),
        }

        // Past the delay: the NPC reappears alive at its anchor tile.
        respawn_due_npcs(&mut world, &mut outbox, 1_031);
        match world.get_entity(idx) {
            Some(Entity::Npc(n)) => {
                assert!(n.alive);
                assert_eq!(n.died_at, None);
                assert_eq!(n.hp, template.max_hp);
                assert_eq!((n.x, n.y), (5, 5));
            }
            _ => panic!("npc should have respawned"),
        }
        assert!(!world.can_move_to(1, 5, 5));
    }
}
