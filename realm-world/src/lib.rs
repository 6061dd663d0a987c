//! The authoritative in-process world: entity storage, the tick
//! scheduler and its registered effects, combat resolution and NPC AI,
//! and event fan-out (`spec.md` §4.4-§4.10).

pub mod ai;
pub mod broadcast;
pub mod combat;
pub mod effects;
pub mod entity;
pub mod map_manager;
pub mod map_state;
pub mod outbox;
pub mod registry;
pub mod tick;

use std::sync::{Arc, Mutex};

use slog::Logger;

use realm_persistence::Store;
use realm_shared::config::EffectsSection;

use crate::ai::NpcAiEffect;
use crate::effects::{
    AttributeModifiersEffect, GoldDecayEffect, HungerThirstEffect, MeditationEffect,
    RegenStaminaEffect, RespawnTimersEffect,
};
use crate::map_manager::MapManager;
use crate::registry::SessionRegistry;
use crate::tick::TickEngine;

/// Builds a [`TickEngine`] with every periodic effect registered in the
/// exact order `spec.md` §4.7 specifies: NPC AI, hunger/thirst, gold
/// decay, meditation, stamina regen, attribute modifier expiry, NPC
/// respawn timers.
pub fn build_tick_engine(
    tick_ms: u64,
    effects_cfg: &EffectsSection,
    world: Arc<Mutex<MapManager>>,
    store: Store,
    registry: Arc<SessionRegistry>,
    log: Logger,
) -> TickEngine {
    let mut engine = TickEngine::new(tick_ms, world, store, registry, log);
    engine.register(Box::new(NpcAiEffect::new(effects_cfg.npc_ai_interval_s)));
    engine.register(Box::new(HungerThirstEffect::new(effects_cfg)));
    engine.register(Box::new(GoldDecayEffect::new(effects_cfg)));
    engine.register(Box::new(MeditationEffect::new(effects_cfg)));
    engine.register(Box::new(RegenStaminaEffect::new(effects_cfg)));
    engine.register(Box::new(AttributeModifiersEffect::new(effects_cfg)));
    engine.register(Box::new(RespawnTimersEffect::new(effects_cfg)));
    engine
}
