//! NPC AI tick effect (`spec.md` §4.6). Implements [`Effect`] the same
//! way every other periodic effect does; lives in this crate because
//! every step reads and mutates `MapManager` state directly under the
//! world lock.

use realm_pathfinding::Grid;
use realm_persistence::Store;
use realm_protocol::event::MultiMessage;
use realm_protocol::ServerEvent;
use realm_shared::ids::CharIndex;

use crate::combat::{finalize_npc_death, finalize_player_death, resolve_attack};
use crate::entity::Entity;
use crate::map_manager::MapManager;
use crate::outbox::Outbox;
use crate::tick::Effect;

const RANDOM_WALK_RADIUS: i32 = 5;
const PATHFIND_MAX_EXPAND: usize = 20;

pub struct NpcAiEffect {
    interval_s: u64,
}

impl NpcAiEffect {
    pub fn new(interval_s: u64) -> NpcAiEffect {
        NpcAiEffect { interval_s }
    }
}

impl Effect for NpcAiEffect {
    fn apply(
        &mut self,
        world: &mut MapManager,
        _store: &Store,
        outbox: &mut Outbox,
        now: u64,
    ) -> anyhow::Result<()> {
        let npc_indices: Vec<CharIndex> = world
            .all_entities()
            .filter_map(|e| e.as_npc())
            .filter(|n| !n.is_static && n.alive)
            .map(|n| n.char_index)
            .collect();

        for npc_idx in npc_indices {
            step_npc(world, outbox, npc_idx, now);
        }

        Ok(())
    }

    fn interval_s(&self) -> u64 {
        self.interval_s
    }

    fn name(&self) -> &'static str {
        "NPCAI"
    }
}

fn step_npc(world: &mut MapManager, outbox: &mut Outbox, npc_idx: CharIndex, now: u64) {
    let Some(npc) = world.get_entity(npc_idx).and_then(Entity::as_npc) else {
        return;
    };
    let (map, x, y) = (npc.map, npc.x, npc.y);
    let aggro_range = npc.aggro_range as i32;
    let attack_cooldown_s = npc.attack_cooldown_s;
    let last_attack_at = npc.last_attack_at;
    let attack_min = npc.attack_min;
    let attack_max = npc.attack_max;
    let anchor = (npc.anchor_x, npc.anchor_y);

    let target = nearest_player_target(world, map, x, y, aggro_range);

    match target {
        Some(target_idx) if manhattan_to(world, npc_idx, target_idx) == Some(1) => {
            if now.saturating_sub(last_attack_at) >= attack_cooldown_s {
                perform_npc_attack(world, outbox, npc_idx, target_idx, attack_min, attack_max, now);
            }
        }
        Some(target_idx) => {
            try_chase(world, outbox, npc_idx, target_idx);
        }
        None => {
            random_walk(world, outbox, npc_idx, anchor);
        }
    }
}

fn nearest_player_target(
    world: &MapManager,
    map: u16,
    x: u8,
    y: u8,
    aggro_range: i32,
) -> Option<CharIndex> {
    world
        .all_entities()
        .filter_map(|e| e.as_player())
        .filter(|p| p.map == map && p.alive && !p.invisible)
        .map(|p| {
            let dist = (p.x as i32 - x as i32).abs() + (p.y as i32 - y as i32).abs();
            (dist, p.char_index)
        })
        .filter(|(dist, _)| *dist <= aggro_range)
        .min_by_key(|(dist, _)| *dist)
        .map(|(_, idx)| idx)
}

fn manhattan_to(world: &MapManager, a: CharIndex, b: CharIndex) -> Option<i32> {
    let ea = world.get_entity(a)?;
    let eb = world.get_entity(b)?;
    let (ma, xa, ya) = ea.position();
    let (mb, xb, yb) = eb.position();
    if ma != mb {
        return None;
    }
    Some((xa as i32 - xb as i32).abs() + (ya as i32 - yb as i32).abs())
}

fn perform_npc_attack(
    world: &mut MapManager,
    outbox: &mut Outbox,
    npc_idx: CharIndex,
    target_idx: CharIndex,
    attack_min: i32,
    attack_max: i32,
    now: u64,
) {
    if let Some(Entity::Npc(n)) = world.get_entity_mut(npc_idx) {
        n.last_attack_at = now;
    }

    let Ok(result) = resolve_attack(world, npc_idx, target_idx, attack_min, attack_max) else {
        return;
    };

    let (map, x, y) = match world.get_entity(target_idx) {
        Some(e) => e.position(),
        None => return,
    };

    if result.hit {
        crate::broadcast::broadcast_area(
            world,
            outbox,
            map,
            x,
            y,
            &ServerEvent::MultiMessage(MultiMessage::NpcHitUser {
                char_index: npc_idx.get(),
                damage: result.damage,
            }),
        );
    }

    if result.killed {
        let death_location = world.death_location(map);
        let _ = finalize_player_death(world, target_idx, death_location);
        crate::broadcast::broadcast_area(
            world,
            outbox,
            map,
            x,
            y,
            &ServerEvent::MultiMessage(MultiMessage::UserKilled { char_index: target_idx.get() }),
        );
    }
}

fn try_chase(world: &mut MapManager, outbox: &mut Outbox, npc_idx: CharIndex, target_idx: CharIndex) {
    let Some(Entity::Npc(npc)) = world.get_entity(npc_idx) else { return };
    let (map, sx, sy) = (npc.map, npc.x, npc.y);
    let Some(target) = world.get_entity(target_idx) else { return };
    let (_, tx, ty) = target.position();

    let step = world
        .grid(map)
        .and_then(|grid| realm_pathfinding::next_step(&grid as &dyn Grid, (sx, sy), (tx, ty), PATHFIND_MAX_EXPAND));

    match step {
        Some((nx, ny, heading)) => commit_move(world, outbox, npc_idx, map, nx, ny, heading_byte(heading)),
        None => random_walk(world, outbox, npc_idx, (sx, sy)),
    }
}

fn random_walk(world: &mut MapManager, outbox: &mut Outbox, npc_idx: CharIndex, anchor: (u8, u8)) {
    let Some(Entity::Npc(npc)) = world.get_entity(npc_idx) else { return };
    let (map, x, y) = (npc.map, npc.x, npc.y);

    let mut candidates: Vec<((u8, u8), u8)> = Vec::new();
    for (dx, dy, heading) in [(0i32, -1i32, 1u8), (0, 1, 3), (1, 0, 2), (-1, 0, 4)] {
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        if nx < 1 || ny < 1 || nx > u8::MAX as i32 || ny > u8::MAX as i32 {
            continue;
        }
        let (nx, ny) = (nx as u8, ny as u8);
        let within_radius = (nx as i32 - anchor.0 as i32).abs() + (ny as i32 - anchor.1 as i32).abs()
            <= RANDOM_WALK_RADIUS;
        if within_radius && world.can_move_to(map, nx, ny) {
            candidates.push(((nx, ny), heading));
        }
    }

    if candidates.is_empty() {
        return;
    }

    let pick = rand_index(candidates.len());
    let ((nx, ny), heading) = candidates[pick];
    commit_move(world, outbox, npc_idx, map, nx, ny, heading);
}

fn commit_move(world: &mut MapManager, outbox: &mut Outbox, npc_idx: CharIndex, map: u16, nx: u8, ny: u8, heading: u8) {
    if world.move_entity(npc_idx, map, nx, ny).is_ok() {
        if let Some(Entity::Npc(n)) = world.get_entity_mut(npc_idx) {
            n.heading = heading;
        }
        crate::broadcast::broadcast_area(
            world,
            outbox,
            map,
            nx,
            ny,
            &ServerEvent::CharacterMove { char_index: npc_idx.get(), x: nx, y: ny, heading },
        );
    }
}

/// Maps `realm_pathfinding::Heading` onto the wire heading scheme
/// (`spec.md` §4.2: `{1:N,2:E,3:S,4:W}`), the same one players use
/// (`realm_protocol::reader::Heading`'s discriminants).
fn heading_byte(heading: realm_pathfinding::Heading) -> u8 {
    match heading {
        realm_pathfinding::Heading::North => 1,
        realm_pathfinding::Heading::East => 2,
        realm_pathfinding::Heading::South => 3,
        realm_pathfinding::Heading::West => 4,
    }
}

fn rand_index(len: usize) -> usize {
    use rand::Rng;
    rand::thread_rng().gen_range(0..len)
}
