//! Command dispatch (`spec.md` §4.3): one `handle` entry point per
//! decoded command, each delegating to a thin private handler that
//! locks the world, calls into [`crate::gameplay`] or
//! `realm_persistence` directly, and replies. Handlers never panic on
//! a gameplay failure — every one returns `Result<(), HandlerError>`
//! and `handle` turns an `Err` into a `CONSOLE_MSG`/`ERROR_MSG` reply.

use slog::warn;

use realm_catalogs::npcs::NpcTemplateId;
use realm_catalogs::spells::SpellEffect;
use realm_persistence::items::{self, SlotStack};
use realm_protocol::event::MultiMessage;
use realm_protocol::reader::Heading;
use realm_protocol::{ClientCommand, ServerEvent};
use realm_shared::error::{AuthError, Conflict, HandlerError, NotFound, PreconditionFailed};
use realm_shared::ids::{CharIndex, MapId};
use realm_shared::time::timestamp_secs;
use realm_world::broadcast::{broadcast_area, broadcast_clan, broadcast_party, send_to_session};
use realm_world::combat::{require_attackable, resolve_attack};
use realm_world::entity::Entity;
use realm_world::map_manager::MapManager;
use realm_world::outbox::Outbox;

use crate::deps::Dependencies;
use crate::gameplay;
use crate::session::{Activity, SessionId};

const MAX_LOGIN_ATTEMPTS: u32 = 5;
/// No class-select command exists in this protocol; every fresh
/// character is rolled from the catalog's first class.
const DEFAULT_CLASS_ID: u8 = 0;

pub fn handle(session_id: SessionId, cmd: ClientCommand, deps: &Dependencies) {
    let now = timestamp_secs();
    if let Some(session) = deps.sessions.get(session_id) {
        session.lock().expect("session poisoned").last_activity_at = now;
    }

    if !cmd.requires_no_auth() && !is_authenticated(deps, session_id) {
        reply_error(deps, session_id, &AuthError::NotAuthenticated.into());
        return;
    }

    let result = match cmd {
        ClientCommand::Login { username, password } => handle_login(session_id, username, password, deps),
        ClientCommand::Logout => handle_logout(session_id, deps),
        ClientCommand::Walk { heading } => handle_walk(session_id, heading, deps),
        ClientCommand::Attack => handle_attack(session_id, deps),
        ClientCommand::Pickup => handle_pickup(session_id, deps),
        ClientCommand::Drop { slot, quantity } => handle_drop(session_id, slot, quantity, deps),
        ClientCommand::Talk { text } => handle_talk(session_id, text, deps),
        ClientCommand::Whisper { target, text } => handle_whisper(session_id, target, text, deps),
        ClientCommand::UseItem { slot } => handle_use_item(session_id, slot, deps),
        ClientCommand::EquipItem { slot } => handle_equip_item(session_id, slot, deps),
        ClientCommand::CastSpell { spell_slot, x, y } => handle_cast_spell(session_id, spell_slot, x, y, deps),
        ClientCommand::Meditate { enable } => handle_meditate(session_id, enable, deps),
        ClientCommand::CommerceStart => handle_commerce_start(session_id, deps),
        ClientCommand::CommerceBuy { slot, quantity } => handle_commerce_buy(session_id, slot, quantity, deps),
        ClientCommand::CommerceSell { slot, quantity } => handle_commerce_sell(session_id, slot, quantity, deps),
        ClientCommand::CommerceEnd => handle_commerce_end(session_id, deps),
        ClientCommand::BankDeposit { slot, quantity } => handle_bank_deposit(session_id, slot, quantity, deps),
        ClientCommand::BankExtract { slot, quantity } => handle_bank_extract(session_id, slot, quantity, deps),
        ClientCommand::PartyCreate => handle_party_create(session_id, deps),
        ClientCommand::PartyInvite { target } => handle_party_invite(session_id, target, deps),
        ClientCommand::PartyLeave => handle_party_leave(session_id, deps),
        ClientCommand::ClanCreate { name } => handle_clan_create(session_id, name, deps),
        ClientCommand::ClanInvite { target } => handle_clan_invite(session_id, target, deps),
        ClientCommand::ClanLeave => handle_clan_leave(session_id, deps),
        ClientCommand::ClanChat { text } => handle_clan_chat(session_id, text, deps),
        ClientCommand::PartyChat { text } => handle_party_chat(session_id, text, deps),
    };

    if let Err(err) = result {
        warn!(deps.log, "command failed"; "session" => session_id, "error" => %err);
        reply_error(deps, session_id, &err);
    }
}

fn is_authenticated(deps: &Dependencies, session_id: SessionId) -> bool {
    deps.sessions
        .get(session_id)
        .map(|s| s.lock().expect("session poisoned").is_authenticated())
        .unwrap_or(false)
}

fn reply_error(deps: &Dependencies, session_id: SessionId, err: &HandlerError) {
    let event = ServerEvent::console_or_error(err.console_message(), deps.config.error_uses_console_msg);
    deps.registry.send(session_id, event.encode());
}

fn require_char_index(deps: &Dependencies, session_id: SessionId) -> Result<CharIndex, HandlerError> {
    let session = deps.sessions.get(session_id).ok_or(NotFound::Session)?;
    let session = session.lock().expect("session poisoned");
    session.char_index.ok_or_else(|| AuthError::NotAuthenticated.into())
}

fn player_user_id(world: &MapManager, char_index: CharIndex) -> Result<u64, HandlerError> {
    match world.get_entity(char_index).ok_or(NotFound::Entity)? {
        Entity::Player(p) => Ok(p.user_id),
        Entity::Npc(_) => Err(anyhow::anyhow!("NPCs have no user id").into()),
    }
}

fn trading_merchant(deps: &Dependencies, session_id: SessionId) -> Result<CharIndex, HandlerError> {
    let session = deps.sessions.get(session_id).ok_or(NotFound::Session)?;
    let session = session.lock().expect("session poisoned");
    match session.activity {
        Activity::Trading { merchant } => Ok(merchant),
        Activity::Idle => Err(PreconditionFailed::NotAvailable.into()),
    }
}

fn merchant_template(world: &MapManager, merchant: CharIndex) -> Result<NpcTemplateId, HandlerError> {
    match world.get_entity(merchant).ok_or(NotFound::Entity)? {
        Entity::Npc(n) => Ok(n.template_id),
        Entity::Player(_) => Err(anyhow::anyhow!("trading partner is not an NPC").into()),
    }
}

fn manhattan(ax: u8, ay: u8, bx: u8, by: u8) -> i32 {
    (ax as i32 - bx as i32).abs() + (ay as i32 - by as i32).abs()
}

/// `(x, y, heading, display name)` for a `CHARACTER_CREATE` push,
/// stamping a synthetic name for NPCs since they carry no `name` field.
fn character_create_fields(entity: &Entity) -> (u8, u8, u8, String) {
    match entity {
        Entity::Player(p) => (p.x, p.y, p.heading, p.name.clone()),
        Entity::Npc(n) => (n.x, n.y, n.heading, format!("npc-{}", n.template_id)),
    }
}

fn handle_login(session_id: SessionId, username: String, password: String, deps: &Dependencies) -> Result<(), HandlerError> {
    let session_arc = deps.sessions.get(session_id).ok_or(NotFound::Session)?;
    {
        let session = session_arc.lock().expect("session poisoned");
        if session.is_authenticated() {
            return Err(anyhow::anyhow!("session is already logged in").into());
        }
        if session.login_attempts >= MAX_LOGIN_ATTEMPTS {
            return Err(AuthError::RateLimited.into());
        }
    }

    let user_id = match realm_persistence::accounts::login(&deps.store, &username, &password) {
        Ok(id) => id,
        Err(err) => {
            session_arc.lock().expect("session poisoned").login_attempts += 1;
            return Err(err);
        }
    };

    let record = match realm_persistence::player::load(&deps.store, user_id)? {
        Some(record) => record,
        None => {
            let class = deps
                .catalogs
                .classes
                .get(DEFAULT_CLASS_ID)
                .ok_or_else(|| anyhow::anyhow!("no starting class configured"))?;
            let record = realm_persistence::player::PlayerRecord::new(user_id, username.clone(), class);
            realm_persistence::player::save(&deps.store, &record)?;
            record
        }
    };

    let spawn = crate::player_sync::record_to_spawn(&record);
    let mut outbox = Outbox::new(deps.registry.clone());

    let clan_id = {
        let mut world = deps.world.lock().expect("world lock poisoned");
        let (char_index, nearby) = world.add_player(session_id, spawn)?;
        let player = world
            .get_entity(char_index)
            .and_then(|e| e.as_player())
            .expect("just inserted by add_player");
        let (map, x, y, heading) = (player.map, player.x, player.y, player.heading);
        let name = player.name.clone();
        let clan_id = player.clan_id;

        outbox.push(session_id, ServerEvent::Logged.encode());
        outbox.push(session_id, ServerEvent::UserCharIndexInServer { char_index: char_index.get() }.encode());
        outbox.push(session_id, ServerEvent::ChangeMap { map }.encode());
        outbox.push(session_id, ServerEvent::PosUpdate { x, y }.encode());
        outbox.push(
            session_id,
            ServerEvent::UpdateUserStats {
                hp: player.hp,
                max_hp: player.max_hp,
                mana: player.mana,
                max_mana: player.max_mana,
                stamina: player.stamina,
                max_stamina: player.max_stamina,
            }
            .encode(),
        );
        outbox.push(session_id, ServerEvent::UpdateGold { gold: player.gold }.encode());
        outbox.push(
            session_id,
            ServerEvent::UpdateHungerAndThirst { hunger: player.hunger, max_hunger: 100, thirst: player.thirst, max_thirst: 100 }
                .encode(),
        );

        for entity in &nearby {
            let (ex, ey, eheading, ename) = character_create_fields(entity);
            outbox.push(
                session_id,
                ServerEvent::CharacterCreate { char_index: entity.char_index().get(), x: ex, y: ey, heading: eheading, name: ename }
                    .encode(),
            );
        }

        broadcast_area(
            &world,
            &mut outbox,
            map,
            x,
            y,
            &ServerEvent::CharacterCreate { char_index: char_index.get(), x, y, heading, name },
        );

        session_arc.lock().expect("session poisoned").user_id = Some(user_id);
        session_arc.lock().expect("session poisoned").char_index = Some(char_index);

        clan_id
    };

    for (slot, stack) in items::load_inventory(&deps.store, user_id)? {
        outbox.push(session_id, ServerEvent::ChangeInventorySlot { slot, item_id: stack.item_id, quantity: stack.qty }.encode());
    }

    if deps.config.send_clan_details_on_login {
        if let Some(clan_id) = clan_id {
            if let Some((name, member_count)) = gameplay::clans::details(&deps.store, clan_id)? {
                outbox.push(session_id, ServerEvent::ClanDetails { name, member_count }.encode());
            }
        }
    }

    outbox.flush();
    Ok(())
}

fn handle_logout(session_id: SessionId, deps: &Dependencies) -> Result<(), HandlerError> {
    let session_arc = deps.sessions.get(session_id).ok_or(NotFound::Session)?;
    let char_index = session_arc.lock().expect("session poisoned").char_index.take();
    let Some(char_index) = char_index else { return Ok(()) };

    let mut world = deps.world.lock().expect("world lock poisoned");
    let player = world.get_entity(char_index).and_then(|e| e.as_player()).ok_or(NotFound::Entity)?;
    let record = crate::player_sync::player_to_record(player);
    let (map, x, y) = (player.map, player.x, player.y);
    realm_persistence::player::save(&deps.store, &record)?;

    world.remove_entity(char_index);
    let mut outbox = Outbox::new(deps.registry.clone());
    broadcast_area(&world, &mut outbox, map, x, y, &ServerEvent::CharacterRemove { char_index: char_index.get() });
    drop(world);
    outbox.flush();
    Ok(())
}

fn handle_walk(session_id: SessionId, heading: Heading, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let now = timestamp_secs();
    let mut world = deps.world.lock().expect("world lock poisoned");
    let mut outbox = Outbox::new(deps.registry.clone());

    let result = (|| -> Result<(), HandlerError> {
        let (map, x, y, alive, immobilized) = match world.get_entity(char_index).ok_or(NotFound::Entity)? {
            Entity::Player(p) => (p.map, p.x, p.y, p.alive, p.is_immobilized(now)),
            Entity::Npc(_) => return Err(anyhow::anyhow!("NPCs do not issue WALK").into()),
        };
        if !alive {
            return Err(PreconditionFailed::Dead.into());
        }
        if immobilized {
            return Err(PreconditionFailed::Blocked.into());
        }

        let heading_byte = heading as u8;
        let (dx, dy) = heading.delta();
        if let Some(Entity::Player(p)) = world.get_entity_mut(char_index) {
            p.heading = heading_byte;
        }

        let nx = x as i32 + dx;
        let ny = y as i32 + dy;

        if (1..=100).contains(&nx) && (1..=100).contains(&ny) {
            let (nx, ny) = (nx as u8, ny as u8);
            if let Some(exit) = world.get_exit_tile(map, nx, ny) {
                transition_map(&mut world, &mut outbox, char_index, (exit.dest_map, exit.dest_x, exit.dest_y))?;
            } else {
                world.move_entity(char_index, map, nx, ny)?;
                broadcast_area(
                    &world,
                    &mut outbox,
                    map,
                    nx,
                    ny,
                    &ServerEvent::CharacterMove { char_index: char_index.get(), x: nx, y: ny, heading: heading_byte },
                );
            }
        } else if let Some(exit) = world.get_exit_tile(map, x, y) {
            transition_map(&mut world, &mut outbox, char_index, (exit.dest_map, exit.dest_x, exit.dest_y))?;
        } else {
            return Err(PreconditionFailed::Blocked.into());
        }

        Ok(())
    })();

    drop(world);
    outbox.flush();
    result
}

/// Moves `char_index` onto `(map, x, y)` across maps: removes it from
/// observers' view on the old map, then replays the new map's visible
/// entities and the mover's own appearance to everyone nearby
/// (`spec.md` §4.5 "walking through an exit tile").
fn transition_map(
    world: &mut MapManager,
    outbox: &mut Outbox,
    char_index: CharIndex,
    dest: (MapId, u8, u8),
) -> Result<(), HandlerError> {
    let (old_map, old_x, old_y) = world.get_entity(char_index).ok_or(NotFound::Entity)?.position();
    let (new_map, new_x, new_y) = dest;

    world.move_entity(char_index, new_map, new_x, new_y)?;

    broadcast_area(world, outbox, old_map, old_x, old_y, &ServerEvent::CharacterRemove { char_index: char_index.get() });

    let session_id = world.session_id_of(char_index).ok_or(NotFound::Entity)?;
    outbox.push(session_id, ServerEvent::ChangeMap { map: new_map }.encode());
    outbox.push(session_id, ServerEvent::PosUpdate { x: new_x, y: new_y }.encode());

    for entity in world.list_entities_in_map(new_map)? {
        if entity.char_index() == char_index {
            continue;
        }
        let (ex, ey, eheading, ename) = character_create_fields(&entity);
        outbox.push(
            session_id,
            ServerEvent::CharacterCreate { char_index: entity.char_index().get(), x: ex, y: ey, heading: eheading, name: ename }
                .encode(),
        );
    }

    if let Some(Entity::Player(p)) = world.get_entity(char_index) {
        let (name, heading) = (p.name.clone(), p.heading);
        broadcast_area(
            world,
            outbox,
            new_map,
            new_x,
            new_y,
            &ServerEvent::CharacterCreate { char_index: char_index.get(), x: new_x, y: new_y, heading, name },
        );
    }

    Ok(())
}

fn handle_attack(session_id: SessionId, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let now = timestamp_secs();
    let mut world = deps.world.lock().expect("world lock poisoned");
    let mut outbox = Outbox::new(deps.registry.clone());
    let result = gameplay::combat::attack(&mut world, &deps.store, &deps.catalogs, &mut outbox, char_index, now);
    drop(world);
    outbox.flush();
    result
}

fn handle_pickup(session_id: SessionId, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let mut world = deps.world.lock().expect("world lock poisoned");
    let mut outbox = Outbox::new(deps.registry.clone());

    let result = (|| -> Result<(), HandlerError> {
        let (map, x, y) = world.get_entity(char_index).ok_or(NotFound::Entity)?.position();
        let item = world.remove_ground_item(map, x, y)?;
        let user_id = player_user_id(&world, char_index)?;

        let existing = items::load_inventory(&deps.store, user_id)?;
        match gameplay::inventory::place_stack(&existing, gameplay::inventory::INVENTORY_SLOTS, item) {
            Ok((slot, stack)) => {
                items::set_inventory_slot(&deps.store, user_id, slot, stack)?;
                realm_persistence::ground::clear(&deps.store, map, x, y)?;
                outbox.push(session_id, ServerEvent::ChangeInventorySlot { slot, item_id: stack.item_id, quantity: stack.qty }.encode());
                broadcast_area(&world, &mut outbox, map, x, y, &ServerEvent::ObjectRemove { x, y });
                Ok(())
            }
            Err(err) => {
                world.add_ground_item(map, x, y, item)?;
                Err(err)
            }
        }
    })();

    drop(world);
    outbox.flush();
    result
}

fn handle_drop(session_id: SessionId, slot: u8, quantity: u16, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let mut world = deps.world.lock().expect("world lock poisoned");
    let mut outbox = Outbox::new(deps.registry.clone());

    let result = (|| -> Result<(), HandlerError> {
        let (map, x, y) = world.get_entity(char_index).ok_or(NotFound::Entity)?.position();
        if world.get_ground_item(map, x, y).is_some() {
            return Err(Conflict::GroundItemGone((map, x, y)).into());
        }

        let user_id = player_user_id(&world, char_index)?;
        let existing = items::load_inventory(&deps.store, user_id)?;
        let remaining = gameplay::inventory::take_from_slot(&existing, slot, quantity)?;
        let item_id = existing.get(&slot).ok_or(PreconditionFailed::InsufficientItems)?.item_id;

        world.add_ground_item(map, x, y, SlotStack { item_id, qty: quantity })?;
        realm_persistence::ground::set(&deps.store, map, x, y, SlotStack { item_id, qty: quantity })?;

        if remaining.qty == 0 {
            items::clear_inventory_slot(&deps.store, user_id, slot)?;
        } else {
            items::set_inventory_slot(&deps.store, user_id, slot, remaining)?;
        }

        outbox.push(session_id, ServerEvent::ChangeInventorySlot { slot, item_id: remaining.item_id, quantity: remaining.qty }.encode());
        broadcast_area(&world, &mut outbox, map, x, y, &ServerEvent::ObjectCreate { x, y, item_id });
        Ok(())
    })();

    drop(world);
    outbox.flush();
    result
}

fn handle_talk(session_id: SessionId, text: String, deps: &Dependencies) -> Result<(), HandlerError> {
    gameplay::chat::reject_if_gm_command(&text)?;
    let char_index = require_char_index(deps, session_id)?;
    let world = deps.world.lock().expect("world lock poisoned");
    let player = world.get_entity(char_index).and_then(|e| e.as_player()).ok_or(NotFound::Entity)?;
    let (map, x, y, name) = (player.map, player.x, player.y, player.name.clone());

    let mut outbox = Outbox::new(deps.registry.clone());
    broadcast_area(
        &world,
        &mut outbox,
        map,
        x,
        y,
        &ServerEvent::ConsoleOrErrorMsg { opcode: realm_protocol::opcodes::server::CONSOLE_MSG, text: format!("{name}: {text}") },
    );
    drop(world);
    outbox.flush();
    Ok(())
}

fn handle_whisper(session_id: SessionId, target: String, text: String, deps: &Dependencies) -> Result<(), HandlerError> {
    gameplay::chat::reject_if_gm_command(&text)?;
    let char_index = require_char_index(deps, session_id)?;
    let world = deps.world.lock().expect("world lock poisoned");
    let name = match world.get_entity(char_index).ok_or(NotFound::Entity)? {
        Entity::Player(p) => p.name.clone(),
        Entity::Npc(_) => return Err(anyhow::anyhow!("NPCs do not whisper").into()),
    };
    let target_index = gameplay::parties::find_online_by_name(&world, &target).ok_or(NotFound::Entity)?;
    let target_session = world.session_id_of(target_index).ok_or(NotFound::Entity)?;

    let mut outbox = Outbox::new(deps.registry.clone());
    send_to_session(
        &mut outbox,
        target_session,
        &ServerEvent::ConsoleOrErrorMsg {
            opcode: realm_protocol::opcodes::server::CONSOLE_MSG,
            text: format!("{name} whispers: {text}"),
        },
    );
    drop(world);
    outbox.flush();
    Ok(())
}

fn handle_use_item(session_id: SessionId, slot: u8, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let world = deps.world.lock().expect("world lock poisoned");
    let user_id = player_user_id(&world, char_index)?;
    drop(world);

    let existing = items::load_inventory(&deps.store, user_id)?;
    let stack = existing.get(&slot).ok_or(PreconditionFailed::InsufficientItems)?;
    let item = deps.catalogs.items.get(stack.item_id).ok_or(PreconditionFailed::NotAvailable)?;
    if item.kind != realm_catalogs::items::ItemKind::Consumable {
        return Err(PreconditionFailed::NotAvailable.into());
    }

    let remaining = gameplay::inventory::take_from_slot(&existing, slot, 1)?;
    if remaining.qty == 0 {
        items::clear_inventory_slot(&deps.store, user_id, slot)?;
    } else {
        items::set_inventory_slot(&deps.store, user_id, slot, remaining)?;
    }

    deps.registry.send(
        session_id,
        ServerEvent::ChangeInventorySlot { slot, item_id: remaining.item_id, quantity: remaining.qty }.encode(),
    );
    Ok(())
}

fn handle_equip_item(session_id: SessionId, slot: u8, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let world = deps.world.lock().expect("world lock poisoned");
    let user_id = player_user_id(&world, char_index)?;
    drop(world);

    let existing = items::load_inventory(&deps.store, user_id)?;
    let stack = existing.get(&slot).ok_or(PreconditionFailed::InsufficientItems)?;
    let item = deps.catalogs.items.get(stack.item_id).ok_or(PreconditionFailed::NotAvailable)?;
    if item.equip_slot.is_none() {
        return Err(PreconditionFailed::NotAvailable.into());
    }

    deps.registry.send(
        session_id,
        ServerEvent::ChangeInventorySlot { slot, item_id: stack.item_id, quantity: stack.qty }.encode(),
    );
    Ok(())
}

fn handle_cast_spell(session_id: SessionId, spell_slot: u8, x: u8, y: u8, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let now = timestamp_secs();
    let user_id = {
        let world = deps.world.lock().expect("world lock poisoned");
        player_user_id(&world, char_index)?
    };

    let spellbook = items::load_spellbook(&deps.store, user_id)?;
    let spell_id = *spellbook.get(&spell_slot).ok_or(PreconditionFailed::NotAvailable)?;
    let spell = deps.catalogs.spells.get(spell_id).ok_or(PreconditionFailed::NotAvailable)?.clone();

    let mut world = deps.world.lock().expect("world lock poisoned");
    let mut outbox = Outbox::new(deps.registry.clone());

    let result = (|| -> Result<(), HandlerError> {
        let (map, cx, cy, mana, alive, dumb) = match world.get_entity(char_index).ok_or(NotFound::Entity)? {
            Entity::Player(p) => (p.map, p.x, p.y, p.mana, p.alive, p.is_dumb(now)),
            Entity::Npc(_) => return Err(anyhow::anyhow!("NPCs do not cast spells").into()),
        };
        if !alive {
            return Err(PreconditionFailed::Dead.into());
        }
        if dumb {
            return Err(PreconditionFailed::Blocked.into());
        }
        if mana < spell.mana_cost as i32 {
            return Err(anyhow::anyhow!("not enough mana").into());
        }
        if manhattan(cx, cy, x, y) > spell.max_range as i32 {
            return Err(PreconditionFailed::OutOfRange.into());
        }

        if let Some(Entity::Player(p)) = world.get_entity_mut(char_index) {
            p.mana -= spell.mana_cost as i32;
        }
        broadcast_area(&world, &mut outbox, map, cx, cy, &ServerEvent::CreateFx { char_index: char_index.get(), fx_id: spell.id });

        match spell.effect {
            SpellEffect::Damage => {
                let target = world.entity_index_at(map, x, y).ok_or(NotFound::Entity)?;
                require_attackable(&world, target)?;
                let attack = resolve_attack(&mut world, char_index, target, spell.min_power, spell.max_power)?;
                if attack.hit {
                    broadcast_area(
                        &world,
                        &mut outbox,
                        map,
                        x,
                        y,
                        &ServerEvent::MultiMessage(MultiMessage::UserHitNpc { char_index: target.get(), damage: attack.damage }),
                    );
                }
                if attack.killed {
                    gameplay::combat::finalize_kill(&mut world, &deps.store, &deps.catalogs, &mut outbox, char_index, target, map, x, y, now)?;
                }
            }
            SpellEffect::Heal => {
                let target = world.entity_index_at(map, x, y).unwrap_or(char_index);
                let power = spell.max_power.max(spell.min_power).max(0);
                if let Some(Entity::Player(p)) = world.get_entity_mut(target) {
                    p.hp = (p.hp + power).min(p.max_hp);
                }
            }
            SpellEffect::Paralyze => {
                let target = world.entity_index_at(map, x, y).ok_or(NotFound::Entity)?;
                if let Some(Entity::Player(p)) = world.get_entity_mut(target) {
                    p.immobilized_until = now + 5;
                }
            }
            SpellEffect::Blind => {
                let target = world.entity_index_at(map, x, y).ok_or(NotFound::Entity)?;
                if let Some(Entity::Player(p)) = world.get_entity_mut(target) {
                    p.blinded_until = now + 5;
                }
            }
            SpellEffect::Invisibility => {
                if let Some(Entity::Player(p)) = world.get_entity_mut(char_index) {
                    p.invisible_until = now + 30;
                }
            }
            SpellEffect::Teleport => {
                if world.can_move_to(map, x, y) {
                    world.move_entity(char_index, map, x, y)?;
                }
            }
        }

        Ok(())
    })();

    drop(world);
    outbox.flush();
    result
}

fn handle_meditate(session_id: SessionId, enable: bool, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let mut world = deps.world.lock().expect("world lock poisoned");
    match world.get_entity_mut(char_index) {
        Some(Entity::Player(p)) => {
            p.meditating = enable;
            Ok(())
        }
        _ => Err(NotFound::Entity.into()),
    }
}

fn handle_commerce_start(session_id: SessionId, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let world = deps.world.lock().expect("world lock poisoned");
    let (merchant, _) = gameplay::commerce::find_adjacent_merchant(&world, &deps.catalogs, char_index)?;
    drop(world);

    let session_arc = deps.sessions.get(session_id).ok_or(NotFound::Session)?;
    session_arc.lock().expect("session poisoned").activity = Activity::Trading { merchant };
    deps.registry.send(session_id, ServerEvent::CommerceInit.encode());
    Ok(())
}

fn handle_commerce_buy(session_id: SessionId, slot: u8, quantity: u16, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let merchant = trading_merchant(deps, session_id)?;
    let mut world = deps.world.lock().expect("world lock poisoned");
    let template_id = merchant_template(&world, merchant)?;
    gameplay::commerce::buy(&mut world, &deps.store, &deps.catalogs, char_index, template_id, slot, quantity)?;
    let gold = match world.get_entity(char_index) {
        Some(Entity::Player(p)) => p.gold,
        _ => return Err(NotFound::Entity.into()),
    };
    drop(world);
    deps.registry.send(session_id, ServerEvent::UpdateGold { gold }.encode());
    Ok(())
}

fn handle_commerce_sell(session_id: SessionId, slot: u8, quantity: u16, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let merchant = trading_merchant(deps, session_id)?;
    let mut world = deps.world.lock().expect("world lock poisoned");
    let template_id = merchant_template(&world, merchant)?;
    gameplay::commerce::sell(&mut world, &deps.store, &deps.catalogs, char_index, template_id, slot, quantity)?;
    let gold = match world.get_entity(char_index) {
        Some(Entity::Player(p)) => p.gold,
        _ => return Err(NotFound::Entity.into()),
    };
    drop(world);
    deps.registry.send(session_id, ServerEvent::UpdateGold { gold }.encode());
    Ok(())
}

fn handle_commerce_end(session_id: SessionId, deps: &Dependencies) -> Result<(), HandlerError> {
    let session_arc = deps.sessions.get(session_id).ok_or(NotFound::Session)?;
    session_arc.lock().expect("session poisoned").activity = Activity::Idle;
    deps.registry.send(session_id, ServerEvent::CommerceEnd.encode());
    Ok(())
}

fn handle_bank_deposit(session_id: SessionId, slot: u8, quantity: u16, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let user_id = {
        let world = deps.world.lock().expect("world lock poisoned");
        player_user_id(&world, char_index)?
    };
    gameplay::banking::deposit(&deps.store, user_id, slot, quantity)
}

fn handle_bank_extract(session_id: SessionId, slot: u8, quantity: u16, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let user_id = {
        let world = deps.world.lock().expect("world lock poisoned");
        player_user_id(&world, char_index)?
    };
    gameplay::banking::extract(&deps.store, user_id, slot, quantity)
}

fn handle_party_create(session_id: SessionId, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let mut world = deps.world.lock().expect("world lock poisoned");
    gameplay::parties::create(&mut world, &deps.store, char_index)?;
    Ok(())
}

fn handle_party_invite(session_id: SessionId, target: String, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let mut world = deps.world.lock().expect("world lock poisoned");
    gameplay::parties::invite(&mut world, &deps.store, char_index, &target)
}

fn handle_party_leave(session_id: SessionId, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let mut world = deps.world.lock().expect("world lock poisoned");
    gameplay::parties::leave(&mut world, &deps.store, char_index)
}

fn handle_clan_create(session_id: SessionId, name: String, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let mut world = deps.world.lock().expect("world lock poisoned");
    gameplay::clans::create(&mut world, &deps.store, char_index, &name)?;
    Ok(())
}

fn handle_clan_invite(session_id: SessionId, target: String, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let mut world = deps.world.lock().expect("world lock poisoned");
    gameplay::clans::invite(&mut world, &deps.store, char_index, &target)
}

fn handle_clan_leave(session_id: SessionId, deps: &Dependencies) -> Result<(), HandlerError> {
    let char_index = require_char_index(deps, session_id)?;
    let mut world = deps.world.lock().expect("world lock poisoned");
    gameplay::clans::leave(&mut world, &deps.store, char_index)
}

fn handle_clan_chat(session_id: SessionId, text: String, deps: &Dependencies) -> Result<(), HandlerError> {
    gameplay::chat::reject_if_gm_command(&text)?;
    let char_index = require_char_index(deps, session_id)?;
    let world = deps.world.lock().expect("world lock poisoned");
    let (clan_id, name) = match world.get_entity(char_index).ok_or(NotFound::Entity)? {
        Entity::Player(p) => (p.clan_id.ok_or(PreconditionFailed::NoClan)?, p.name.clone()),
        Entity::Npc(_) => return Err(anyhow::anyhow!("NPCs do not chat").into()),
    };

    let mut outbox = Outbox::new(deps.registry.clone());
    broadcast_clan(
        &world,
        &mut outbox,
        clan_id,
        &ServerEvent::ConsoleOrErrorMsg { opcode: realm_protocol::opcodes::server::CONSOLE_MSG, text: format!("[clan] {name}: {text}") },
    );
    drop(world);
    outbox.flush();
    Ok(())
}

fn handle_party_chat(session_id: SessionId, text: String, deps: &Dependencies) -> Result<(), HandlerError> {
    gameplay::chat::reject_if_gm_command(&text)?;
    let char_index = require_char_index(deps, session_id)?;
    let store = &deps.store;
    let world = deps.world.lock().expect("world lock poisoned");
    let (party_id, name) = match world.get_entity(char_index).ok_or(NotFound::Entity)? {
        Entity::Player(p) => (p.party_id.ok_or(PreconditionFailed::NoParty)?, p.name.clone()),
        Entity::Npc(_) => return Err(anyhow::anyhow!("NPCs do not chat").into()),
    };
    let party = realm_persistence::social::load_party(store, party_id)?.ok_or(PreconditionFailed::NoParty)?;

    let mut outbox = Outbox::new(deps.registry.clone());
    broadcast_party(
        &world,
        &mut outbox,
        &party.member_user_ids,
        &ServerEvent::ConsoleOrErrorMsg { opcode: realm_protocol::opcodes::server::CONSOLE_MSG, text: format!("[party] {name}: {text}") },
    );
    drop(world);
    outbox.flush();
    Ok(())
}
