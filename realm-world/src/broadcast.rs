//! Observer computation for event fan-out (`spec.md` §4.8). Thin
//! wrapper over [`MapManager::get_observers`] plus the party/clan
//! membership rules, so effects and handlers share one place that
//! decides "who sees this".

use realm_protocol::ServerEvent;

use crate::entity::SessionId;
use crate::map_manager::{MapManager, DEFAULT_VIEW_RADIUS};
use crate::outbox::Outbox;

/// Movement, attack FX, chat (public), create/remove character:
/// observers = every session on the map within view range of the
/// event's coordinates.
pub fn broadcast_area(world: &MapManager, outbox: &mut Outbox, map: u16, x: u8, y: u8, event: &ServerEvent) {
    let observers = world.get_observers(map, x, y, DEFAULT_VIEW_RADIUS);
    outbox.push_many(observers, event.encode());
}

/// Private message: observer is exactly the target session.
pub fn send_to_session(outbox: &mut Outbox, session_id: SessionId, event: &ServerEvent) {
    outbox.push(session_id, event.encode());
}

/// Party chat / party experience share: observers = the party's member
/// sessions.
pub fn broadcast_party(world: &MapManager, outbox: &mut Outbox, member_user_ids: &[u64], event: &ServerEvent) {
    let bytes = event.encode();
    for entity in world.all_entities() {
        if let Some(p) = entity.as_player() {
            if member_user_ids.contains(&p.user_id) {
                outbox.push(p.session_id, bytes.clone());
            }
        }
    }
}

/// Clan chat: observers = sessions whose player is a clan member.
pub fn broadcast_clan(world: &MapManager, outbox: &mut Outbox, clan_id: u64, event: &ServerEvent) {
    let bytes = event.encode();
    for entity in world.all_entities() {
        if let Some(p) = entity.as_player() {
            if p.clan_id == Some(clan_id) {
                outbox.push(p.session_id, bytes.clone());
            }
        }
    }
}
