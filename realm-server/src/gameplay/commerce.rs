//! Merchant buy/sell (`spec.md` §4.10 "commerce"). Inventory and gold
//! are authoritative in the KV store and on the live `PlayerState`
//! respectively, so every call here round-trips through both.

use realm_catalogs::npcs::NpcTemplateId;
use realm_catalogs::Catalogs;
use realm_persistence::items::{self, SlotStack};
use realm_persistence::Store;
use realm_shared::error::{HandlerError, NotFound, PreconditionFailed};
use realm_shared::ids::CharIndex;
use realm_world::entity::Entity;
use realm_world::map_manager::MapManager;

use super::inventory::{place_stack, take_from_slot, INVENTORY_SLOTS};

/// Looks for a merchant NPC standing next to `player` (`spec.md` §4.10
/// "must be adjacent to the merchant to trade").
pub fn find_adjacent_merchant(
    world: &MapManager,
    catalogs: &Catalogs,
    player: CharIndex,
) -> Result<(CharIndex, NpcTemplateId), HandlerError> {
    let (map, x, y) = world.get_entity(player).ok_or(NotFound::Entity)?.position();
    let candidates = [
        (x.wrapping_sub(1), y),
        (x.wrapping_add(1), y),
        (x, y.wrapping_sub(1)),
        (x, y.wrapping_add(1)),
    ];

    for (cx, cy) in candidates {
        if let Some(idx) = world.entity_index_at(map, cx, cy) {
            if let Some(Entity::Npc(n)) = world.get_entity(idx) {
                if catalogs.npcs.get(n.template_id).is_some_and(|t| t.merchant) {
                    return Ok((idx, n.template_id));
                }
            }
        }
    }

    Err(PreconditionFailed::NotAvailable.into())
}

/// Buys `quantity` of whatever `merchant` lists at stock index `stock_slot`.
pub fn buy(
    world: &mut MapManager,
    store: &Store,
    catalogs: &Catalogs,
    buyer: CharIndex,
    merchant: NpcTemplateId,
    stock_slot: u8,
    quantity: u16,
) -> Result<u32, HandlerError> {
    let def = catalogs.commerce.get(merchant).ok_or(PreconditionFailed::NotAvailable)?;
    let entry = def.sells.get(stock_slot as usize).ok_or(NotFound::Item)?;
    let total_cost = entry.price_gold.saturating_mul(quantity as u32);

    let (user_id, gold) = match world.get_entity(buyer).ok_or(NotFound::Entity)? {
        Entity::Player(p) => (p.user_id, p.gold),
        Entity::Npc(_) => return Err(anyhow::anyhow!("NPCs do not buy").into()),
    };
    if gold < total_cost {
        return Err(PreconditionFailed::InsufficientGold.into());
    }

    let existing = items::load_inventory(store, user_id)?;
    let (slot, stack) = place_stack(&existing, INVENTORY_SLOTS, SlotStack { item_id: entry.item_id, qty: quantity })?;
    items::set_inventory_slot(store, user_id, slot, stack)?;

    if let Some(Entity::Player(p)) = world.get_entity_mut(buyer) {
        p.gold -= total_cost;
    }

    Ok(total_cost)
}

/// Sells `quantity` out of the seller's inventory `slot` back to `merchant`.
pub fn sell(
    world: &mut MapManager,
    store: &Store,
    catalogs: &Catalogs,
    seller: CharIndex,
    merchant: NpcTemplateId,
    slot: u8,
    quantity: u16,
) -> Result<u32, HandlerError> {
    let def = catalogs.commerce.get(merchant).ok_or(PreconditionFailed::NotAvailable)?;

    let user_id = match world.get_entity(seller).ok_or(NotFound::Entity)? {
        Entity::Player(p) => p.user_id,
        Entity::Npc(_) => return Err(anyhow::anyhow!("NPCs do not sell").into()),
    };

    let existing = items::load_inventory(store, user_id)?;
    let remaining = take_from_slot(&existing, slot, quantity)?;
    let item_id = existing.get(&slot).ok_or(PreconditionFailed::InsufficientItems)?.item_id;

    let price = catalogs
        .commerce
        .price_of(merchant, item_id)
        .ok_or(PreconditionFailed::NotAvailable)?;
    let refund = ((price as f32) * def.buyback_rate * quantity as f32) as u32;

    if remaining.qty == 0 {
        items::clear_inventory_slot(store, user_id, slot)?;
    } else {
        items::set_inventory_slot(store, user_id, slot, remaining)?;
    }

    if let Some(Entity::Player(p)) = world.get_entity_mut(seller) {
        p.gold = p.gold.saturating_add(refund);
    }

    Ok(refund)
}

#[cfg(test)]
mod tests {
    use super::*;
    use realm_catalogs::maps::MapDef;
    use realm_catalogs::npcs::NpcTemplateDef;
    use realm_catalogs::MapCatalog;
    use realm_world::map_manager::PlayerSpawn;

    fn catalogs_with_merchant() -> Catalogs {
        let mut catalogs = Catalogs::default();
        catalogs.npcs.templates.insert(
            1,
            NpcTemplateDef {
                id: 1,
                name: "Shopkeep".into(),
                max_hp: 50,
                hostile: false,
                attackable: false,
                merchant: true,
                banker: false,
                is_static: true,
                aggro_range: 0,
                attack_cooldown_s: 0,
                attack_min: 0,
                attack_max: 0,
                loot_table_id: None,
                experience_reward: 0,
                gold_min: 0,
                gold_max: 0,
                respawn_delay_s: 0,
            },
        );
        catalogs
    }

    fn world_with_player_and_merchant() -> (MapManager, CharIndex, CharIndex) {
        let mut maps = MapCatalog::default();
        maps.maps.insert(1, MapDef::new_empty(1, "test"));
        let mut world = MapManager::new(maps);
        let catalogs = catalogs_with_merchant();
        let (player, _) = world
            .add_player(
                1,
                PlayerSpawn {
                    user_id: 7,
                    name: "Hero".into(),
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
                    gold: 100,
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
            .unwrap();
        let merchant = world.spawn_npc(catalogs.npcs.get(1).unwrap(), 1, 5, 6).unwrap();
        (world, player, merchant)
    }

    #[test]
    fn find_adjacent_merchant_finds_npc_with_merchant_flag() {
        let (world, player, merchant) = world_with_player_and_merchant();
        let catalogs = catalogs_with_merchant();
        let (found, template_id) = find_adjacent_merchant(&world, &catalogs, player).unwrap();
        assert_eq!(found, merchant);
        assert_eq!(template_id, 1);
    }

    #[test]
    fn find_adjacent_merchant_fails_when_nothing_adjacent() {
        let mut maps = MapCatalog::default();
        maps.maps.insert(1, MapDef::new_empty(1, "test"));
        let mut world = MapManager::new(maps);
        let catalogs = catalogs_with_merchant();
        let (player, _) = world
            .add_player(
                1,
                PlayerSpawn {
                    user_id: 7,
                    name: "Hero".into(),
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
                    gold: 100,
                    map: 1,
                    x: 50,
                    y: 50,
                    heading: 0,
                    alive: true,
                    party_id: None,
                    clan_id: None,
                    guild_rank: None,
                    respawn_at: None,
                    last_saved_at: 0,
                },
            )
            .unwrap();
        assert!(find_adjacent_merchant(&world, &catalogs, player).is_err());
    }
}
