//! Inventory, bank and spellbook persistence (`spec.md` §4.9, §4.10
//! "item/gold movement"). Each slot collection is a hash keyed by slot
//! index, field value a `"item_id:qty"` pair, matching the wire
//! protocol's `(slot, item_id, qty)` triples (`realm-protocol`'s
//! `read_inventory_slot`/`read_spellbook_slot`).

use hashbrown::HashMap;

use realm_shared::error::HandlerError;

use crate::keys;
use crate::store::Store;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SlotStack {
    pub item_id: u16,
    pub qty: u16,
}

fn encode(stack: SlotStack) -> String {
    format!("{}:{}", stack.item_id, stack.qty)
}

fn decode(raw: &str) -> Option<SlotStack> {
    let (item_id, qty) = raw.split_once(':')?;
    Some(SlotStack {
        item_id: item_id.parse().ok()?,
        qty: qty.parse().ok()?,
    })
}

fn load_slots(store: &Store, key: &str) -> Result<HashMap<u8, SlotStack>, HandlerError> {
    let raw = store.hget_all(key)?;
    let mut slots = HashMap::new();
    for (slot, value) in raw {
        let slot: u8 = slot
            .parse()
            .map_err(|_| anyhow::anyhow!("corrupt slot key {slot} in {key}"))?;
        let stack =
            decode(&value).ok_or_else(|| anyhow::anyhow!("corrupt slot value {value} in {key}"))?;
        slots.insert(slot, stack);
    }
    Ok(slots)
}

pub fn load_inventory(store: &Store, user_id: u64) -> Result<HashMap<u8, SlotStack>, HandlerError> {
    load_slots(store, &keys::inventory(user_id))
}

pub fn load_bank(store: &Store, user_id: u64) -> Result<HashMap<u8, SlotStack>, HandlerError> {
    load_slots(store, &keys::bank(user_id))
}

pub fn load_spellbook(store: &Store, user_id: u64) -> Result<HashMap<u8, u16>, HandlerError> {
    let raw = store.hget_all(&keys::spellbook(user_id))?;
    let mut slots = HashMap::new();
    for (slot, value) in raw {
        let slot: u8 = slot
            .parse()
            .map_err(|_| anyhow::anyhow!("corrupt spellbook slot {slot}"))?;
        let spell_id: u16 = value
            .parse()
            .map_err(|_| anyhow::anyhow!("corrupt spellbook value {value}"))?;
        slots.insert(slot, spell_id);
    }
    Ok(slots)
}

pub fn set_inventory_slot(
    store: &Store,
    user_id: u64,
    slot: u8,
    stack: SlotStack,
) -> Result<(), HandlerError> {
    store.hset(&keys::inventory(user_id), &slot.to_string(), &encode(stack))?;
    Ok(())
}

pub fn clear_inventory_slot(store: &Store, user_id: u64, slot: u8) -> Result<(), HandlerError> {
    store.hdel(&keys::inventory(user_id), &slot.to_string())?;
    Ok(())
}

pub fn set_bank_slot(store: &Store, user_id: u64, slot: u8, stack: SlotStack) -> Result<(), HandlerError> {
    store.hset(&keys::bank(user_id), &slot.to_string(), &encode(stack))?;
    Ok(())
}

pub fn clear_bank_slot(store: &Store, user_id: u64, slot: u8) -> Result<(), HandlerError> {
    store.hdel(&keys::bank(user_id), &slot.to_string())?;
    Ok(())
}

pub fn set_spellbook_slot(store: &Store, user_id: u64, slot: u8, spell_id: u16) -> Result<(), HandlerError> {
    store.hset(&keys::spellbook(user_id), &slot.to_string(), &spell_id.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips() {
        let stack = SlotStack { item_id: 42, qty: 7 };
        assert_eq!(decode(&encode(stack)), Some(stack));
    }

    #[test]
    fn decode_rejects_malformed_values() {
        assert_eq!(decode("not-a-stack"), None);
        assert_eq!(decode("42"), None);
    }
}
