//! Bank deposit/extract (`spec.md` §4.10 "banking"). Deposits into the
//! destination hash before removing from the source, same discipline
//! as `Store::transfer_stackable`, applied by hand because slots here
//! are `"item_id:qty"` strings rather than raw integer fields.

use realm_persistence::items::{self, SlotStack};
use realm_persistence::Store;
use realm_shared::error::HandlerError;

use super::inventory::{place_stack, take_from_slot, BANK_SLOTS, INVENTORY_SLOTS};

pub fn deposit(store: &Store, user_id: u64, slot: u8, quantity: u16) -> Result<(), HandlerError> {
    let inventory = items::load_inventory(store, user_id)?;
    let remaining = take_from_slot(&inventory, slot, quantity)?;
    let item_id = inventory
        .get(&slot)
        .ok_or(realm_shared::error::PreconditionFailed::InsufficientItems)?
        .item_id;

    let bank = items::load_bank(store, user_id)?;
    let (bank_slot, bank_stack) = place_stack(&bank, BANK_SLOTS, SlotStack { item_id, qty: quantity })?;
    items::set_bank_slot(store, user_id, bank_slot, bank_stack)?;

    if remaining.qty == 0 {
        items::clear_inventory_slot(store, user_id, slot)?;
    } else {
        items::set_inventory_slot(store, user_id, slot, remaining)?;
    }

    Ok(())
}

pub fn extract(store: &Store, user_id: u64, slot: u8, quantity: u16) -> Result<(), HandlerError> {
    let bank = items::load_bank(store, user_id)?;
    let remaining = take_from_slot(&bank, slot, quantity)?;
    let item_id = bank
        .get(&slot)
        .ok_or(realm_shared::error::PreconditionFailed::InsufficientItems)?
        .item_id;

    let inventory = items::load_inventory(store, user_id)?;
    let (inv_slot, inv_stack) = place_stack(&inventory, INVENTORY_SLOTS, SlotStack { item_id, qty: quantity })?;
    items::set_inventory_slot(store, user_id, inv_slot, inv_stack)?;

    if remaining.qty == 0 {
        items::clear_bank_slot(store, user_id, slot)?;
    } else {
        items::set_bank_slot(store, user_id, slot, remaining)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashMap;

    #[test]
    fn take_from_slot_rejects_when_source_is_short() {
        let mut slots: HashMap<u8, SlotStack> = HashMap::new();
        slots.insert(1, SlotStack { item_id: 5, qty: 2 });
        assert!(take_from_slot(&slots, 1, 3).is_err());
    }

    #[test]
    fn place_stack_merges_on_target_side() {
        let mut bank: HashMap<u8, SlotStack> = HashMap::new();
        bank.insert(1, SlotStack { item_id: 9, qty: 4 });
        let (slot, stack) = place_stack(&bank, BANK_SLOTS, SlotStack { item_id: 9, qty: 6 }).unwrap();
        assert_eq!(slot, 1);
        assert_eq!(stack.qty, 10);
    }
}
