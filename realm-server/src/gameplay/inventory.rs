//! Slot allocation shared by pickup/drop/commerce/banking: every one of
//! them needs "merge into a matching stack, else claim the first empty
//! slot" and "take `qty` off a slot, validating it holds enough".

use hashbrown::HashMap;

use realm_persistence::items::SlotStack;
use realm_shared::error::{HandlerError, PreconditionFailed};

pub const INVENTORY_SLOTS: u8 = 20;
pub const BANK_SLOTS: u8 = 40;

/// Adds `stack` to `slots`, merging into a slot already holding the same
/// item if one exists, else claiming the first empty slot `1..=max_slot`.
pub fn place_stack(
    slots: &HashMap<u8, SlotStack>,
    max_slot: u8,
    stack: SlotStack,
) -> Result<(u8, SlotStack), HandlerError> {
    for (&slot, existing) in slots {
        if existing.item_id == stack.item_id {
            return Ok((slot, SlotStack { item_id: stack.item_id, qty: existing.qty + stack.qty }));
        }
    }
    for slot in 1..=max_slot {
        if !slots.contains_key(&slot) {
            return Ok((slot, stack));
        }
    }
    Err(PreconditionFailed::InventoryFull.into())
}

/// Removes `quantity` from `slot`, returning the stack that remains
/// there (`qty == 0` means the slot should be cleared).
pub fn take_from_slot(
    slots: &HashMap<u8, SlotStack>,
    slot: u8,
    quantity: u16,
) -> Result<SlotStack, HandlerError> {
    let existing = slots.get(&slot).ok_or(PreconditionFailed::InsufficientItems)?;
    if existing.qty < quantity {
        return Err(PreconditionFailed::InsufficientItems.into());
    }
    Ok(SlotStack { item_id: existing.item_id, qty: existing.qty - quantity })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_stack_merges_into_existing_slot() {
        let mut slots = HashMap::new();
        slots.insert(3, SlotStack { item_id: 10, qty: 2 });
        let (slot, stack) = place_stack(&slots, INVENTORY_SLOTS, SlotStack { item_id: 10, qty: 5 }).unwrap();
        assert_eq!(slot, 3);
        assert_eq!(stack.qty, 7);
    }

    #[test]
    fn place_stack_claims_first_empty_slot() {
        let mut slots = HashMap::new();
        slots.insert(1, SlotStack { item_id: 99, qty: 1 });
        let (slot, _) = place_stack(&slots, INVENTORY_SLOTS, SlotStack { item_id: 10, qty: 1 }).unwrap();
        assert_eq!(slot, 2);
    }

    #[test]
    fn place_stack_fails_when_full() {
        let mut slots = HashMap::new();
        for slot in 1..=INVENTORY_SLOTS {
            slots.insert(slot, SlotStack { item_id: slot as u16, qty: 1 });
        }
        assert!(place_stack(&slots, INVENTORY_SLOTS, SlotStack { item_id: 500, qty: 1 }).is_err());
    }

    #[test]
    fn take_from_slot_rejects_insufficient_quantity() {
        let mut slots = HashMap::new();
        slots.insert(1, SlotStack { item_id: 10, qty: 2 });
        assert!(take_from_slot(&slots, 1, 5).is_err());
    }
}
