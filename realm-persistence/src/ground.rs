//! Ground item persistence (`spec.md` §4.4 "ground items survive a
//! restart", §4.9). Each tile that has ever held a dropped item gets its
//! own hash; an empty/missing hash means the tile is clear.

use realm_shared::error::HandlerError;

use crate::items::SlotStack;
use crate::keys;
use crate::store::Store;

pub fn load(store: &Store, map: u16, x: u8, y: u8) -> Result<Option<SlotStack>, HandlerError> {
    let key = keys::ground(map, x, y);
    let item_id = store.hget(&key, "item_id")?;
    let qty = store.hget(&key, "qty")?;
    match (item_id, qty) {
        (Some(item_id), Some(qty)) => Ok(Some(SlotStack {
            item_id: item_id
                .parse()
                .map_err(|_| anyhow::anyhow!("corrupt ground item_id at {map}:{x}:{y}"))?,
            qty: qty
                .parse()
                .map_err(|_| anyhow::anyhow!("corrupt ground qty at {map}:{x}:{y}"))?,
        })),
        _ => Ok(None),
    }
}

pub fn set(store: &Store, map: u16, x: u8, y: u8, stack: SlotStack) -> Result<(), HandlerError> {
    let key = keys::ground(map, x, y);
    store.hset(&key, "item_id", &stack.item_id.to_string())?;
    store.hset(&key, "qty", &stack.qty.to_string())?;
    Ok(())
}

pub fn clear(store: &Store, map: u16, x: u8, y: u8) -> Result<(), HandlerError> {
    store.del(&keys::ground(map, x, y))?;
    Ok(())
}
