use serde::{Deserialize, Serialize};

pub type ItemId = u16;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum ItemKind {
    Weapon,
    Armor,
    Consumable,
    Container,
    Currency,
    Misc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: ItemId,
    pub name: String,
    pub kind: ItemKind,
    pub max_stack: u16,
    /// Inventory/spellbook slot this item equips into, if equippable.
    pub equip_slot: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemCatalog {
    pub items: hashbrown::HashMap<ItemId, ItemDef>,
}

impl ItemCatalog {
    pub fn get(&self, id: ItemId) -> Option<&ItemDef> {
        self.items.get(&id)
    }
}
