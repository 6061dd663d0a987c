use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::items::ItemId;
use crate::npcs::NpcTemplateId;

/// One item a merchant NPC stocks (`spec.md` §4.10 "buy/sell from merchant").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantStockEntry {
    pub item_id: ItemId,
    pub price_gold: u32,
    /// `None` means the merchant never runs out.
    pub stock_qty: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantDef {
    pub npc_template_id: NpcTemplateId,
    pub sells: Vec<MerchantStockEntry>,
    /// Fraction of listed price paid when a player sells an item back,
    /// `0.0..=1.0`.
    pub buyback_rate: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommerceFile {
    #[serde(default)]
    pub merchants: Vec<MerchantDef>,
}

#[derive(Debug, Clone, Default)]
pub struct CommerceCatalog {
    pub merchants: HashMap<NpcTemplateId, MerchantDef>,
}

impl From<CommerceFile> for CommerceCatalog {
    fn from(file: CommerceFile) -> CommerceCatalog {
        CommerceCatalog {
            merchants: file
                .merchants
                .into_iter()
                .map(|m| (m.npc_template_id, m))
                .collect(),
        }
    }
}

impl CommerceCatalog {
    pub fn get(&self, npc_template_id: NpcTemplateId) -> Option<&MerchantDef> {
        self.merchants.get(&npc_template_id)
    }

    pub fn price_of(&self, npc_template_id: NpcTemplateId, item_id: ItemId) -> Option<u32> {
        self.get(npc_template_id)?
            .sells
            .iter()
            .find(|e| e.item_id == item_id)
            .map(|e| e.price_gold)
    }
}
