use serde::{Deserialize, Serialize};

pub type NpcTemplateId = u16;
pub type LootTableId = u16;

/// Static definition an NPC instance is stamped from at spawn time
/// (`spec.md` §3 "NPC" data model, behavior flags from §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcTemplateDef {
    pub id: NpcTemplateId,
    pub name: String,
    pub max_hp: i32,
    pub hostile: bool,
    pub attackable: bool,
    pub merchant: bool,
    pub banker: bool,
    pub is_static: bool,
    pub aggro_range: u8,
    pub attack_cooldown_s: u64,
    pub attack_min: i32,
    pub attack_max: i32,
    pub loot_table_id: Option<LootTableId>,
    pub experience_reward: u32,
    pub gold_min: u32,
    pub gold_max: u32,
    pub respawn_delay_s: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NpcTemplateCatalog {
    pub templates: hashbrown::HashMap<NpcTemplateId, NpcTemplateDef>,
}

impl NpcTemplateCatalog {
    pub fn get(&self, id: NpcTemplateId) -> Option<&NpcTemplateDef> {
        self.templates.get(&id)
    }
}

/// One row of a loot table roll (`spec.md` §4.10 "roll loot table").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LootEntry {
    pub item_id: u16,
    /// Roll chance in `0.0..=1.0`.
    pub chance: f32,
    pub qty_min: u16,
    pub qty_max: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LootTableDef {
    pub id: LootTableId,
    pub entries: Vec<LootEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LootTableCatalog {
    pub tables: hashbrown::HashMap<LootTableId, LootTableDef>,
}

impl LootTableCatalog {
    pub fn get(&self, id: LootTableId) -> Option<&LootTableDef> {
        self.tables.get(&id)
    }
}

/// Spawn configuration: where an NPC template instance is anchored
/// (`spec.md` GLOSSARY "spawn anchor").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnDef {
    pub template_id: NpcTemplateId,
    pub map: u16,
    pub x: u8,
    pub y: u8,
}
