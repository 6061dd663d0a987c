use serde::{Deserialize, Serialize};

pub type SpellId = u16;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum SpellEffect {
    Damage,
    Heal,
    Paralyze,
    Blind,
    Invisibility,
    Teleport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellDef {
    pub id: SpellId,
    pub name: String,
    pub mana_cost: u16,
    /// Max Manhattan range; default cap is 10 per `spec.md` §8 boundary
    /// behaviors ("spell cast at range > configured max").
    pub max_range: u8,
    pub effect: SpellEffect,
    pub min_power: i32,
    pub max_power: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpellCatalog {
    pub spells: hashbrown::HashMap<SpellId, SpellDef>,
}

impl SpellCatalog {
    pub fn get(&self, id: SpellId) -> Option<&SpellDef> {
        self.spells.get(&id)
    }
}
