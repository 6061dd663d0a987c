use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

pub type ClassId = u8;

/// Starting attributes and per-level growth for a character class
/// (`spec.md` §3 "Player" data model, GLOSSARY "class").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub id: ClassId,
    pub name: String,
    pub base_hp: i32,
    pub base_mana: i32,
    pub hp_per_level: i32,
    pub mana_per_level: i32,
    /// Whether this class can cast spells at all.
    pub can_cast: bool,
    pub starting_map: u16,
    pub starting_x: u8,
    pub starting_y: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassCatalog {
    pub classes: HashMap<ClassId, ClassDef>,
}

impl ClassCatalog {
    pub fn get(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(&id)
    }
}
