//! Static game data loaded once at startup and shared read-only across
//! every worker thread (`spec.md` §1 "Catalogs", §6 "Startup sequence").

pub mod classes;
pub mod commerce;
pub mod items;
pub mod maps;
pub mod npcs;
pub mod spells;

use std::path::Path;

use anyhow::{Context, Result};

pub use classes::{ClassCatalog, ClassDef, ClassId};
pub use commerce::{CommerceCatalog, MerchantDef};
pub use items::{ItemCatalog, ItemDef, ItemId};
pub use maps::{MapCatalog, MapDef, MapFile};
pub use npcs::{LootTableCatalog, LootTableDef, NpcTemplateCatalog, NpcTemplateDef, SpawnDef};
pub use spells::{SpellCatalog, SpellDef};

/// The full set of read-only game data, bundled so handlers take one
/// `&Catalogs` reference instead of five.
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    pub items: ItemCatalog,
    pub spells: SpellCatalog,
    pub npcs: NpcTemplateCatalog,
    pub loot_tables: LootTableCatalog,
    pub spawns: Vec<SpawnDef>,
    pub maps: MapCatalog,
    pub commerce: CommerceCatalog,
    pub classes: ClassCatalog,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading catalog file {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing catalog file {}", path.display()))
}

impl Catalogs {
    /// Loads every catalog from `dir`. A failure here is fatal: the
    /// caller aborts startup rather than run with partial data
    /// (`spec.md` §6).
    ///
    /// Expected layout:
    /// ```text
    /// dir/items.json
    /// dir/spells.json
    /// dir/npcs.json
    /// dir/loot_tables.json
    /// dir/spawns.json
    /// dir/commerce.json
    /// dir/classes.json
    /// dir/maps/*.json
    /// ```
    pub fn load_dir(dir: &Path) -> Result<Catalogs> {
        let items: ItemCatalog = read_json(&dir.join("items.json"))?;
        let spells: SpellCatalog = read_json(&dir.join("spells.json"))?;
        let npcs: NpcTemplateCatalog = read_json(&dir.join("npcs.json"))?;
        let loot_tables: LootTableCatalog = read_json(&dir.join("loot_tables.json"))?;
        let spawns: Vec<SpawnDef> = read_json(&dir.join("spawns.json"))?;
        let commerce_file: commerce::CommerceFile = read_json(&dir.join("commerce.json"))?;
        let classes: ClassCatalog = read_json(&dir.join("classes.json"))?;
        let maps = Self::load_maps(&dir.join("maps"))?;

        Ok(Catalogs {
            items,
            spells,
            npcs,
            loot_tables,
            spawns,
            maps,
            commerce: commerce_file.into(),
            classes,
        })
    }

    fn load_maps(dir: &Path) -> Result<MapCatalog> {
        let mut catalog = MapCatalog::default();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("reading map directory {}", dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let file: MapFile = read_json(&path)?;
            let map: MapDef = file.into();
            catalog.maps.insert(map.id, map);
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn load_dir_reads_every_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        write_file(&root.join("items.json"), r#"{"items":{}}"#);
        write_file(&root.join("spells.json"), r#"{"spells":{}}"#);
        write_file(&root.join("npcs.json"), r#"{"templates":{}}"#);
        write_file(&root.join("loot_tables.json"), r#"{"tables":{}}"#);
        write_file(&root.join("spawns.json"), "[]");
        write_file(&root.join("commerce.json"), r#"{"merchants":[]}"#);
        write_file(&root.join("classes.json"), r#"{"classes":{}}"#);
        write_file(
            &root.join("maps/1.json"),
            &serde_json::to_string(&MapFile {
                id: 1,
                name: "Ullathorpe".into(),
                blocked: vec![vec![false; maps::MAP_SIZE]; maps::MAP_SIZE],
                exits: vec![],
                doors: vec![],
                signs: vec![],
                music_id: 5,
                safe_zone: true,
                restrict_pvp: true,
                death_location: (50, 50),
            })
            .unwrap(),
        );

        let catalogs = Catalogs::load_dir(root).expect("catalogs should load");
        assert!(catalogs.maps.get(1).is_some());
        assert_eq!(catalogs.maps.get(1).unwrap().name, "Ullathorpe");
    }

    #[test]
    fn load_dir_fails_loudly_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Catalogs::load_dir(dir.path()).is_err());
    }
}
