use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

pub const MAP_SIZE: usize = 100;

/// `(x, y)` exit tile destination (`spec.md` §3, GLOSSARY "exit tile").
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct ExitTile {
    pub dest_map: u16,
    pub dest_x: u8,
    pub dest_y: u8,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sign {
    pub text: String,
}

/// On-disk shape of a map (`spec.md` §3, §4.4 "Storage layout decisions").
/// Tile-keyed tables are flattened to entry lists because `serde_json`
/// cannot key a map by a tuple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapFile {
    pub id: u16,
    pub name: String,
    /// `blocked[y][x]`, `0`-indexed storage for the `1..=100` tile grid.
    pub blocked: Vec<Vec<bool>>,
    #[serde(default)]
    pub exits: Vec<(u8, u8, ExitTile)>,
    #[serde(default)]
    pub doors: Vec<(u8, u8, Door)>,
    #[serde(default)]
    pub signs: Vec<(u8, u8, Sign)>,
    pub music_id: u16,
    #[serde(default)]
    pub safe_zone: bool,
    #[serde(default)]
    pub restrict_pvp: bool,
    pub death_location: (u8, u8),
}

/// Runtime, tile-indexable form of [`MapFile`].
#[derive(Debug, Clone)]
pub struct MapDef {
    pub id: u16,
    pub name: String,
    pub blocked: Vec<Vec<bool>>,
    pub exits: HashMap<(u8, u8), ExitTile>,
    pub doors: HashMap<(u8, u8), Door>,
    pub signs: HashMap<(u8, u8), Sign>,
    pub music_id: u16,
    pub safe_zone: bool,
    pub restrict_pvp: bool,
    pub death_location: (u8, u8),
}

impl From<MapFile> for MapDef {
    fn from(file: MapFile) -> MapDef {
        MapDef {
            id: file.id,
            name: file.name,
            blocked: file.blocked,
            exits: file.exits.into_iter().map(|(x, y, e)| ((x, y), e)).collect(),
            doors: file.doors.into_iter().map(|(x, y, d)| ((x, y), d)).collect(),
            signs: file.signs.into_iter().map(|(x, y, s)| ((x, y), s)).collect(),
            music_id: file.music_id,
            safe_zone: file.safe_zone,
            restrict_pvp: file.restrict_pvp,
            death_location: file.death_location,
        }
    }
}

impl MapDef {
    pub fn new_empty(id: u16, name: impl Into<String>) -> MapDef {
        MapDef {
            id,
            name: name.into(),
            blocked: vec![vec![false; MAP_SIZE]; MAP_SIZE],
            exits: HashMap::new(),
            doors: HashMap::new(),
            signs: HashMap::new(),
            music_id: 0,
            safe_zone: false,
            restrict_pvp: false,
            death_location: (50, 50),
        }
    }

    #[inline]
    pub fn in_bounds(x: u8, y: u8) -> bool {
        (1..=MAP_SIZE as u8).contains(&x) && (1..=MAP_SIZE as u8).contains(&y)
    }

    #[inline]
    pub fn is_blocked(&self, x: u8, y: u8) -> bool {
        if !Self::in_bounds(x, y) {
            return true;
        }
        self.blocked[(y - 1) as usize][(x - 1) as usize]
    }

    pub fn set_blocked(&mut self, x: u8, y: u8, blocked: bool) {
        self.blocked[(y - 1) as usize][(x - 1) as usize] = blocked;
    }

    pub fn exit_at(&self, x: u8, y: u8) -> Option<ExitTile> {
        self.exits.get(&(x, y)).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapCatalog {
    pub maps: HashMap<u16, MapDef>,
}

impl MapCatalog {
    pub fn get(&self, id: u16) -> Option<&MapDef> {
        self.maps.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_map_has_no_blocked_tiles() {
        let map = MapDef::new_empty(1, "test");
        assert!(!map.is_blocked(1, 1));
        assert!(!map.is_blocked(100, 100));
    }

    #[test]
    fn out_of_bounds_counts_as_blocked() {
        let map = MapDef::new_empty(1, "test");
        assert!(map.is_blocked(0, 1));
        assert!(map.is_blocked(101, 1));
    }
}
