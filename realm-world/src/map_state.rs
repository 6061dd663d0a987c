//! Per-map runtime state: occupancy over the static blocked bitmap,
//! ground items, and the reverse entity index (`spec.md` §4.4 "Storage
//! layout decisions").

use hashbrown::HashMap;

use realm_catalogs::maps::MapDef;
use realm_persistence::items::SlotStack;
use realm_shared::ids::CharIndex;

pub struct MapState {
    pub def: MapDef,
    pub occupancy: HashMap<(u8, u8), CharIndex>,
    pub ground_items: HashMap<(u8, u8), SlotStack>,
}

impl MapState {
    pub fn new(def: MapDef) -> MapState {
        MapState {
            def,
            occupancy: HashMap::new(),
            ground_items: HashMap::new(),
        }
    }

    pub fn in_bounds(&self, x: u8, y: u8) -> bool {
        MapDef::in_bounds(x, y)
    }

    pub fn is_blocked(&self, x: u8, y: u8) -> bool {
        self.def.is_blocked(x, y)
    }

    pub fn is_occupied(&self, x: u8, y: u8) -> bool {
        self.occupancy.contains_key(&(x, y))
    }

    pub fn can_move_to(&self, x: u8, y: u8) -> bool {
        self.in_bounds(x, y) && !self.is_blocked(x, y) && !self.is_occupied(x, y)
    }
}
