use std::fmt;

/// World-unique handle for a renderable entity (player or NPC). Clients key
/// everything visual by `char_index`; see `spec.md` GLOSSARY.
///
/// Players and NPCs are allocated from disjoint ranges so a `CharIndex`
/// alone never needs a side tag to tell which kind of entity it names.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct CharIndex(u32);

/// First id handed out to NPCs. Players occupy `1..NPC_RANGE_START`.
pub const NPC_RANGE_START: u32 = 1_000_000;

impl CharIndex {
    #[inline]
    pub const fn new(id: u32) -> CharIndex {
        CharIndex(id)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_npc(self) -> bool {
        self.0 >= NPC_RANGE_START
    }
}

impl fmt::Display for CharIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Allocates `CharIndex` values for players (low range) and NPCs (high
/// range) from two independent counters, so a freed id is never reused
/// while the other kind is still allocating — avoids any ambiguity in
/// logs or persisted ground-item `owner` fields after a respawn cycle.
pub struct CharIndexAllocator {
    next_player: u32,
    next_npc: u32,
}

impl Default for CharIndexAllocator {
    fn default() -> Self {
        CharIndexAllocator {
            next_player: 1,
            next_npc: NPC_RANGE_START,
        }
    }
}

impl CharIndexAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_player(&mut self) -> CharIndex {
        let id = self.next_player;
        self.next_player += 1;
        CharIndex::new(id)
    }

    pub fn next_npc(&mut self) -> CharIndex {
        let id = self.next_npc;
        self.next_npc += 1;
        CharIndex::new(id)
    }
}

/// Persistent account identifier, stable across sessions (`spec.md` §4.9's
/// `accounts:counter`).
pub type UserId = u64;

/// Map identifier, `1..=290` in the fixed world this core addresses.
pub type MapId = u16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_and_npc_ranges_never_overlap() {
        let mut alloc = CharIndexAllocator::new();
        let p1 = alloc.next_player();
        let n1 = alloc.next_npc();
        assert!(!p1.is_npc());
        assert!(n1.is_npc());
        assert!(p1.get() < n1.get());
    }

    #[test]
    fn allocator_is_monotonic() {
        let mut alloc = CharIndexAllocator::new();
        let a = alloc.next_player();
        let b = alloc.next_player();
        assert!(b.get() > a.get());
    }
}
