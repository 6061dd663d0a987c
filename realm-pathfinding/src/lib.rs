//! A* pathfinding on the 4-connected tile grid (`spec.md` §4.5 "Movement:
//! pathfinding"). Written fresh for this crate: nothing in the reference
//! pack touches pathfinding, so the module follows the plain-data,
//! no-macro style the rest of the workspace uses rather than any single
//! grounding file.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};

/// Cardinal direction a step moves in, matching the wire protocol's
/// heading values.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Heading {
    North,
    East,
    South,
    West,
}

impl Heading {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Heading::North => (0, -1),
            Heading::South => (0, 1),
            Heading::East => (1, 0),
            Heading::West => (-1, 0),
        }
    }

    fn all() -> [Heading; 4] {
        [Heading::North, Heading::South, Heading::East, Heading::West]
    }
}

/// Anything `next_step` can query for passability. Implemented by the
/// map catalog's blocked-tile bitmap in the world crate.
pub trait Grid {
    fn in_bounds(&self, x: u8, y: u8) -> bool;
    fn is_blocked(&self, x: u8, y: u8) -> bool;
}

type Tile = (u8, u8);

fn manhattan(a: Tile, b: Tile) -> u32 {
    (a.0 as i32 - b.0 as i32).unsigned_abs() + (a.1 as i32 - b.1 as i32).unsigned_abs()
}

fn neighbors(grid: &dyn Grid, tile: Tile) -> Vec<(Tile, Heading)> {
    let mut out = Vec::with_capacity(4);
    for heading in Heading::all() {
        let (dx, dy) = heading.delta();
        let nx = tile.0 as i32 + dx;
        let ny = tile.1 as i32 + dy;
        if nx < 0 || ny < 0 || nx > u8::MAX as i32 || ny > u8::MAX as i32 {
            continue;
        }
        let (nx, ny) = (nx as u8, ny as u8);
        if grid.in_bounds(nx, ny) && !grid.is_blocked(nx, ny) {
            out.push(((nx, ny), heading));
        }
    }
    out
}

#[derive(Eq, PartialEq)]
struct OpenEntry {
    f: u32,
    h: u32,
    tile: Tile,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the lowest f (and, tied,
        // the lowest h) comes out first.
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Runs A* from `start` towards `goal` and returns the single next step
/// (destination tile and the heading that reaches it), or `None` if no
/// path exists within `max_expand` node expansions.
///
/// If `goal` itself is blocked, the search instead targets the open
/// neighbor of `goal` closest to `start` (goal-neighbor fallback), so a
/// player can still approach an occupied or blocked destination tile.
pub fn next_step(
    grid: &dyn Grid,
    start: Tile,
    goal: Tile,
    max_expand: usize,
) -> Option<(u8, u8, Heading)> {
    if start == goal {
        return None;
    }

    let target = if grid.is_blocked(goal.0, goal.1) {
        neighbors(grid, goal)
            .into_iter()
            .map(|(t, _)| t)
            .min_by_key(|&t| manhattan(t, start))?
    } else {
        goal
    };

    if start == target {
        return None;
    }

    let mut open = BinaryHeap::new();
    let mut came_from: HashMap<Tile, (Tile, Heading)> = HashMap::new();
    let mut g_score: HashMap<Tile, u32> = HashMap::new();
    let mut closed: HashSet<Tile> = HashSet::new();

    g_score.insert(start, 0);
    open.push(OpenEntry {
        f: manhattan(start, target),
        h: manhattan(start, target),
        tile: start,
    });

    let mut expansions = 0usize;

    while let Some(OpenEntry { tile: current, .. }) = open.pop() {
        if current == target {
            return reconstruct_first_step(&came_from, start, current);
        }

        if closed.contains(&current) {
            continue;
        }
        closed.insert(current);

        expansions += 1;
        if expansions > max_expand {
            return None;
        }

        let current_g = *g_score.get(&current).unwrap_or(&u32::MAX);

        for (next, heading) in neighbors(grid, current) {
            if closed.contains(&next) {
                continue;
            }
            let tentative_g = current_g + 1;
            if tentative_g < *g_score.get(&next).unwrap_or(&u32::MAX) {
                came_from.insert(next, (current, heading));
                g_score.insert(next, tentative_g);
                let h = manhattan(next, target);
                open.push(OpenEntry {
                    f: tentative_g + h,
                    h,
                    tile: next,
                });
            }
        }
    }

    None
}

fn reconstruct_first_step(
    came_from: &HashMap<Tile, (Tile, Heading)>,
    start: Tile,
    goal: Tile,
) -> Option<(u8, u8, Heading)> {
    let mut current = goal;
    let mut last_step = None;

    while let Some(&(prev, heading)) = came_from.get(&current) {
        if prev == start {
            return Some((current.0, current.1, heading));
        }
        last_step = Some(heading);
        current = prev;
    }

    // Only happens if start == goal, already rejected above.
    last_step.map(|h| (goal.0, goal.1, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OpenGrid {
        size: u8,
        blocked: HashSet<Tile>,
    }

    impl Grid for OpenGrid {
        fn in_bounds(&self, x: u8, y: u8) -> bool {
            (1..=self.size).contains(&x) && (1..=self.size).contains(&y)
        }
        fn is_blocked(&self, x: u8, y: u8) -> bool {
            self.blocked.contains(&(x, y))
        }
    }

    #[test]
    fn straight_line_moves_toward_goal() {
        let grid = OpenGrid { size: 20, blocked: HashSet::new() };
        let (nx, ny, heading) = next_step(&grid, (5, 5), (5, 10), 50).unwrap();
        assert_eq!((nx, ny), (5, 6));
        assert_eq!(heading, Heading::South);
    }

    #[test]
    fn routes_around_a_wall() {
        let mut blocked = HashSet::new();
        for y in 1..=9 {
            blocked.insert((5, y));
        }
        let grid = OpenGrid { size: 20, blocked };
        let step = next_step(&grid, (3, 5), (7, 5), 200);
        assert!(step.is_some());
        let (nx, ny, _) = step.unwrap();
        assert_ne!((nx, ny), (5, 5));
    }

    #[test]
    fn unreachable_within_budget_returns_none() {
        let mut blocked = HashSet::new();
        for y in 1..=20 {
            blocked.insert((5, y));
        }
        let grid = OpenGrid { size: 20, blocked };
        assert!(next_step(&grid, (3, 5), (7, 5), 20).is_none());
    }

    #[test]
    fn blocked_goal_falls_back_to_nearest_open_neighbor() {
        let mut blocked = HashSet::new();
        blocked.insert((5, 5));
        let grid = OpenGrid { size: 20, blocked };
        let step = next_step(&grid, (5, 1), (5, 5), 50);
        assert!(step.is_some());
    }

    #[test]
    fn same_tile_has_no_step() {
        let grid = OpenGrid { size: 20, blocked: HashSet::new() };
        assert!(next_step(&grid, (5, 5), (5, 5), 50).is_none());
    }
}
