//! Grid pathfinding over one or more zones.
//!
//! [`PathFinder::search`] finds a path from an origin to the nearest of a
//! set of target tiles. Tile cost comes from a per-zone [`CostMatrix`]
//! when it holds a non-zero entry, otherwise from terrain (`plain_cost`,
//! `swamp_cost`; walls are impassable). Zones for which the cost callback
//! returns `None` are not entered at all, which is how callers confine a
//! search to a corridor of zones.
//!
//! When the operation budget runs out or no target is reachable, the result
//! is marked `incomplete` and carries the path to the explored tile closest
//! to any target.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use serde::{Deserialize, Serialize};

use colony_types::{Direction, Position, ZONE_SIZE, ZoneId};

use crate::entity::Terrain;

/// Cost value marking a tile impassable.
pub const IMPASSABLE: u8 = u8::MAX;

/// Per-tile cost overrides for one zone. Zero means "use terrain cost".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostMatrix {
    costs: Vec<u8>,
}

impl CostMatrix {
    /// A matrix with no overrides.
    pub fn new() -> Self {
        let size = usize::from(ZONE_SIZE);
        Self {
            costs: vec![0; size.saturating_mul(size)],
        }
    }

    fn index(x: u8, y: u8) -> usize {
        usize::from(y)
            .saturating_mul(usize::from(ZONE_SIZE))
            .saturating_add(usize::from(x))
    }

    /// Cost override at a local tile.
    pub fn get(&self, x: u8, y: u8) -> u8 {
        self.costs.get(Self::index(x, y)).copied().unwrap_or(IMPASSABLE)
    }

    /// Set the cost override at a local tile.
    pub fn set(&mut self, x: u8, y: u8, cost: u8) {
        if let Some(slot) = self.costs.get_mut(Self::index(x, y)) {
            *slot = cost;
        }
    }
}

impl Default for CostMatrix {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for a single path search.
pub struct PathSearchOptions<'a> {
    /// Cost matrix per zone; `None` forbids entering the zone.
    pub zone_costs: &'a dyn Fn(ZoneId) -> Option<CostMatrix>,
    /// Terrain lookup.
    pub terrain: &'a dyn Fn(Position) -> Terrain,
    /// Cost of stepping onto a plain tile.
    pub plain_cost: u32,
    /// Cost of stepping onto a swamp tile.
    pub swamp_cost: u32,
    /// Maximum number of node expansions before giving up.
    pub max_ops: u32,
}

/// Result of a path search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathSearchResult {
    /// Waypoints from the tile after the origin to the last tile reached.
    pub path: Vec<Position>,
    /// Total cost of the path.
    pub cost: u32,
    /// Node expansions used.
    pub ops: u32,
    /// Whether the path stops short of every target.
    pub incomplete: bool,
}

/// A shortest-path primitive over the tile grid.
pub trait PathFinder {
    /// Search for a path from `origin` to any tile in `targets`.
    fn search(
        &self,
        origin: Position,
        targets: &BTreeSet<Position>,
        options: &PathSearchOptions<'_>,
    ) -> PathSearchResult;
}

/// A* over the eight-connected tile grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridPathFinder;

impl GridPathFinder {
    /// Create a grid pathfinder.
    pub const fn new() -> Self {
        Self
    }
}

/// Range from `pos` to the nearest target.
fn nearest_target_range(pos: Position, targets: &BTreeSet<Position>) -> u32 {
    targets
        .iter()
        .map(|t| pos.range_to(*t))
        .min()
        .unwrap_or(u32::MAX)
}

fn reconstruct(prev: &BTreeMap<Position, Position>, origin: Position, end: Position) -> Vec<Position> {
    let mut path = Vec::new();
    let mut current = end;
    while current != origin {
        path.push(current);
        match prev.get(&current) {
            Some(&p) => current = p,
            None => break,
        }
    }
    path.reverse();
    path
}

impl PathFinder for GridPathFinder {
    fn search(
        &self,
        origin: Position,
        targets: &BTreeSet<Position>,
        options: &PathSearchOptions<'_>,
    ) -> PathSearchResult {
        if targets.contains(&origin) {
            return PathSearchResult::default();
        }
        if targets.is_empty() {
            return PathSearchResult {
                incomplete: true,
                ..PathSearchResult::default()
            };
        }

        let min_step = options.plain_cost.min(options.swamp_cost).max(1);
        let heuristic = |pos: Position| nearest_target_range(pos, targets).saturating_mul(min_step);

        let mut matrices: BTreeMap<ZoneId, Option<CostMatrix>> = BTreeMap::new();
        let mut dist: BTreeMap<Position, u32> = BTreeMap::new();
        let mut prev: BTreeMap<Position, Position> = BTreeMap::new();
        let mut open: BinaryHeap<Reverse<(u32, Position)>> = BinaryHeap::new();

        dist.insert(origin, 0);
        open.push(Reverse((heuristic(origin), origin)));

        let mut ops: u32 = 0;
        let mut closest = (heuristic(origin), origin);

        while let Some(Reverse((_, current))) = open.pop() {
            if targets.contains(&current) {
                return PathSearchResult {
                    path: reconstruct(&prev, origin, current),
                    cost: dist.get(&current).copied().unwrap_or_default(),
                    ops,
                    incomplete: false,
                };
            }
            if ops >= options.max_ops {
                break;
            }
            ops = ops.saturating_add(1);

            let current_dist = dist.get(&current).copied().unwrap_or(u32::MAX);
            for direction in Direction::ALL {
                let next = current.step(direction);
                let matrix = matrices
                    .entry(next.zone)
                    .or_insert_with(|| (options.zone_costs)(next.zone));
                let Some(matrix) = matrix.as_ref() else {
                    continue; // Zone excluded from this search.
                };
                let step_cost = match matrix.get(next.x, next.y) {
                    IMPASSABLE => continue,
                    0 => match (options.terrain)(next) {
                        Terrain::Plain => options.plain_cost,
                        Terrain::Swamp => options.swamp_cost,
                        Terrain::Wall => continue,
                    },
                    cost => u32::from(cost),
                };
                let Some(new_dist) = current_dist.checked_add(step_cost) else {
                    continue;
                };
                let is_shorter = dist.get(&next).is_none_or(|&existing| new_dist < existing);
                if is_shorter {
                    dist.insert(next, new_dist);
                    prev.insert(next, current);
                    let h = heuristic(next);
                    if h < closest.0 {
                        closest = (h, next);
                    }
                    open.push(Reverse((new_dist.saturating_add(h), next)));
                }
            }
        }

        let (_, end) = closest;
        PathSearchResult {
            path: reconstruct(&prev, origin, end),
            cost: dist.get(&end).copied().unwrap_or_default(),
            ops,
            incomplete: true,
        }
    }
}
