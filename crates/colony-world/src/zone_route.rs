//! Zone-level routing.
//!
//! Before a cross-zone tile search, the movement primitive asks for a
//! corridor of zones from the origin zone to the target zone. Zones that do
//! not exist or are owned by someone else are never entered (the target
//! zone itself is always allowed).

use std::collections::{BTreeMap, BTreeSet};

use colony_types::ZoneId;

use crate::query::WorldView;

/// Find the sequence of zones from `from` to `to`, excluding `from`.
///
/// Returns `Some(vec![])` when both are the same zone and `None` when no
/// corridor exists.
pub fn find_zone_route<V: WorldView + ?Sized>(view: &V, from: ZoneId, to: ZoneId) -> Option<Vec<ZoneId>> {
    if from == to {
        return Some(Vec::new());
    }
    if !view.zone_exists(to) {
        return None;
    }

    let mut dist: BTreeMap<ZoneId, u32> = BTreeMap::new();
    let mut prev: BTreeMap<ZoneId, ZoneId> = BTreeMap::new();
    let mut queue: BTreeSet<(u32, ZoneId)> = BTreeSet::new();

    dist.insert(from, 0);
    queue.insert((0, from));

    while let Some((current_dist, current)) = queue.pop_first() {
        if current == to {
            break;
        }
        for neighbor in current.neighbors() {
            if !view.zone_exists(neighbor) || (neighbor != to && view.zone_is_hostile(neighbor)) {
                continue;
            }
            let Some(new_dist) = current_dist.checked_add(1) else {
                continue;
            };
            let is_shorter = dist.get(&neighbor).is_none_or(|&existing| new_dist < existing);
            if is_shorter {
                if let Some(&old_dist) = dist.get(&neighbor) {
                    queue.remove(&(old_dist, neighbor));
                }
                dist.insert(neighbor, new_dist);
                prev.insert(neighbor, current);
                queue.insert((new_dist, neighbor));
            }
        }
    }

    if !prev.contains_key(&to) {
        return None;
    }
    let mut route = Vec::new();
    let mut current = to;
    while current != from {
        route.push(current);
        current = *prev.get(&current)?;
    }
    route.reverse();
    Some(route)
}
