//! Position helpers shared by logistics and tasks.
//!
//! A logistics source is a *position* rather than a single container: the
//! energy around a harvest site may sit in a container, a dropped pile, and
//! a link at once. [`logistics_sources_at`] resolves a position to those
//! real containers.

use colony_types::{EntityId, Position};

use crate::query::WorldView;

/// Real energy containers at `pos` (or in the 3x3 area around it when
/// `include_adjacent` is set), ordered by energy held, largest first.
pub fn logistics_sources_at<V: WorldView + ?Sized>(view: &V, pos: Position, include_adjacent: bool) -> Vec<EntityId> {
    let radius = u32::from(include_adjacent);
    let mut found: Vec<(u32, EntityId)> = view
        .entities_near(pos, radius)
        .into_iter()
        .filter(|e| e.kind.is_logistics_container())
        .map(|e| (e.store.used, e.id))
        .collect();
    found.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    found.into_iter().map(|(_, id)| id).collect()
}

/// Walkable tiles within `range` of `pos`, including `pos` itself.
pub fn nearby_positions<V: WorldView + ?Sized>(view: &V, pos: Position, range: u8) -> Vec<Position> {
    pos.positions_in_range(range)
        .into_iter()
        .filter(|&p| view.zone_exists(p.zone) && view.is_walkable(p, false))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityKind, Store, Terrain};
    use crate::snapshot::SnapshotWorld;
    use colony_types::ZoneId;

    const HOME: ZoneId = ZoneId::new(0, 0);

    #[test]
    fn sources_sorted_by_energy() {
        let mut world = SnapshotWorld::new();
        let _ = world.add_zone(HOME);
        let site = Position::new(HOME, 10, 10);
        let small = world
            .add_entity(Entity::new("pile", EntityKind::DroppedEnergy, site, Store::new(20, 20)))
            .unwrap_or_default();
        let big = world
            .add_entity(Entity::new(
                "container",
                EntityKind::Container,
                Position::new(HOME, 11, 10),
                Store::new(500, 2000),
            ))
            .unwrap_or_default();
        let _ = world.add_entity(Entity::new(
            "spawn",
            EntityKind::Spawn,
            Position::new(HOME, 9, 10),
            Store::new(300, 300),
        ));

        assert_eq!(logistics_sources_at(&world, site, true), vec![big, small]);
        assert_eq!(logistics_sources_at(&world, site, false), vec![small]);
    }

    #[test]
    fn nearby_positions_skip_walls() {
        let mut world = SnapshotWorld::new();
        let _ = world.add_zone(HOME);
        let center = Position::new(HOME, 10, 10);
        let _ = world.set_terrain(Position::new(HOME, 11, 10), Terrain::Wall);
        let positions = nearby_positions(&world, center, 1);
        assert_eq!(positions.len(), 8);
        assert!(!positions.contains(&Position::new(HOME, 11, 10)));
    }
}
