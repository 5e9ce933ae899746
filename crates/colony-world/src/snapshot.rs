//! In-memory world used by tests and the demo engine.
//!
//! A [`SnapshotWorld`] holds zones (terrain, ownership, visibility) and
//! entities. It implements both [`WorldView`] and [`World`], applying unit
//! commands immediately. Interaction commands (withdraw, pickup, transfer,
//! harvest) require the unit to be within range 1 of the target.
//!
//! The tick only moves forward through [`SnapshotWorld::advance_tick`],
//! which also drains fatigue and removes empty dropped piles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use colony_types::{Direction, EntityId, Position, ResultCode, ZONE_SIZE, ZoneId};

use crate::entity::{Entity, EntityKind, Terrain};
use crate::error::WorldError;
use crate::pathfinding::{CostMatrix, IMPASSABLE};
use crate::query::{World, WorldView};

/// Range at which units can interact with other entities.
const INTERACTION_RANGE: u32 = 1;

/// Energy harvested per work part per tick.
const HARVEST_PER_WORK_PART: u32 = 2;

/// Per-zone state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneState {
    terrain: Vec<Terrain>,
    /// Owned by someone else; zone routes avoid it.
    pub hostile: bool,
    /// The colony currently has vision here.
    pub visible: bool,
}

impl ZoneState {
    fn new() -> Self {
        let size = usize::from(ZONE_SIZE);
        Self {
            terrain: vec![Terrain::Plain; size.saturating_mul(size)],
            hostile: false,
            visible: true,
        }
    }

    fn index(x: u8, y: u8) -> usize {
        usize::from(y)
            .saturating_mul(usize::from(ZONE_SIZE))
            .saturating_add(usize::from(x))
    }

    fn terrain(&self, x: u8, y: u8) -> Terrain {
        self.terrain
            .get(Self::index(x, y))
            .copied()
            .unwrap_or(Terrain::Wall)
    }
}

/// An in-memory world snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotWorld {
    tick: u64,
    zones: BTreeMap<ZoneId, ZoneState>,
    entities: BTreeMap<EntityId, Entity>,
}

impl SnapshotWorld {
    /// Create an empty world at tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zone of open plain terrain.
    pub fn add_zone(&mut self, zone: ZoneId) -> Result<(), WorldError> {
        if self.zones.contains_key(&zone) {
            return Err(WorldError::DuplicateZone(zone));
        }
        self.zones.insert(zone, ZoneState::new());
        Ok(())
    }

    /// Set the terrain of one tile.
    pub fn set_terrain(&mut self, pos: Position, terrain: Terrain) -> Result<(), WorldError> {
        let state = self
            .zones
            .get_mut(&pos.zone)
            .ok_or(WorldError::ZoneNotFound(pos.zone))?;
        if let Some(slot) = state.terrain.get_mut(ZoneState::index(pos.x, pos.y)) {
            *slot = terrain;
        }
        Ok(())
    }

    /// Mark a zone as owned by someone else.
    pub fn set_zone_hostile(&mut self, zone: ZoneId, hostile: bool) -> Result<(), WorldError> {
        let state = self
            .zones
            .get_mut(&zone)
            .ok_or(WorldError::ZoneNotFound(zone))?;
        state.hostile = hostile;
        Ok(())
    }

    /// Set whether the colony has vision in a zone.
    pub fn set_zone_visible(&mut self, zone: ZoneId, visible: bool) -> Result<(), WorldError> {
        let state = self
            .zones
            .get_mut(&zone)
            .ok_or(WorldError::ZoneNotFound(zone))?;
        state.visible = visible;
        Ok(())
    }

    /// Insert an entity. Its zone must already exist.
    pub fn add_entity(&mut self, entity: Entity) -> Result<EntityId, WorldError> {
        if !self.zones.contains_key(&entity.pos.zone) {
            return Err(WorldError::ZoneNotFound(entity.pos.zone));
        }
        if self.entities.contains_key(&entity.id) {
            return Err(WorldError::DuplicateEntity(entity.id));
        }
        let id = entity.id;
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Remove an entity, returning it.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<Entity, WorldError> {
        self.entities
            .remove(&id)
            .ok_or(WorldError::EntityNotFound(id))
    }

    /// Mutable access to an entity, for scenario setup.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Set the remaining fatigue of a unit.
    pub fn set_fatigue(&mut self, id: EntityId, ticks: u32) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        if let EntityKind::Unit { fatigue, .. } = &mut entity.kind {
            *fatigue = ticks;
        }
        Ok(())
    }

    /// Advance to the next tick: drain one point of fatigue from every unit
    /// and remove dropped piles that have been emptied.
    pub fn advance_tick(&mut self) -> Result<u64, WorldError> {
        self.tick = self.tick.checked_add(1).ok_or(WorldError::TickOverflow)?;
        for entity in self.entities.values_mut() {
            if let EntityKind::Unit { fatigue, .. } = &mut entity.kind {
                *fatigue = fatigue.saturating_sub(1);
            }
        }
        self.entities
            .retain(|_, e| !(e.kind == EntityKind::DroppedEnergy && e.store.used == 0));
        Ok(self.tick)
    }

    /// Number of entities in the world.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn unit_fatigue(&self, unit: EntityId) -> Option<u32> {
        match self.entities.get(&unit)?.kind {
            EntityKind::Unit { fatigue, .. } => Some(fatigue),
            _ => None,
        }
    }

    /// Whether any entity on `pos` blocks movement.
    fn tile_blocked(&self, pos: Position) -> bool {
        self.terrain(pos) == Terrain::Wall
            || self
                .entities
                .values()
                .any(|e| e.pos == pos && (e.kind.is_unit() || !e.kind.is_walkable()))
    }

    fn place_unit(&mut self, unit: EntityId, to: Position) -> ResultCode {
        if self.tile_blocked(to) {
            // Blocked moves are accepted but the unit stays put.
            trace!(unit = %unit, to = %to, "move blocked");
            return ResultCode::Ok;
        }
        match self.entities.get_mut(&unit) {
            Some(entity) => {
                entity.pos = to;
                ResultCode::Ok
            }
            None => ResultCode::ErrNotFound,
        }
    }

    /// Validate a unit/target pair for an interaction command.
    fn interaction(&self, unit: EntityId, target: EntityId) -> Result<(Position, Position), ResultCode> {
        let unit_entity = self.entities.get(&unit).ok_or(ResultCode::ErrNotFound)?;
        if !unit_entity.kind.is_unit() {
            return Err(ResultCode::ErrInvalidTarget);
        }
        let target_entity = self.entities.get(&target).ok_or(ResultCode::ErrNotFound)?;
        if !unit_entity.pos.in_range_to(target_entity.pos, INTERACTION_RANGE) {
            return Err(ResultCode::ErrNotInRange);
        }
        Ok((unit_entity.pos, target_entity.pos))
    }

    /// Move `amount` (or as much as possible) from `from` into `to`.
    fn move_energy(&mut self, from: EntityId, to: EntityId, amount: Option<u32>) -> ResultCode {
        let available = self.used_capacity(from);
        let room = self.free_capacity(to);
        if room == 0 {
            return ResultCode::ErrFull;
        }
        if available == 0 {
            return ResultCode::ErrNotEnoughResources;
        }
        let moved = match amount {
            Some(requested) if requested > available => return ResultCode::ErrNotEnoughResources,
            Some(requested) if requested > room => return ResultCode::ErrFull,
            Some(requested) => requested,
            None => available.min(room),
        };
        if let Some(source) = self.entities.get_mut(&from) {
            source.store.used = source.store.used.saturating_sub(moved);
        }
        if let Some(sink) = self.entities.get_mut(&to) {
            sink.store.used = sink.store.used.saturating_add(moved).min(sink.store.capacity);
        }
        ResultCode::Ok
    }
}

impl WorldView for SnapshotWorld {
    fn tick(&self) -> u64 {
        self.tick
    }

    fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    fn entities_near(&self, pos: Position, radius: u32) -> Vec<&Entity> {
        self.entities
            .values()
            .filter(|e| e.pos.in_range_to(pos, radius))
            .collect()
    }

    fn entities_in_zone(&self, zone: ZoneId) -> Vec<&Entity> {
        self.entities.values().filter(|e| e.pos.zone == zone).collect()
    }

    fn zones(&self) -> Vec<ZoneId> {
        self.zones.keys().copied().collect()
    }

    fn terrain(&self, pos: Position) -> Terrain {
        self.zones
            .get(&pos.zone)
            .map_or(Terrain::Wall, |z| z.terrain(pos.x, pos.y))
    }

    fn is_walkable(&self, pos: Position, treat_units_as_obstacles: bool) -> bool {
        if self.terrain(pos) == Terrain::Wall {
            return false;
        }
        !self.entities.values().any(|e| {
            e.pos == pos && (!e.kind.is_walkable() || (treat_units_as_obstacles && e.kind.is_unit()))
        })
    }

    fn cost_matrix(&self, zone: ZoneId, avoid_units: bool) -> Option<CostMatrix> {
        if !self.zones.contains_key(&zone) {
            return None;
        }
        let mut matrix = CostMatrix::new();
        for entity in self.entities.values().filter(|e| e.pos.zone == zone) {
            if !entity.kind.is_walkable() || (avoid_units && entity.kind.is_unit()) {
                matrix.set(entity.pos.x, entity.pos.y, IMPASSABLE);
            }
        }
        Some(matrix)
    }

    fn zone_exists(&self, zone: ZoneId) -> bool {
        self.zones.contains_key(&zone)
    }

    fn zone_is_hostile(&self, zone: ZoneId) -> bool {
        self.zones.get(&zone).is_some_and(|z| z.hostile)
    }

    fn zone_is_visible(&self, zone: ZoneId) -> bool {
        self.zones.get(&zone).is_some_and(|z| z.visible)
    }
}

impl World for SnapshotWorld {
    fn move_by_path(&mut self, unit: EntityId, path: &[Position]) -> ResultCode {
        let Some(fatigue) = self.unit_fatigue(unit) else {
            return ResultCode::ErrNotFound;
        };
        if fatigue > 0 {
            return ResultCode::ErrTired;
        }
        let Some(current) = self.entities.get(&unit).map(|e| e.pos) else {
            return ResultCode::ErrNotFound;
        };
        let next = match path.iter().position(|&p| p == current) {
            Some(index) => path.get(index.saturating_add(1)).copied(),
            None => path.first().copied().filter(|&p| current.range_to(p) == 1),
        };
        match next {
            Some(to) if current.range_to(to) == 1 => self.place_unit(unit, to),
            _ => ResultCode::ErrNotFound,
        }
    }

    fn move_direction(&mut self, unit: EntityId, direction: Direction) -> ResultCode {
        let Some(fatigue) = self.unit_fatigue(unit) else {
            return ResultCode::ErrNotFound;
        };
        if fatigue > 0 {
            return ResultCode::ErrTired;
        }
        let Some(current) = self.entities.get(&unit).map(|e| e.pos) else {
            return ResultCode::ErrNotFound;
        };
        self.place_unit(unit, current.step(direction))
    }

    fn withdraw(&mut self, unit: EntityId, target: EntityId, amount: Option<u32>) -> ResultCode {
        if let Err(code) = self.interaction(unit, target) {
            return code;
        }
        let allowed = self.entities.get(&target).is_some_and(|e| {
            matches!(e.kind, EntityKind::Container | EntityKind::Storage | EntityKind::Link)
        });
        if !allowed {
            return ResultCode::ErrInvalidTarget;
        }
        self.move_energy(target, unit, amount)
    }

    fn pickup(&mut self, unit: EntityId, target: EntityId) -> ResultCode {
        if let Err(code) = self.interaction(unit, target) {
            return code;
        }
        let is_pile = self
            .entities
            .get(&target)
            .is_some_and(|e| e.kind == EntityKind::DroppedEnergy);
        if !is_pile {
            return ResultCode::ErrInvalidTarget;
        }
        self.move_energy(target, unit, None)
    }

    fn transfer(&mut self, unit: EntityId, target: EntityId, amount: Option<u32>) -> ResultCode {
        if let Err(code) = self.interaction(unit, target) {
            return code;
        }
        let accepts = self
            .entities
            .get(&target)
            .is_some_and(|e| e.kind.accepts_energy() && e.id != unit);
        if !accepts {
            return ResultCode::ErrInvalidTarget;
        }
        self.move_energy(unit, target, amount)
    }

    fn harvest(&mut self, unit: EntityId, source: EntityId) -> ResultCode {
        if let Err(code) = self.interaction(unit, source) {
            return code;
        }
        let is_source = self
            .entities
            .get(&source)
            .is_some_and(|e| e.kind == EntityKind::EnergySource);
        if !is_source {
            return ResultCode::ErrInvalidTarget;
        }
        let work = self.entities.get(&unit).map_or(0, Entity::work_parts);
        if work == 0 {
            return ResultCode::ErrInvalidTarget;
        }
        let amount = work
            .saturating_mul(HARVEST_PER_WORK_PART)
            .min(self.used_capacity(source))
            .min(self.free_capacity(unit));
        if amount == 0 {
            return self.move_energy(source, unit, None);
        }
        self.move_energy(source, unit, Some(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Store;

    const HOME: ZoneId = ZoneId::new(0, 0);

    fn world() -> SnapshotWorld {
        let mut world = SnapshotWorld::new();
        let _ = world.add_zone(HOME);
        world
    }

    fn add(world: &mut SnapshotWorld, kind: EntityKind, x: u8, y: u8, used: u32, capacity: u32) -> EntityId {
        world
            .add_entity(Entity::new("e", kind, Position::new(HOME, x, y), Store::new(used, capacity)))
            .unwrap_or_default()
    }

    fn add_unit(world: &mut SnapshotWorld, x: u8, y: u8, capacity: u32) -> EntityId {
        world
            .add_entity(Entity::unit("u", Position::new(HOME, x, y), capacity, 2))
            .unwrap_or_default()
    }

    #[test]
    fn entities_require_known_zone() {
        let mut world = SnapshotWorld::new();
        let result = world.add_entity(Entity::unit("u", Position::new(HOME, 1, 1), 50, 0));
        assert!(matches!(result, Err(WorldError::ZoneNotFound(_))));
    }

    #[test]
    fn withdraw_moves_energy_within_range() {
        let mut world = world();
        let unit = add_unit(&mut world, 10, 10, 50);
        let container = add(&mut world, EntityKind::Container, 11, 10, 100, 2000);
        assert_eq!(world.withdraw(unit, container, None), ResultCode::Ok);
        assert_eq!(world.used_capacity(unit), 50);
        assert_eq!(world.used_capacity(container), 50);
        assert_eq!(world.withdraw(unit, container, None), ResultCode::ErrFull);
    }

    #[test]
    fn withdraw_out_of_range() {
        let mut world = world();
        let unit = add_unit(&mut world, 10, 10, 50);
        let container = add(&mut world, EntityKind::Container, 15, 10, 100, 2000);
        assert_eq!(world.withdraw(unit, container, None), ResultCode::ErrNotInRange);
    }

    #[test]
    fn withdraw_from_empty_container() {
        let mut world = world();
        let unit = add_unit(&mut world, 10, 10, 50);
        let container = add(&mut world, EntityKind::Container, 10, 11, 0, 2000);
        assert_eq!(world.withdraw(unit, container, None), ResultCode::ErrNotEnoughResources);
    }

    #[test]
    fn pickup_only_takes_piles() {
        let mut world = world();
        let unit = add_unit(&mut world, 10, 10, 50);
        let pile = add(&mut world, EntityKind::DroppedEnergy, 10, 10, 30, 30);
        let storage = add(&mut world, EntityKind::Storage, 9, 9, 30, 1000);
        assert_eq!(world.pickup(unit, storage), ResultCode::ErrInvalidTarget);
        assert_eq!(world.pickup(unit, pile), ResultCode::Ok);
        assert_eq!(world.used_capacity(unit), 30);
        let _ = world.advance_tick();
        assert!(world.entity(pile).is_none());
    }

    #[test]
    fn transfer_into_spawn() {
        let mut world = world();
        let unit = add_unit(&mut world, 10, 10, 50);
        let spawn = add(&mut world, EntityKind::Spawn, 11, 11, 280, 300);
        if let Some(e) = world.entity_mut(unit) {
            e.store.used = 50;
        }
        assert_eq!(world.transfer(unit, spawn, None), ResultCode::Ok);
        assert_eq!(world.used_capacity(spawn), 300);
        assert_eq!(world.used_capacity(unit), 30);
        assert_eq!(world.transfer(unit, spawn, None), ResultCode::ErrFull);
    }

    #[test]
    fn harvest_uses_work_parts() {
        let mut world = world();
        let unit = add_unit(&mut world, 10, 10, 50);
        let source = add(&mut world, EntityKind::EnergySource, 10, 11, 3000, 3000);
        assert_eq!(world.harvest(unit, source), ResultCode::Ok);
        assert_eq!(world.used_capacity(unit), 4);
    }

    #[test]
    fn movement_respects_fatigue_and_walls() {
        let mut world = world();
        let unit = add_unit(&mut world, 10, 10, 50);
        let _ = world.set_terrain(Position::new(HOME, 11, 10), Terrain::Wall);
        assert_eq!(world.move_direction(unit, Direction::Right), ResultCode::Ok);
        assert_eq!(world.entity(unit).map(|e| e.pos), Some(Position::new(HOME, 10, 10)));

        let _ = world.set_fatigue(unit, 1);
        assert_eq!(world.move_direction(unit, Direction::Bottom), ResultCode::ErrTired);
        let _ = world.advance_tick();
        assert_eq!(world.move_direction(unit, Direction::Bottom), ResultCode::Ok);
        assert_eq!(world.entity(unit).map(|e| e.pos), Some(Position::new(HOME, 10, 11)));
    }

    #[test]
    fn move_by_path_follows_waypoints() {
        let mut world = world();
        let unit = add_unit(&mut world, 10, 10, 50);
        let path = vec![
            Position::new(HOME, 11, 10),
            Position::new(HOME, 12, 10),
            Position::new(HOME, 13, 10),
        ];
        assert_eq!(world.move_by_path(unit, &path), ResultCode::Ok);
        assert_eq!(world.move_by_path(unit, &path), ResultCode::Ok);
        assert_eq!(world.entity(unit).map(|e| e.pos), Some(Position::new(HOME, 12, 10)));

        let far = vec![Position::new(HOME, 30, 30)];
        assert_eq!(world.move_by_path(unit, &far), ResultCode::ErrNotFound);
    }

    #[test]
    fn cost_matrix_marks_structures_and_units() {
        let mut world = world();
        let _ = add_unit(&mut world, 5, 5, 50);
        let _ = add(&mut world, EntityKind::Spawn, 6, 6, 0, 300);
        let plain = world.cost_matrix(HOME, false).unwrap_or_default();
        assert_eq!(plain.get(6, 6), IMPASSABLE);
        assert_eq!(plain.get(5, 5), 0);
        let avoiding = world.cost_matrix(HOME, true).unwrap_or_default();
        assert_eq!(avoiding.get(5, 5), IMPASSABLE);
        assert!(world.cost_matrix(ZoneId::new(9, 9), false).is_none());
    }
}
