//! The capability query layer consumed by the colony core.
//!
//! [`WorldView`] is a read-only snapshot: entity lookups, capacity queries,
//! walkability, and per-zone cost matrices. [`World`] adds the commands a
//! unit can issue during a tick. Commands report game outcomes as
//! [`ResultCode`] values and never fail with a Rust error.

use colony_types::{Direction, EntityId, Position, ResultCode, ZoneId};

use crate::entity::{Entity, Terrain};
use crate::pathfinding::CostMatrix;

/// Read-only queries over the current world snapshot.
pub trait WorldView {
    /// The current tick number.
    fn tick(&self) -> u64;

    /// Look up an entity by identifier.
    fn entity(&self, id: EntityId) -> Option<&Entity>;

    /// All entities within `radius` tiles of `pos` (Chebyshev range).
    fn entities_near(&self, pos: Position, radius: u32) -> Vec<&Entity>;

    /// All entities inside a zone.
    fn entities_in_zone(&self, zone: ZoneId) -> Vec<&Entity>;

    /// All known zones.
    fn zones(&self) -> Vec<ZoneId>;

    /// Energy currently held by an entity; zero if it does not exist.
    fn used_capacity(&self, id: EntityId) -> u32 {
        self.entity(id).map_or(0, |e| e.store.used)
    }

    /// Free energy capacity of an entity; zero if it does not exist.
    fn free_capacity(&self, id: EntityId) -> u32 {
        self.entity(id).map_or(0, |e| e.store.free())
    }

    /// Terrain of a tile. Tiles in unknown zones read as walls.
    fn terrain(&self, pos: Position) -> Terrain;

    /// Whether a unit could stand on `pos`. When
    /// `treat_units_as_obstacles` is set, tiles occupied by units count as
    /// blocked.
    fn is_walkable(&self, pos: Position, treat_units_as_obstacles: bool) -> bool;

    /// Structure (and optionally unit) costs for a zone, or `None` if the
    /// zone is unknown.
    fn cost_matrix(&self, zone: ZoneId, avoid_units: bool) -> Option<CostMatrix>;

    /// Whether the zone exists on the map.
    fn zone_exists(&self, zone: ZoneId) -> bool;

    /// Whether the zone is owned by someone else and must not be crossed.
    fn zone_is_hostile(&self, zone: ZoneId) -> bool;

    /// Whether the colony currently has vision in the zone.
    fn zone_is_visible(&self, zone: ZoneId) -> bool;
}

/// Commands a unit can issue. Implementations apply them to the world.
pub trait World: WorldView {
    /// Step the unit along `path`: onto the waypoint after its current
    /// position, or onto the first waypoint if it is adjacent.
    fn move_by_path(&mut self, unit: EntityId, path: &[Position]) -> ResultCode;

    /// Step the unit one tile in `direction`.
    fn move_direction(&mut self, unit: EntityId, direction: Direction) -> ResultCode;

    /// Withdraw energy from a container, storage, or link. `None` takes as
    /// much as fits.
    fn withdraw(&mut self, unit: EntityId, target: EntityId, amount: Option<u32>) -> ResultCode;

    /// Pick up a dropped energy pile.
    fn pickup(&mut self, unit: EntityId, target: EntityId) -> ResultCode;

    /// Transfer energy from the unit into a target. `None` moves as much as
    /// the target accepts.
    fn transfer(&mut self, unit: EntityId, target: EntityId, amount: Option<u32>) -> ResultCode;

    /// Harvest energy from an energy source into the unit.
    fn harvest(&mut self, unit: EntityId, source: EntityId) -> ResultCode;
}
