//! Logistics requests: demands for energy at a target.
//!
//! A request records how much energy is wanted, how urgent it is, and how
//! much in-flight routes have already promised it. The [`RequestKind`] is a
//! closed set so the routing rules that depend on it stay exhaustive:
//!
//! - [`RequestKind::Transfer`] -- deliver into a structure.
//! - [`RequestKind::Resupply`] -- deliver into a structure, but only with
//!   energy drawn from a primary source.
//! - [`RequestKind::Depot`] -- park the unit at a position as a mobile
//!   energy depot. Terminal: nothing chains after it.
//!
//! A request is *pending* while it is not completed and in-flight routes
//! have promised it less than it still needs.

use serde::{Deserialize, Serialize};
use tracing::debug;

use colony_types::{EntityId, Position, RequestId, ResultCode};
use colony_world::{Movement, World};

/// What a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    /// Deliver energy into `target`.
    Transfer {
        /// Structure receiving the energy.
        target: EntityId,
    },
    /// Refill `target` from a primary source.
    Resupply {
        /// Structure receiving the energy.
        target: EntityId,
    },
    /// Hold energy at the request position until it is drawn down.
    Depot,
}

/// A pending demand for energy delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsRequest {
    /// Unique identifier of this request instance.
    pub id: RequestId,
    /// Kind of delivery.
    pub kind: RequestKind,
    /// Where the energy is needed.
    pub pos: Position,
    /// Energy requested.
    pub capacity: u32,
    /// Urgency; lower numbers are served first.
    pub priority: u32,
    /// Whether the request has been satisfied or superseded.
    pub completed: bool,
    /// Whether at least one in-flight route has promised energy to it.
    pub assigned: bool,
    /// Energy promised to this request by in-flight routes.
    pub assigned_capacity: u32,
    /// Energy delivered so far.
    pub delivered: u32,
    /// Tick the request was created in.
    pub created: u64,
    /// Insertion order, used to break priority ties.
    pub seq: u64,
}

impl LogisticsRequest {
    fn new(kind: RequestKind, pos: Position, capacity: u32, priority: u32, created: u64) -> Self {
        Self {
            id: RequestId::new(),
            kind,
            pos,
            capacity,
            priority,
            completed: false,
            assigned: false,
            assigned_capacity: 0,
            delivered: 0,
            created,
            seq: 0,
        }
    }

    /// Deliver `capacity` energy into `target` at `pos`.
    pub fn transfer(target: EntityId, pos: Position, capacity: u32, priority: u32, created: u64) -> Self {
        Self::new(RequestKind::Transfer { target }, pos, capacity, priority, created)
    }

    /// Refill `target` at `pos` with `capacity` energy from a primary source.
    pub fn resupply(target: EntityId, pos: Position, capacity: u32, priority: u32, created: u64) -> Self {
        Self::new(RequestKind::Resupply { target }, pos, capacity, priority, created)
    }

    /// Park a unit carrying up to `capacity` energy at `pos`.
    pub fn depot(pos: Position, capacity: u32, priority: u32, created: u64) -> Self {
        Self::new(RequestKind::Depot, pos, capacity, priority, created)
    }

    /// Whether this request may only be served from a primary source.
    pub const fn is_resupply(&self) -> bool {
        matches!(self.kind, RequestKind::Resupply { .. })
    }

    /// Whether this request ends a route's chain.
    pub const fn is_depot(&self) -> bool {
        matches!(self.kind, RequestKind::Depot)
    }

    /// The structure receiving energy, if any.
    pub const fn target(&self) -> Option<EntityId> {
        match self.kind {
            RequestKind::Transfer { target } | RequestKind::Resupply { target } => Some(target),
            RequestKind::Depot => None,
        }
    }

    /// Energy still to be delivered.
    pub const fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.delivered)
    }

    /// Energy still needed that no route has promised yet.
    pub const fn open_capacity(&self) -> u32 {
        self.remaining().saturating_sub(self.assigned_capacity)
    }

    /// Whether the matcher should still try to serve this request.
    pub const fn is_pending(&self) -> bool {
        !self.completed && self.open_capacity() > 0
    }

    /// Perform one tick of delivery with `unit`.
    ///
    /// Returns `Ok` while travelling or after a successful hand-off, and
    /// `ErrNotEnoughResources` once the unit has nothing left to give.
    /// A vanished or full target completes the request.
    pub fn action<W: World + ?Sized>(
        &mut self,
        world: &mut W,
        movement: &mut Movement,
        unit: EntityId,
        range: u32,
    ) -> ResultCode {
        match self.kind {
            RequestKind::Transfer { target } | RequestKind::Resupply { target } => {
                self.deliver(world, movement, unit, target, range)
            }
            RequestKind::Depot => self.hold(world, movement, unit),
        }
    }

    fn deliver<W: World + ?Sized>(
        &mut self,
        world: &mut W,
        movement: &mut Movement,
        unit: EntityId,
        target: EntityId,
        range: u32,
    ) -> ResultCode {
        let Some((target_pos, target_free)) = world.entity(target).map(|e| (e.pos, e.store.free())) else {
            debug!(request = %self.id, target = %target, "request target vanished");
            self.completed = true;
            return ResultCode::Ok;
        };
        if target_free == 0 || self.remaining() == 0 {
            self.completed = true;
            return ResultCode::Ok;
        }
        let held = world.used_capacity(unit);
        if held == 0 {
            return ResultCode::ErrNotEnoughResources;
        }
        let Some(unit_pos) = world.entity(unit).map(|e| e.pos) else {
            return ResultCode::ErrNotFound;
        };
        if !unit_pos.in_range_to(target_pos, range) {
            return movement.travel(world, unit, target_pos, range);
        }

        let amount = held.min(target_free).min(self.remaining());
        match world.transfer(unit, target, Some(amount)) {
            ResultCode::Ok => {
                self.delivered = self.delivered.saturating_add(amount);
                if self.remaining() == 0 || amount >= target_free {
                    self.completed = true;
                }
                debug!(request = %self.id, amount, delivered = self.delivered, "energy delivered");
                ResultCode::Ok
            }
            ResultCode::ErrNotInRange => movement.travel(world, unit, target_pos, range),
            ResultCode::ErrFull => {
                self.completed = true;
                ResultCode::Ok
            }
            other => other,
        }
    }

    fn hold<W: World + ?Sized>(&mut self, world: &mut W, movement: &mut Movement, unit: EntityId) -> ResultCode {
        if world.used_capacity(unit) == 0 {
            self.completed = true;
            return ResultCode::ErrNotEnoughResources;
        }
        movement.travel(world, unit, self.pos, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_types::ZoneId;
    use colony_world::{Entity, EntityKind, SnapshotWorld, Store, WorldView};

    const HOME: ZoneId = ZoneId::new(0, 0);

    fn setup(held: u32, spawn_free: u32) -> (SnapshotWorld, EntityId, EntityId) {
        let mut world = SnapshotWorld::new();
        let _ = world.add_zone(HOME);
        let mut hauler = Entity::unit("hauler", Position::new(HOME, 10, 10), 50, 0);
        hauler.store = Store::new(held, 50);
        let unit = world.add_entity(hauler).unwrap_or_default();
        let spawn = world
            .add_entity(Entity::new(
                "spawn",
                EntityKind::Spawn,
                Position::new(HOME, 11, 10),
                Store::new(300_u32.saturating_sub(spawn_free), 300),
            ))
            .unwrap_or_default();
        (world, unit, spawn)
    }

    #[test]
    fn pending_tracks_open_capacity() {
        let mut request = LogisticsRequest::transfer(EntityId::new(), Position::new(HOME, 1, 1), 100, 5, 0);
        assert!(request.is_pending());
        request.assigned_capacity = 60;
        assert_eq!(request.open_capacity(), 40);
        request.delivered = 40;
        assert!(!request.is_pending());
        request.assigned_capacity = 0;
        request.completed = true;
        assert!(!request.is_pending());
    }

    #[test]
    fn kind_helpers() {
        let target = EntityId::new();
        let resupply = LogisticsRequest::resupply(target, Position::new(HOME, 1, 1), 10, 1, 0);
        assert!(resupply.is_resupply());
        assert_eq!(resupply.target(), Some(target));
        let depot = LogisticsRequest::depot(Position::new(HOME, 1, 1), 10, 1, 0);
        assert!(depot.is_depot());
        assert_eq!(depot.target(), None);
    }

    #[test]
    fn delivery_completes_request() {
        let (mut world, unit, spawn) = setup(50, 300);
        let mut movement = Movement::default();
        let mut request = LogisticsRequest::transfer(spawn, Position::new(HOME, 11, 10), 50, 1, 0);
        let code = request.action(&mut world, &mut movement, unit, 1);
        assert_eq!(code, ResultCode::Ok);
        assert_eq!(request.delivered, 50);
        assert!(request.completed);
        assert_eq!(world.used_capacity(spawn), 50);
    }

    #[test]
    fn empty_unit_reports_exhaustion() {
        let (mut world, unit, spawn) = setup(0, 300);
        let mut movement = Movement::default();
        let mut request = LogisticsRequest::transfer(spawn, Position::new(HOME, 11, 10), 50, 1, 0);
        let code = request.action(&mut world, &mut movement, unit, 1);
        assert_eq!(code, ResultCode::ErrNotEnoughResources);
        assert!(!request.completed);
    }

    #[test]
    fn full_target_completes_without_transfer() {
        let (mut world, unit, spawn) = setup(50, 0);
        let mut movement = Movement::default();
        let mut request = LogisticsRequest::transfer(spawn, Position::new(HOME, 11, 10), 50, 1, 0);
        assert_eq!(request.action(&mut world, &mut movement, unit, 1), ResultCode::Ok);
        assert!(request.completed);
        assert_eq!(world.used_capacity(unit), 50);
    }

    #[test]
    fn distant_target_means_travel() {
        let (mut world, unit, _) = setup(50, 300);
        let far = world
            .add_entity(Entity::new(
                "tower",
                EntityKind::Tower,
                Position::new(HOME, 30, 10),
                Store::empty(1000),
            ))
            .unwrap_or_default();
        let mut movement = Movement::default();
        let mut request = LogisticsRequest::transfer(far, Position::new(HOME, 30, 10), 50, 1, 0);
        assert_eq!(request.action(&mut world, &mut movement, unit, 1), ResultCode::Ok);
        assert_eq!(request.delivered, 0);
        let range = world.entity(unit).map(|e| e.pos.range_to(Position::new(HOME, 30, 10)));
        assert_eq!(range, Some(19));
    }

    #[test]
    fn depot_holds_until_drained() {
        let (mut world, unit, _) = setup(50, 300);
        let mut movement = Movement::default();
        let mut request = LogisticsRequest::depot(Position::new(HOME, 10, 10), 50, 1, 0);
        assert_eq!(request.action(&mut world, &mut movement, unit, 1), ResultCode::Ok);
        if let Some(hauler) = world.entity_mut(unit) {
            hauler.store.used = 0;
        }
        assert_eq!(
            request.action(&mut world, &mut movement, unit, 1),
            ResultCode::ErrNotEnoughResources
        );
        assert!(request.completed);
    }
}
