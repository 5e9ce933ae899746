//! Reservable energy sources.
//!
//! A [`LogisticsSource`] is anchored at a position and aggregates every
//! real energy container in its footprint (the position itself, or the
//! 3x3 area around it). Its capacity is the energy those containers hold
//! minus what routes have already reserved:
//!
//! ```text
//! capacity = sum(used over containers) - reserved_capacity
//! ```
//!
//! Reservations are the only guard against two routes being promised the
//! same energy. [`LogisticsSource::reserve`] clamps to what is actually
//! available, so `reserved_capacity` never exceeds the raw total at the
//! time of reservation, and [`LogisticsSource::unreserve`] never takes it
//! below zero.
//!
//! The raw total is memoized per tick by the [`LogisticsBook`]; the source
//! itself only remembers which containers it saw last, so that capacity is
//! still known while its zone is out of sight.
//!
//! [`LogisticsBook`]: crate::LogisticsBook

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use colony_types::{EntityId, Position, ResultCode};
use colony_world::analyst::logistics_sources_at;
use colony_world::{EntityKind, Movement, World, WorldView};

/// An allocatable pool of energy anchored at a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsSource {
    /// Anchor position.
    pub pos: Position,
    /// Whether this source may serve resupply requests.
    pub primary: bool,
    /// Whether the footprint includes the tiles around `pos`.
    pub include_adjacent: bool,
    /// Energy promised to routes that have not withdrawn it yet.
    pub reserved_capacity: u32,
    /// Containers seen in the footprint, fullest first.
    pub containers: Vec<EntityId>,
}

impl LogisticsSource {
    /// Create a source with no reservations.
    pub const fn new(pos: Position, primary: bool, include_adjacent: bool) -> Self {
        Self {
            pos,
            primary,
            include_adjacent,
            reserved_capacity: 0,
            containers: Vec::new(),
        }
    }

    /// Re-scan the footprint if the zone is visible. Otherwise keep the
    /// containers seen last.
    pub fn refresh<V: WorldView + ?Sized>(&mut self, view: &V) -> &[EntityId] {
        if view.zone_is_visible(self.pos.zone) {
            self.containers = logistics_sources_at(view, self.pos, self.include_adjacent);
        }
        &self.containers
    }

    /// Energy held by the known containers, ignoring reservations.
    pub fn raw_capacity<V: WorldView + ?Sized>(&self, view: &V) -> u32 {
        self.containers
            .iter()
            .map(|&id| view.used_capacity(id))
            .fold(0_u32, u32::saturating_add)
    }

    /// Unreserved energy given the raw total `raw`.
    pub const fn available(&self, raw: u32) -> u32 {
        raw.saturating_sub(self.reserved_capacity)
    }

    /// Reserve up to `amount` of the `raw` total. Returns the amount
    /// actually reserved.
    pub fn reserve(&mut self, amount: u32, raw: u32) -> u32 {
        let granted = amount.min(self.available(raw));
        self.reserved_capacity = self.reserved_capacity.saturating_add(granted);
        trace!(pos = %self.pos, amount, granted, reserved = self.reserved_capacity, "reserved");
        granted
    }

    /// Release a reservation made earlier.
    pub fn unreserve(&mut self, amount: u32) {
        self.reserved_capacity = self.reserved_capacity.saturating_sub(amount);
        trace!(pos = %self.pos, amount, reserved = self.reserved_capacity, "unreserved");
    }

    /// Move up to `amount` energy from the fullest container into `unit`.
    ///
    /// Travels first when the container is in another zone or out of
    /// `range`. A container that runs dry mid-withdrawal counts as `Ok`.
    pub fn transfer<W: World + ?Sized>(
        &mut self,
        world: &mut W,
        movement: &mut Movement,
        unit: EntityId,
        amount: Option<u32>,
        range: u32,
    ) -> ResultCode {
        let Some(&best) = self.refresh(&*world).first() else {
            return ResultCode::ErrNotFound;
        };
        let Some((container_pos, container_used, kind)) = world.entity(best).map(|e| (e.pos, e.store.used, e.kind))
        else {
            return ResultCode::ErrNotFound;
        };
        let Some(unit_pos) = world.entity(unit).map(|e| e.pos) else {
            return ResultCode::ErrNotFound;
        };
        if unit_pos.zone != container_pos.zone {
            return movement.travel(world, unit, container_pos, range);
        }
        if container_used == 0 {
            return ResultCode::ErrNotEnoughResources;
        }

        let code = if kind == EntityKind::DroppedEnergy {
            world.pickup(unit, best)
        } else {
            let wanted = amount.map(|a| a.min(container_used).min(world.free_capacity(unit)));
            world.withdraw(unit, best, wanted.filter(|&a| a > 0))
        };

        match code {
            ResultCode::ErrNotInRange => movement.travel(world, unit, container_pos, range),
            ResultCode::ErrNotEnoughResources => {
                debug!(unit = %unit, container = %best, "container drained mid-withdrawal");
                ResultCode::Ok
            }
            other => other,
        }
    }
}
