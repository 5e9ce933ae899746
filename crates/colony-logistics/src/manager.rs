//! The per-tick logistics scheduler.
//!
//! Each tick runs in two passes:
//!
//! 1. [`LogisticsManager::plan`] refreshes the known sources, files the
//!    standing storage resupply request, and greedily matches idle carriers
//!    to pending requests in priority order. A carrier whose route fails to
//!    commit sits out the rest of the pass and the request is offered to
//!    the next carrier. The failed carrier is tried again next tick.
//! 2. [`LogisticsManager::run`] advances every route one step, retires
//!    finished routes, and drops completed requests no route still holds.
//!
//! Matching is one-shot and greedy. Committed routes are never rebalanced.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use colony_types::{EntityId, RequestId};
use colony_world::{EntityKind, Movement, World, WorldView};

use crate::LogisticsError;
use crate::book::LogisticsBook;
use crate::config::LogisticsConfig;
use crate::request::LogisticsRequest;
use crate::route::{LogisticsRoute, RouteState};
use crate::source::LogisticsSource;

/// Priority of the standing storage resupply request. Storage is filled
/// with whatever nothing more urgent needs.
pub const STORAGE_RESUPPLY_PRIORITY: u32 = 10;

/// Outcome of one matching pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanReport {
    /// Routes committed this tick.
    pub matched: u32,
    /// Requests chained onto those routes beyond their first.
    pub chained: u32,
    /// Candidate routes that failed to commit.
    pub failed: u32,
    /// Requests left pending after matching.
    pub unmatched: u32,
}

/// Outcome of one execution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Routes still running after the pass.
    pub active: u32,
    /// Routes that completed this tick.
    pub completed: u32,
    /// Routes that were cancelled this tick.
    pub cancelled: u32,
    /// Completed requests dropped from the book.
    pub collected: u32,
}

/// Owns the logistics book, the carriers, and their active routes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogisticsManager {
    config: LogisticsConfig,
    book: LogisticsBook,
    routes: BTreeMap<EntityId, LogisticsRoute>,
    carriers: BTreeSet<EntityId>,
}

impl LogisticsManager {
    /// Create a manager with no carriers, sources, or requests.
    pub fn new(config: LogisticsConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The active configuration.
    pub const fn config(&self) -> &LogisticsConfig {
        &self.config
    }

    /// Sources and requests.
    pub const fn book(&self) -> &LogisticsBook {
        &self.book
    }

    /// Active routes, keyed by carrier.
    pub const fn routes(&self) -> &BTreeMap<EntityId, LogisticsRoute> {
        &self.routes
    }

    /// The active route of `unit`, if any.
    pub fn route(&self, unit: EntityId) -> Option<&LogisticsRoute> {
        self.routes.get(&unit)
    }

    /// Registered carriers.
    pub const fn carriers(&self) -> &BTreeSet<EntityId> {
        &self.carriers
    }

    /// Register `unit` as a carrier. Returns whether it was new.
    pub fn add_carrier(&mut self, unit: EntityId) -> bool {
        self.carriers.insert(unit)
    }

    /// Stop using `unit` as a carrier, cancelling its route.
    pub fn remove_carrier(&mut self, unit: EntityId) -> Result<(), LogisticsError> {
        if !self.carriers.remove(&unit) {
            return Err(LogisticsError::NotACarrier(unit));
        }
        if let Some(mut route) = self.routes.remove(&unit) {
            route.cancel(&mut self.book);
        }
        Ok(())
    }

    /// File `request` under `key`, superseding a live request with the
    /// same key that is no more urgent.
    pub fn submit(&mut self, key: impl Into<String>, request: LogisticsRequest) -> Result<RequestId, LogisticsError> {
        if request.capacity == 0 {
            return Err(LogisticsError::EmptyRequest(request.id));
        }
        Ok(self.book.submit(key, request))
    }

    /// Look up a request.
    pub fn request(&self, id: RequestId) -> Result<&LogisticsRequest, LogisticsError> {
        self.book.request(id).ok_or(LogisticsError::RequestNotFound(id))
    }

    /// Discover sources in visible, friendly zones: a primary source at
    /// every energy source and a non-primary one at every storage. Known
    /// sources are never removed here. Returns the number discovered.
    pub fn refresh_sources<V: WorldView + ?Sized>(&mut self, view: &V) -> usize {
        let adjacent = self.config.source_footprint_adjacent;
        let mut found = 0_usize;
        for zone in view.zones() {
            if !view.zone_is_visible(zone) || view.zone_is_hostile(zone) {
                continue;
            }
            for entity in view.entities_in_zone(zone) {
                let source = match entity.kind {
                    EntityKind::EnergySource => LogisticsSource::new(entity.pos, true, adjacent),
                    EntityKind::Storage => LogisticsSource::new(entity.pos, false, adjacent),
                    _ => continue,
                };
                if self.book.add_source(source) {
                    found = found.saturating_add(1);
                }
            }
        }
        found
    }

    /// File a resupply request for every storage with free room that has
    /// no live request yet. Returns the number filed.
    pub fn submit_storage_resupply<V: WorldView + ?Sized>(&mut self, view: &V) -> usize {
        let mut filed = 0_usize;
        for zone in view.zones() {
            if !view.zone_is_visible(zone) || view.zone_is_hostile(zone) {
                continue;
            }
            for entity in view.entities_in_zone(zone) {
                let free = entity.store.free();
                if entity.kind != EntityKind::Storage || free == 0 {
                    continue;
                }
                let key = format!("storage:{}", entity.id);
                if self.book.request_for_key(&key).is_some() {
                    continue;
                }
                let request =
                    LogisticsRequest::resupply(entity.id, entity.pos, free, STORAGE_RESUPPLY_PRIORITY, view.tick());
                let _ = self.book.submit(key, request);
                filed = filed.saturating_add(1);
            }
        }
        filed
    }

    /// Carriers that exist in the world and have no active route.
    pub fn idle_carriers<V: WorldView + ?Sized>(&self, view: &V) -> Vec<EntityId> {
        self.carriers
            .iter()
            .copied()
            .filter(|unit| !self.routes.contains_key(unit) && view.entity(*unit).is_some())
            .collect()
    }

    /// Match idle carriers to pending requests.
    pub fn plan<V: WorldView + ?Sized>(&mut self, view: &V) -> PlanReport {
        self.book.new_tick(view.tick());
        let _ = self.refresh_sources(view);
        let _ = self.submit_storage_resupply(view);

        let mut report = PlanReport::default();
        let mut idle: VecDeque<EntityId> = self.idle_carriers(view).into();
        let mut pending: VecDeque<RequestId> = self.book.pending().into();

        while !idle.is_empty() {
            let Some(request) = pending.pop_front() else {
                break;
            };
            let Some(unit) = idle.pop_front() else {
                break;
            };

            let mut route = LogisticsRoute::new(view, &mut self.book, unit, request, &self.config);
            let mut chained = 0_u32;
            if self.config.chain_requests {
                for &other in &pending {
                    if route.extend(&self.book, other) {
                        chained = chained.saturating_add(1);
                    }
                }
            }

            if route.commit(view, &mut self.book) {
                report.matched = report.matched.saturating_add(1);
                report.chained = report.chained.saturating_add(chained);
                self.routes.insert(unit, route);
                if self.book.request(request).is_some_and(LogisticsRequest::is_pending) {
                    pending.push_front(request);
                }
                let book = &self.book;
                pending.retain(|id| book.request(*id).is_some_and(LogisticsRequest::is_pending));
            } else {
                debug!(unit = %unit, request = %request, "route did not commit");
                report.failed = report.failed.saturating_add(1);
                pending.push_front(request);
            }
        }

        report.unmatched = u32::try_from(pending.len()).unwrap_or(u32::MAX);
        if report.matched > 0 || report.failed > 0 {
            info!(
                matched = report.matched,
                chained = report.chained,
                failed = report.failed,
                unmatched = report.unmatched,
                idle = idle.len(),
                "logistics matching complete"
            );
        }
        report
    }

    /// Advance every route one step and retire finished ones.
    pub fn run<W: World + ?Sized>(&mut self, world: &mut W, movement: &mut Movement) -> RunReport {
        self.book.new_tick(world.tick());
        let config = self.config;
        for route in self.routes.values_mut() {
            route.run(world, movement, &mut self.book, &config);
        }

        let mut report = RunReport::default();
        let finished: Vec<EntityId> = self
            .routes
            .iter()
            .filter(|(_, route)| route.state.is_terminal())
            .map(|(&unit, _)| unit)
            .collect();
        for unit in finished {
            let Some(route) = self.routes.remove(&unit) else {
                continue;
            };
            movement.forget(unit);
            match route.state {
                RouteState::Completed => report.completed = report.completed.saturating_add(1),
                RouteState::Cancelled => report.cancelled = report.cancelled.saturating_add(1),
                RouteState::Pending | RouteState::GettingEnergy | RouteState::Fulfilling => {}
            }
        }

        let held: BTreeSet<RequestId> = self
            .routes
            .values()
            .flat_map(|route| route.requests.iter().copied())
            .collect();
        let collected = self.book.collect_garbage(&held);
        report.collected = u32::try_from(collected).unwrap_or(u32::MAX);
        report.active = u32::try_from(self.routes.len()).unwrap_or(u32::MAX);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_types::{Position, ZoneId};
    use colony_world::{Entity, SnapshotWorld, Store};

    const HOME: ZoneId = ZoneId::new(0, 0);

    struct Fixture {
        world: SnapshotWorld,
        manager: LogisticsManager,
        movement: Movement,
        spawn: EntityId,
        tower: EntityId,
    }

    fn fixture(haulers: &[u8]) -> Fixture {
        fixture_with(LogisticsConfig::default(), haulers)
    }

    fn fixture_with(config: LogisticsConfig, haulers: &[u8]) -> Fixture {
        let mut world = SnapshotWorld::new();
        let _ = world.add_zone(HOME);
        let _ = world.add_entity(Entity::new(
            "source",
            EntityKind::EnergySource,
            Position::new(HOME, 25, 25),
            Store::new(3000, 3000),
        ));
        let _ = world.add_entity(Entity::new(
            "container",
            EntityKind::Container,
            Position::new(HOME, 26, 25),
            Store::new(1000, 2000),
        ));
        let spawn = world
            .add_entity(Entity::new("spawn", EntityKind::Spawn, Position::new(HOME, 30, 30), Store::empty(300)))
            .unwrap_or_default();
        let tower = world
            .add_entity(Entity::new("tower", EntityKind::Tower, Position::new(HOME, 20, 30), Store::empty(1000)))
            .unwrap_or_default();
        let mut manager = LogisticsManager::new(config);
        for &x in haulers {
            let unit = world
                .add_entity(Entity::unit("hauler", Position::new(HOME, x, 20), 50, 0))
                .unwrap_or_default();
            let _ = manager.add_carrier(unit);
        }
        Fixture {
            world,
            manager,
            movement: Movement::default(),
            spawn,
            tower,
        }
    }

    fn transfer(target: EntityId, pos: Position, capacity: u32, priority: u32) -> LogisticsRequest {
        LogisticsRequest::transfer(target, pos, capacity, priority, 0)
    }

    #[test]
    fn discovers_sources_once() {
        let mut fx = fixture(&[]);
        assert_eq!(fx.manager.refresh_sources(&fx.world), 1);
        assert_eq!(fx.manager.refresh_sources(&fx.world), 0);
        assert!(fx.manager.book().sources().all(|s| s.primary));
    }

    #[test]
    fn storage_gets_standing_request() {
        let mut fx = fixture(&[]);
        let _ = fx.world.add_entity(Entity::new(
            "storage",
            EntityKind::Storage,
            Position::new(HOME, 10, 10),
            Store::new(100, 1000),
        ));
        assert_eq!(fx.manager.refresh_sources(&fx.world), 2);
        assert_eq!(fx.manager.submit_storage_resupply(&fx.world), 1);
        assert_eq!(fx.manager.submit_storage_resupply(&fx.world), 0);
        let request = fx.manager.book().requests().next().cloned();
        assert_eq!(request.as_ref().map(|r| r.capacity), Some(900));
        assert_eq!(request.map(|r| r.is_resupply()), Some(true));
    }

    #[test]
    fn empty_request_rejected() {
        let mut fx = fixture(&[]);
        let result = fx.manager.submit("spawn", transfer(fx.spawn, Position::new(HOME, 30, 30), 0, 1));
        assert!(matches!(result, Err(LogisticsError::EmptyRequest(_))));
    }

    #[test]
    fn urgent_request_matched_first() {
        let chaining_off = LogisticsConfig {
            chain_requests: false,
            ..LogisticsConfig::default()
        };
        let mut fx = fixture_with(chaining_off, &[20]);
        let tower = fx
            .manager
            .submit("tower", transfer(fx.tower, Position::new(HOME, 20, 30), 50, 5))
            .unwrap_or_default();
        let spawn = fx
            .manager
            .submit("spawn", transfer(fx.spawn, Position::new(HOME, 30, 30), 50, 1))
            .unwrap_or_default();

        let report = fx.manager.plan(&fx.world);
        assert_eq!(report.matched, 1);
        assert_eq!(report.unmatched, 1);
        let route = fx.manager.routes().values().next();
        assert_eq!(route.and_then(|r| r.requests.front().copied()), Some(spawn));
        assert!(fx.manager.request(tower).is_ok_and(|r| !r.assigned));
    }

    #[test]
    fn chaining_fills_spare_capacity() {
        let mut fx = fixture(&[20]);
        let _ = fx
            .manager
            .submit("spawn", transfer(fx.spawn, Position::new(HOME, 30, 30), 20, 1));
        let _ = fx
            .manager
            .submit("tower", transfer(fx.tower, Position::new(HOME, 20, 30), 20, 2));
        let report = fx.manager.plan(&fx.world);
        assert_eq!(report.matched, 1);
        assert_eq!(report.chained, 1);
        assert_eq!(report.unmatched, 0);
    }

    #[test]
    fn large_request_shared_between_carriers() {
        let mut fx = fixture(&[20, 22]);
        let id = fx
            .manager
            .submit("tower", transfer(fx.tower, Position::new(HOME, 20, 30), 100, 1))
            .unwrap_or_default();
        let report = fx.manager.plan(&fx.world);
        assert_eq!(report.matched, 2);
        assert!(fx.manager.request(id).is_ok_and(|r| r.assigned_capacity == 100));
    }

    #[test]
    fn failed_commit_keeps_unit_idle() {
        let mut fx = fixture(&[]);
        let empty = fx
            .world
            .add_entity(Entity::unit("broken", Position::new(HOME, 20, 20), 0, 0))
            .unwrap_or_default();
        let _ = fx.manager.add_carrier(empty);
        let _ = fx
            .manager
            .submit("spawn", transfer(fx.spawn, Position::new(HOME, 30, 30), 50, 1));
        let report = fx.manager.plan(&fx.world);
        assert_eq!(report.failed, 1);
        assert_eq!(report.matched, 0);
        assert_eq!(report.unmatched, 1);
        assert_eq!(fx.manager.idle_carriers(&fx.world), vec![empty]);
    }

    #[test]
    fn failed_carrier_does_not_block_others() {
        let mut fx = fixture(&[]);
        let broken = fx
            .world
            .add_entity(Entity::unit("broken", Position::new(HOME, 20, 20), 0, 0))
            .unwrap_or_default();
        let mut full = Entity::unit("loaded", Position::new(HOME, 22, 20), 50, 0);
        full.store = Store::new(50, 50);
        let loaded = fx.world.add_entity(full).unwrap_or_default();
        let _ = fx.manager.add_carrier(broken);
        let _ = fx.manager.add_carrier(loaded);
        let id = fx
            .manager
            .submit("spawn", transfer(fx.spawn, Position::new(HOME, 30, 30), 50, 1))
            .unwrap_or_default();

        let report = fx.manager.plan(&fx.world);
        assert_eq!(report.matched, 1);
        assert!(report.failed <= 1);
        assert_eq!(report.unmatched, 0);
        let route = fx.manager.route(loaded);
        assert_eq!(route.map(|r| r.state), Some(RouteState::Fulfilling));
        assert!(fx.manager.route(broken).is_none());
        assert!(fx.manager.request(id).is_ok_and(|r| r.assigned_capacity == 50));
    }

    #[test]
    fn routes_retire_and_requests_collected() {
        let mut fx = fixture(&[20]);
        let id = fx
            .manager
            .submit("spawn", transfer(fx.spawn, Position::new(HOME, 30, 30), 50, 1))
            .unwrap_or_default();
        let mut completed = 0_u32;
        for _ in 0..60 {
            let _ = fx.manager.plan(&fx.world);
            let report = fx.manager.run(&mut fx.world, &mut fx.movement);
            completed = completed.saturating_add(report.completed);
            if completed > 0 {
                break;
            }
            let _ = fx.world.advance_tick();
        }
        assert_eq!(completed, 1);
        assert_eq!(fx.world.used_capacity(fx.spawn), 50);
        assert!(fx.manager.routes().is_empty());
        assert!(fx.manager.request(id).is_err());
    }

    #[test]
    fn removing_carrier_cancels_route() {
        let mut fx = fixture(&[20]);
        let id = fx
            .manager
            .submit("spawn", transfer(fx.spawn, Position::new(HOME, 30, 30), 50, 1))
            .unwrap_or_default();
        let _ = fx.manager.plan(&fx.world);
        let Some(&unit) = fx.manager.routes().keys().next() else {
            return;
        };
        assert!(fx.manager.remove_carrier(unit).is_ok());
        assert!(fx.manager.routes().is_empty());
        assert!(fx.manager.request(id).is_ok_and(|r| !r.assigned && r.assigned_capacity == 0));
        assert!(fx.manager.book().sources().all(|s| s.reserved_capacity == 0));
        assert!(matches!(fx.manager.remove_carrier(unit), Err(LogisticsError::NotACarrier(_))));
    }
}
