//! Reservation conservation check.
//!
//! Every unit of energy reserved at a source, and every unit promised to a
//! request, must be backed by a live route:
//!
//! ```text
//! source.reserved_capacity  == sum(route.reserved_capacity for GETTING_ENERGY routes at that source)
//! request.assigned_capacity == sum(route.assigned_capacity[request] for routes still queuing it)
//! route.promised()          <= route.max_capacity
//! ```
//!
//! Routes maintain these by construction: commit makes the promises and
//! every exit from `GettingEnergy` or into a terminal state takes them
//! back. Completed requests are skipped since routes stop tracking them
//! once delivered. A violation produces a [`ReservationAnomaly`].

use std::collections::BTreeMap;

use colony_types::{EntityId, Position, RequestId};

use crate::manager::LogisticsManager;
use crate::route::RouteState;

/// Mismatches found by [`audit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationAnomaly {
    /// Tick the audit ran in.
    pub tick: u64,
    /// Sources whose reservation is not backed by routes, as
    /// `(recorded, expected)`.
    pub sources: BTreeMap<Position, (u32, u32)>,
    /// Requests whose promised total is not backed by routes, as
    /// `(recorded, expected)`.
    pub requests: BTreeMap<RequestId, (u32, u32)>,
    /// Carriers whose routes promise more than they can carry.
    pub overcommitted: Vec<EntityId>,
    /// Human-readable summary.
    pub message: String,
}

/// The result of a reservation audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditResult {
    /// Every reservation and promise is backed by a live route.
    Balanced,
    /// At least one mismatch was found.
    Anomaly(ReservationAnomaly),
}

/// Check that source reservations and request promises match the live
/// routes of `manager`.
pub fn audit(tick: u64, manager: &LogisticsManager) -> AuditResult {
    let mut reserved: BTreeMap<Position, u32> = BTreeMap::new();
    let mut promised: BTreeMap<RequestId, u32> = BTreeMap::new();
    let mut overcommitted = Vec::new();

    for route in manager.routes().values() {
        if let (RouteState::GettingEnergy, Some(pos)) = (route.state, route.source) {
            let total = reserved.entry(pos).or_insert(0);
            *total = total.saturating_add(route.reserved_capacity);
        }
        if route.began.is_some() && !route.state.is_terminal() {
            for id in &route.requests {
                let amount = route.assigned_capacity.get(id).copied().unwrap_or(0);
                let total = promised.entry(*id).or_insert(0);
                *total = total.saturating_add(amount);
            }
        }
        if route.promised() > route.max_capacity {
            overcommitted.push(route.unit);
        }
    }

    let book = manager.book();
    let sources: BTreeMap<Position, (u32, u32)> = book
        .sources()
        .filter_map(|source| {
            let expected = reserved.get(&source.pos).copied().unwrap_or(0);
            (source.reserved_capacity != expected).then_some((source.pos, (source.reserved_capacity, expected)))
        })
        .collect();
    let requests: BTreeMap<RequestId, (u32, u32)> = book
        .requests()
        .filter(|request| !request.completed)
        .filter_map(|request| {
            let expected = promised.get(&request.id).copied().unwrap_or(0);
            (request.assigned_capacity != expected).then_some((request.id, (request.assigned_capacity, expected)))
        })
        .collect();

    if sources.is_empty() && requests.is_empty() && overcommitted.is_empty() {
        return AuditResult::Balanced;
    }
    let message = format!(
        "RESERVATION_ANOMALY at tick {tick}: {} source(s), {} request(s), {} overcommitted route(s)",
        sources.len(),
        requests.len(),
        overcommitted.len(),
    );
    AuditResult::Anomaly(ReservationAnomaly {
        tick,
        sources,
        requests,
        overcommitted,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogisticsConfig;
    use crate::request::LogisticsRequest;
    use colony_types::ZoneId;
    use colony_world::{Entity, EntityKind, SnapshotWorld, Store, WorldView};

    const HOME: ZoneId = ZoneId::new(0, 0);

    fn busy_manager() -> (SnapshotWorld, LogisticsManager) {
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
            Position::new(HOME, 25, 26),
            Store::new(500, 2000),
        ));
        let tower = world
            .add_entity(Entity::new("tower", EntityKind::Tower, Position::new(HOME, 10, 10), Store::empty(1000)))
            .unwrap_or_default();
        let mut manager = LogisticsManager::new(LogisticsConfig::default());
        for x in [20, 30] {
            let unit = world
                .add_entity(Entity::unit("hauler", Position::new(HOME, x, 20), 50, 0))
                .unwrap_or_default();
            let _ = manager.add_carrier(unit);
        }
        let _ = manager.submit(
            "tower",
            LogisticsRequest::transfer(tower, Position::new(HOME, 10, 10), 80, 1, world.tick()),
        );
        let _ = manager.plan(&world);
        (world, manager)
    }

    #[test]
    fn committed_routes_balance() {
        let (world, manager) = busy_manager();
        assert_eq!(manager.routes().len(), 2);
        assert_eq!(audit(world.tick(), &manager), AuditResult::Balanced);
    }

    #[test]
    fn tampered_reservation_reported() {
        let (world, manager) = busy_manager();
        let json = serde_json::to_string(&manager).unwrap_or_default();
        let tampered = json.replacen("\"reserved_capacity\":80", "\"reserved_capacity\":95", 1);
        let manager: LogisticsManager = serde_json::from_str(&tampered).unwrap_or_default();
        let anomaly = match audit(world.tick(), &manager) {
            AuditResult::Anomaly(anomaly) => Some(anomaly),
            AuditResult::Balanced => None,
        };
        assert_eq!(
            anomaly.as_ref().and_then(|a| a.sources.values().next().copied()),
            Some((95, 80))
        );
        assert!(anomaly.is_some_and(|a| a.message.starts_with("RESERVATION_ANOMALY")));
    }
}
