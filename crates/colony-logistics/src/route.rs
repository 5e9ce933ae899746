//! The per-unit logistics route and its state machine.
//!
//! A route binds one carrier to at most one source and an ordered queue of
//! requests:
//!
//! ```text
//! PENDING --commit--> GETTING_ENERGY --full or source dry--> FULFILLING --queue empty--> COMPLETED
//!    |                     |                                    |
//!    |                     +------------- CANCELLED <-----------+
//!    +--commit, no source needed--> FULFILLING
//! ```
//!
//! Construction is speculative: it picks a source and sizes the first
//! request but touches no shared state. [`LogisticsRoute::commit`] makes
//! the promises real by reserving energy at the source and marking the
//! requests assigned. Entering a terminal state unwinds whatever promises
//! are still outstanding, so cancelling straight after a commit restores
//! every touched request and source exactly.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use colony_types::{EntityId, Position, RequestId, ResultCode};
use colony_world::{Movement, World, WorldView};

use crate::book::LogisticsBook;
use crate::config::LogisticsConfig;

/// Lifecycle state of a [`LogisticsRoute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteState {
    /// Built but not committed.
    Pending,
    /// Collecting energy from the source.
    GettingEnergy,
    /// Delivering to the queued requests.
    Fulfilling,
    /// Finished normally.
    Completed,
    /// Abandoned; promises were rolled back.
    Cancelled,
}

impl RouteState {
    /// Whether the route is finished.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// One carrier's assignment: a source to draw from and requests to serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsRoute {
    /// The carrier.
    pub unit: EntityId,
    /// Current state.
    pub state: RouteState,
    /// Source position, or `None` when the unit already carries enough.
    pub source: Option<Position>,
    /// Requests to serve, in order.
    pub requests: VecDeque<RequestId>,
    /// Energy promised to each queued request.
    pub assigned_capacity: BTreeMap<RequestId, u32>,
    /// Most energy the unit can deliver on this route.
    pub max_capacity: u32,
    /// Energy still available for chaining further requests.
    pub capacity: u32,
    /// Energy reserved at the source while getting energy.
    pub reserved_capacity: u32,
    /// Tick the route was committed in.
    pub began: Option<u64>,
}

impl LogisticsRoute {
    fn cancelled(unit: EntityId) -> Self {
        Self {
            unit,
            state: RouteState::Cancelled,
            source: None,
            requests: VecDeque::new(),
            assigned_capacity: BTreeMap::new(),
            max_capacity: 0,
            capacity: 0,
            reserved_capacity: 0,
            began: None,
        }
    }

    /// Plan a route for `unit` serving `request`.
    ///
    /// Unless the unit is already nearly full, a source is chosen in tiers:
    /// sources that can fill the unit, then sources that can cover the
    /// request alone, then any source with energy. Within the first
    /// non-empty tier the source minimizing
    /// `range(unit, source) + range(source, request)` wins, the earlier
    /// source on ties. Resupply requests only consider primary sources.
    ///
    /// A missing unit or request yields a cancelled route.
    pub fn new<V: WorldView + ?Sized>(
        view: &V,
        book: &mut LogisticsBook,
        unit: EntityId,
        request: RequestId,
        config: &LogisticsConfig,
    ) -> Self {
        let Some((unit_pos, store)) = view.entity(unit).map(|e| (e.pos, e.store)) else {
            return Self::cancelled(unit);
        };
        let Some((request_pos, open, resupply, depot)) = book
            .request(request)
            .filter(|r| !r.completed)
            .map(|r| (r.pos, r.open_capacity(), r.is_resupply(), r.is_depot()))
        else {
            return Self::cancelled(unit);
        };

        let mut source = None;
        let mut source_capacity = 0;
        if !config.is_nearly_full(store.used, store.capacity) {
            let positions: Vec<(Position, bool)> = book.sources().map(|s| (s.pos, s.primary)).collect();
            let candidates: Vec<(Position, u32)> = positions
                .into_iter()
                .filter(|&(_, primary)| primary || !resupply)
                .map(|(pos, _)| (pos, book.capacity(view, pos)))
                .filter(|&(_, capacity)| capacity > 0)
                .collect();

            let tiers = [store.free(), open, 1];
            let chosen = tiers.iter().find_map(|&minimum| {
                candidates
                    .iter()
                    .filter(|&&(_, capacity)| capacity >= minimum)
                    .min_by_key(|&&(pos, _)| unit_pos.range_to(pos).saturating_add(pos.range_to(request_pos)))
                    .copied()
            });
            if let Some((pos, capacity)) = chosen {
                source = Some(pos);
                source_capacity = capacity;
            }
        }

        let max_capacity = store.capacity.min(store.used.saturating_add(source_capacity));
        let first = max_capacity.min(open);
        let capacity = if depot { 0 } else { max_capacity.saturating_sub(open) };

        Self {
            unit,
            state: RouteState::Pending,
            source,
            requests: VecDeque::from([request]),
            assigned_capacity: BTreeMap::from([(request, first)]),
            max_capacity,
            capacity,
            reserved_capacity: 0,
            began: None,
        }
    }

    /// Total energy promised to the queued requests.
    pub fn promised(&self) -> u32 {
        self.assigned_capacity.values().fold(0_u32, |acc, &c| acc.saturating_add(c))
    }

    /// Append another request before committing.
    ///
    /// Rejected when no chaining capacity is left (always the case after a
    /// depot request), when a resupply request would draw from a
    /// non-primary source, or when the request is completed, already
    /// queued, or fully promised elsewhere.
    pub fn extend(&mut self, book: &LogisticsBook, request: RequestId) -> bool {
        if self.state != RouteState::Pending || self.capacity == 0 || self.requests.contains(&request) {
            return false;
        }
        let Some(req) = book.request(request) else {
            return false;
        };
        if req.completed {
            return false;
        }
        let source_is_primary = self
            .source
            .is_none_or(|pos| book.source(pos).is_some_and(|s| s.primary));
        if req.is_resupply() && !source_is_primary {
            return false;
        }
        let open = req.open_capacity();
        if open == 0 {
            return false;
        }

        self.requests.push_back(request);
        self.assigned_capacity.insert(request, self.capacity.min(open));
        self.capacity = if req.is_depot() { 0 } else { self.capacity.saturating_sub(open) };
        true
    }

    /// Make the route's promises real.
    ///
    /// Reserves the promised energy at the source (entering
    /// `GettingEnergy`) or, without a source, goes straight to
    /// `Fulfilling`. Every queued request is marked assigned. Fails when
    /// the route is not pending, the unit is gone, nothing is queued, or
    /// the unit can carry nothing.
    pub fn commit<V: WorldView + ?Sized>(&mut self, view: &V, book: &mut LogisticsBook) -> bool {
        if self.state != RouteState::Pending
            || self.requests.is_empty()
            || self.max_capacity == 0
            || view.entity(self.unit).is_none()
        {
            return false;
        }

        if let Some(pos) = self.source {
            let granted = book.reserve(view, pos, self.promised());
            if granted == 0 {
                return false;
            }
            self.reserved_capacity = granted;
            self.set_state(RouteState::GettingEnergy, book);
        } else {
            self.set_state(RouteState::Fulfilling, book);
        }

        for (&id, &promised) in &self.assigned_capacity {
            if let Some(request) = book.request_mut(id) {
                request.assigned = true;
                request.assigned_capacity = request.assigned_capacity.saturating_add(promised);
            }
        }
        self.began = Some(view.tick());
        info!(
            unit = %self.unit,
            source = ?self.source,
            requests = self.requests.len(),
            reserved = self.reserved_capacity,
            state = ?self.state,
            "route committed"
        );
        true
    }

    /// Move to `state`, releasing what the old state held.
    ///
    /// Leaving `GettingEnergy` releases the source reservation. Entering a
    /// terminal state after a commit takes back every promise made to the
    /// requests still queued.
    pub fn set_state(&mut self, state: RouteState, book: &mut LogisticsBook) {
        if self.state == state {
            return;
        }
        debug!(unit = %self.unit, from = ?self.state, to = ?state, "route state transition");

        if self.state == RouteState::GettingEnergy {
            if let Some(pos) = self.source {
                book.unreserve(pos, self.reserved_capacity);
            }
            self.reserved_capacity = 0;
        }
        if state.is_terminal() && !self.state.is_terminal() && self.began.is_some() {
            self.release_requests(book);
        }
        self.state = state;
    }

    /// Cancel the route, rolling back its promises.
    pub fn cancel(&mut self, book: &mut LogisticsBook) {
        self.set_state(RouteState::Cancelled, book);
    }

    fn release_requests(&mut self, book: &mut LogisticsBook) {
        for id in &self.requests {
            let promised = self.assigned_capacity.get(id).copied().unwrap_or(0);
            if let Some(request) = book.request_mut(*id) {
                request.assigned_capacity = request.assigned_capacity.saturating_sub(promised);
                request.assigned = request.assigned_capacity > 0;
            }
        }
    }

    /// Run one tick of the route.
    pub fn run<W: World + ?Sized>(
        &mut self,
        world: &mut W,
        movement: &mut Movement,
        book: &mut LogisticsBook,
        config: &LogisticsConfig,
    ) {
        if self.state == RouteState::Pending || self.state.is_terminal() {
            return;
        }
        if world.entity(self.unit).is_none() {
            warn!(unit = %self.unit, state = ?self.state, "route unit vanished, cancelling");
            self.cancel(book);
            return;
        }

        if self.state == RouteState::GettingEnergy {
            let depleted = self.source.is_none_or(|pos| book.raw_capacity(&*world, pos) == 0);
            if world.free_capacity(self.unit) == 0 || depleted {
                self.set_state(RouteState::Fulfilling, book);
            }
        }
        if self.state == RouteState::Fulfilling {
            while let Some(&head) = self.requests.front() {
                if book.request(head).is_some_and(|r| !r.completed) {
                    break;
                }
                self.requests.pop_front();
            }
            if self.requests.is_empty() {
                self.set_state(RouteState::Completed, book);
            }
        }

        match self.state {
            RouteState::GettingEnergy => {
                let code = match self.source {
                    Some(pos) => book.transfer(
                        world,
                        movement,
                        pos,
                        self.unit,
                        Some(self.reserved_capacity),
                        config.interaction_range,
                    ),
                    None => ResultCode::ErrNotFound,
                };
                if !code.is_ok() {
                    warn!(unit = %self.unit, code = %code, "getting energy failed, cancelling route");
                    self.cancel(book);
                }
            }
            RouteState::Fulfilling => {
                let Some(&head) = self.requests.front() else {
                    return;
                };
                let code = match book.request_mut(head) {
                    Some(request) => request.action(world, movement, self.unit, config.interaction_range),
                    None => ResultCode::ErrNotFound,
                };
                match code {
                    ResultCode::Ok => {}
                    ResultCode::ErrNotEnoughResources => {
                        debug!(unit = %self.unit, request = %head, "carrier ran dry, route complete");
                        self.set_state(RouteState::Completed, book);
                    }
                    other => {
                        warn!(unit = %self.unit, request = %head, code = %other, "delivery failed, cancelling route");
                        self.cancel(book);
                    }
                }
            }
            RouteState::Pending | RouteState::Completed | RouteState::Cancelled => {}
        }
    }
}
