//! Shared logistics state: known sources and live requests.
//!
//! Routes refer to sources by position and to requests by id; the
//! [`LogisticsBook`] owns both maps and answers capacity queries. The raw
//! energy total of each source is memoized in a [`TickCache`] that the
//! owner resets with [`LogisticsBook::new_tick`]. Reservations are applied
//! on top of the cached total, so a reservation made earlier in the same
//! tick is always visible.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use colony_types::{EntityId, Position, RequestId, ResultCode};
use colony_world::{Movement, TickCache, World, WorldView};

use crate::request::LogisticsRequest;
use crate::source::LogisticsSource;

/// Sources, requests, and request keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogisticsBook {
    #[serde(serialize_with = "serialize_sources", deserialize_with = "deserialize_sources")]
    sources: BTreeMap<Position, LogisticsSource>,
    requests: BTreeMap<RequestId, LogisticsRequest>,
    keys: BTreeMap<String, RequestId>,
    next_seq: u64,
    #[serde(skip)]
    raw_capacity: TickCache<Position, u32>,
}

impl LogisticsBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tick `tick`, dropping memoized capacities from earlier ticks.
    pub fn new_tick(&mut self, tick: u64) {
        self.raw_capacity.new_tick(tick);
    }

    // --- Sources ---

    /// Register a source. An existing source at the same position is kept.
    /// Returns whether the source was new.
    pub fn add_source(&mut self, source: LogisticsSource) -> bool {
        if self.sources.contains_key(&source.pos) {
            return false;
        }
        debug!(pos = %source.pos, primary = source.primary, "logistics source discovered");
        self.sources.insert(source.pos, source);
        true
    }

    /// The source at `pos`.
    pub fn source(&self, pos: Position) -> Option<&LogisticsSource> {
        self.sources.get(&pos)
    }

    /// All sources, ordered by position.
    pub fn sources(&self) -> impl Iterator<Item = &LogisticsSource> {
        self.sources.values()
    }

    /// Energy held by the source at `pos`, ignoring reservations. Computed
    /// at most once per tick.
    pub fn raw_capacity<V: WorldView + ?Sized>(&mut self, view: &V, pos: Position) -> u32 {
        if let Some(&raw) = self.raw_capacity.get(&pos) {
            return raw;
        }
        let Some(source) = self.sources.get_mut(&pos) else {
            return 0;
        };
        let _ = source.refresh(view);
        let raw = source.raw_capacity(view);
        self.raw_capacity.insert(pos, raw);
        raw
    }

    /// Unreserved energy at the source at `pos`.
    pub fn capacity<V: WorldView + ?Sized>(&mut self, view: &V, pos: Position) -> u32 {
        let raw = self.raw_capacity(view, pos);
        self.sources.get(&pos).map_or(0, |s| s.available(raw))
    }

    /// Reserve up to `amount` at the source at `pos`. Returns the amount
    /// actually reserved.
    pub fn reserve<V: WorldView + ?Sized>(&mut self, view: &V, pos: Position, amount: u32) -> u32 {
        let raw = self.raw_capacity(view, pos);
        self.sources.get_mut(&pos).map_or(0, |s| s.reserve(amount, raw))
    }

    /// Release `amount` reserved at the source at `pos`.
    pub fn unreserve(&mut self, pos: Position, amount: u32) {
        if let Some(source) = self.sources.get_mut(&pos) {
            source.unreserve(amount);
        }
    }

    /// Withdraw from the source at `pos` into `unit`.
    pub fn transfer<W: World + ?Sized>(
        &mut self,
        world: &mut W,
        movement: &mut Movement,
        pos: Position,
        unit: EntityId,
        amount: Option<u32>,
        range: u32,
    ) -> ResultCode {
        match self.sources.get_mut(&pos) {
            Some(source) => source.transfer(world, movement, unit, amount, range),
            None => ResultCode::ErrNotFound,
        }
    }

    // --- Requests ---

    /// Submit `request` under `key`.
    ///
    /// A live request already filed under the same key is superseded (and
    /// marked completed) when the new one is at least as urgent. A less
    /// urgent submission is dropped and the existing id returned.
    pub fn submit(&mut self, key: impl Into<String>, mut request: LogisticsRequest) -> RequestId {
        let key = key.into();
        let live = self
            .keys
            .get(&key)
            .and_then(|id| self.requests.get_mut(id))
            .filter(|r| !r.completed);
        if let Some(old) = live {
            if request.priority > old.priority {
                return old.id;
            }
            old.completed = true;
            debug!(key = %key, old = %old.id, new = %request.id, "request superseded");
        }
        request.seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        let id = request.id;
        self.requests.insert(id, request);
        self.keys.insert(key, id);
        id
    }

    /// The live request filed under `key`, if any.
    pub fn request_for_key(&self, key: &str) -> Option<&LogisticsRequest> {
        self.keys
            .get(key)
            .and_then(|id| self.requests.get(id))
            .filter(|r| !r.completed)
    }

    /// Look up a request.
    pub fn request(&self, id: RequestId) -> Option<&LogisticsRequest> {
        self.requests.get(&id)
    }

    /// Look up a request mutably.
    pub fn request_mut(&mut self, id: RequestId) -> Option<&mut LogisticsRequest> {
        self.requests.get_mut(&id)
    }

    /// All requests, ordered by id.
    pub fn requests(&self) -> impl Iterator<Item = &LogisticsRequest> {
        self.requests.values()
    }

    /// Pending requests, most urgent first, ties in submission order.
    pub fn pending(&self) -> Vec<RequestId> {
        let mut pending: Vec<&LogisticsRequest> = self.requests.values().filter(|r| r.is_pending()).collect();
        pending.sort_by_key(|r| (r.priority, r.seq));
        pending.into_iter().map(|r| r.id).collect()
    }

    /// Drop completed requests that no live route still holds. Returns the
    /// number removed.
    pub fn collect_garbage(&mut self, held: &BTreeSet<RequestId>) -> usize {
        let before = self.requests.len();
        self.requests.retain(|id, r| !r.completed || held.contains(id));
        let requests = &self.requests;
        self.keys.retain(|_, id| requests.contains_key(id));
        before.saturating_sub(self.requests.len())
    }
}

/// Sources are persisted as a list; each carries its own position.
fn serialize_sources<S>(sources: &BTreeMap<Position, LogisticsSource>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(sources.values())
}

fn deserialize_sources<'de, D>(deserializer: D) -> Result<BTreeMap<Position, LogisticsSource>, D::Error>
where
    D: Deserializer<'de>,
{
    let list = Vec::<LogisticsSource>::deserialize(deserializer)?;
    Ok(list.into_iter().map(|s| (s.pos, s)).collect())
}
