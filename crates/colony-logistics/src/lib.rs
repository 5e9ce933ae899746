//! Logistics routing and reservation engine for the colony core.
//!
//! Carriers move energy from *sources* (aggregated containers at a
//! position) to *requests* (demands at a target). The engine keeps the
//! two sides honest with reservations: a source's energy is promised to at
//! most one route at a time, and every promise is rolled back when the
//! route that made it ends early.
//!
//! # Modules
//!
//! - [`audit`] -- Reservation conservation check over live routes.
//! - [`book`] -- [`LogisticsBook`]: known sources, live requests, and
//!   per-tick memoized source capacity.
//! - [`config`] -- [`LogisticsConfig`] tunables.
//! - [`error`] -- Error types for the manager's bookkeeping API.
//! - [`manager`] -- [`LogisticsManager`]: source discovery, the greedy
//!   matcher, route execution, and retirement.
//! - [`request`] -- [`LogisticsRequest`] and its [`RequestKind`].
//! - [`route`] -- [`LogisticsRoute`] and the [`RouteState`] machine.
//! - [`source`] -- [`LogisticsSource`], a reservable pool of energy.

pub mod audit;
pub mod book;
pub mod config;
pub mod error;
pub mod manager;
pub mod request;
pub mod route;
pub mod source;

// Re-export primary types at crate root.
pub use audit::{AuditResult, ReservationAnomaly, audit};
pub use book::LogisticsBook;
pub use config::LogisticsConfig;
pub use error::LogisticsError;
pub use manager::{LogisticsManager, PlanReport, RunReport, STORAGE_RESUPPLY_PRIORITY};
pub use request::{LogisticsRequest, RequestKind};
pub use route::{LogisticsRoute, RouteState};
pub use source::LogisticsSource;
