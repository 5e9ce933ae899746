//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Live game objects are referenced by stable identifiers rather than
//! handles: a route stores the [`EntityId`] of its unit and re-resolves it
//! through the capability query layer every tick. An identifier that no
//! longer resolves is how the core learns that an entity vanished.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for any world entity: units, containers, storage,
    /// links, dropped energy piles, and harvestable energy sources.
    EntityId
}

define_id! {
    /// Unique identifier for a logistics request instance.
    ///
    /// Distinct from the request *key* used for supersession: resubmitting
    /// under the same key produces a new `RequestId`.
    RequestId
}
