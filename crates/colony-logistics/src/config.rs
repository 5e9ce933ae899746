//! Tunables for routing and matching.

use serde::{Deserialize, Serialize};

/// Logistics configuration, loaded as the `logistics` section of the
/// colony config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsConfig {
    /// A unit already holding at least this percentage of its capacity
    /// skips the source and goes straight to delivering.
    #[serde(default = "default_full_threshold_percent")]
    pub full_threshold_percent: u32,

    /// Whether the matcher chains further pending requests onto a new
    /// route before committing it.
    #[serde(default = "default_chain_requests")]
    pub chain_requests: bool,

    /// Whether a source aggregates containers on the tiles around its
    /// position as well as the position itself.
    #[serde(default = "default_source_footprint_adjacent")]
    pub source_footprint_adjacent: bool,

    /// Range at which a unit can withdraw from or deliver to a structure.
    #[serde(default = "default_interaction_range")]
    pub interaction_range: u32,
}

impl Default for LogisticsConfig {
    fn default() -> Self {
        Self {
            full_threshold_percent: default_full_threshold_percent(),
            chain_requests: default_chain_requests(),
            source_footprint_adjacent: default_source_footprint_adjacent(),
            interaction_range: default_interaction_range(),
        }
    }
}

impl LogisticsConfig {
    /// Whether a unit holding `used` out of `capacity` counts as full
    /// enough to skip getting energy.
    pub const fn is_nearly_full(&self, used: u32, capacity: u32) -> bool {
        used.saturating_mul(100) >= capacity.saturating_mul(self.full_threshold_percent)
    }
}

const fn default_full_threshold_percent() -> u32 {
    80
}

const fn default_chain_requests() -> bool {
    true
}

const fn default_source_footprint_adjacent() -> bool {
    true
}

const fn default_interaction_range() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_full_threshold() {
        let config = LogisticsConfig::default();
        assert!(config.is_nearly_full(40, 50));
        assert!(!config.is_nearly_full(39, 50));
        assert!(config.is_nearly_full(0, 0));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: LogisticsConfig = serde_json::from_str(r#"{"chain_requests": false}"#).unwrap_or_default();
        assert!(!config.chain_requests);
        assert_eq!(config.full_threshold_percent, 80);
        assert_eq!(config.interaction_range, 1);
    }
}
