//! Configuration: symbol reference data (RTH profile, tick-value
//! multiplier) and replay tuning, loaded as plain `serde`-deserializable
//! values rather than the original's hard-coded symbol-ID tables.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::persistence::model::SymbolId;
use crate::time::RthProfile;

/// Per-symbol reference data the bar source and matching engine need.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymbolReference {
    pub rth_profile: RthProfile,
    pub tick_value_multiplier: rust_decimal::Decimal,
}

/// Tuning for the replay controller's prefetch loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Buffer length per symbol below which the prefetch loop requests more
    /// bars. Matches the original's `fetchThreshold`.
    pub fetch_threshold: usize,
    /// How often the prefetch loop wakes to check buffer levels.
    pub prefetch_interval_secs: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { fetch_threshold: 100, prefetch_interval_secs: 3 }
    }
}

/// Top-level engine configuration: replay tuning plus the symbol reference
/// table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub replay: ReplayConfig,
    pub symbols: HashMap<SymbolId, SymbolReference>,
}

impl EngineConfig {
    pub fn symbol(&self, id: SymbolId) -> Option<&SymbolReference> {
        self.symbols.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_replay_config_matches_original_fetch_threshold() {
        let config = ReplayConfig::default();
        assert_eq!(config.fetch_threshold, 100);
        assert_eq!(config.prefetch_interval_secs, 3);
    }
}
