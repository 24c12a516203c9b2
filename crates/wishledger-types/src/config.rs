//! Configuration for the WishLedger engine.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{constants, Tier};

/// Tunable parameters for one ledger engine instance.
///
/// Defaults come from the named constants in [`crate::constants`]; products
/// with different economies override per field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Units of tier_n per unit of tier_{n+1}.
    pub conversion_ratio: u64,
    /// Maximum count per tier, indexed by [`Tier::index`].
    pub tier_max: [u64; 3],
    /// Age after which an undecided pending entry is surfaced as stale.
    pub stale_after_ms: u64,
    /// Size of the applied-transaction-id duplicate-suppression window.
    pub applied_id_window: usize,
}

impl LedgerConfig {
    /// Maximum count allowed for a tier.
    #[must_use]
    pub fn max_for(&self, tier: Tier) -> u64 {
        self.tier_max[tier.index()]
    }

    /// Stale threshold as a chrono duration.
    #[must_use]
    pub fn stale_after(&self) -> Duration {
        Duration::milliseconds(i64::try_from(self.stale_after_ms).unwrap_or(i64::MAX))
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            conversion_ratio: constants::CONVERSION_RATIO,
            tier_max: [
                constants::DEFAULT_MAX_GREEN,
                constants::DEFAULT_MAX_BLUE,
                constants::DEFAULT_MAX_RED,
            ],
            stale_after_ms: constants::DEFAULT_STALE_AFTER_MS,
            applied_id_window: constants::DEFAULT_APPLIED_ID_WINDOW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = LedgerConfig::default();
        assert_eq!(cfg.conversion_ratio, 10);
        assert_eq!(cfg.max_for(Tier::Green), constants::DEFAULT_MAX_GREEN);
        assert_eq!(cfg.max_for(Tier::Blue), constants::DEFAULT_MAX_BLUE);
        assert_eq!(cfg.max_for(Tier::Red), constants::DEFAULT_MAX_RED);
        assert!(cfg.applied_id_window > 0);
    }

    #[test]
    fn stale_after_converts_to_duration() {
        let cfg = LedgerConfig {
            stale_after_ms: 5_000,
            ..LedgerConfig::default()
        };
        assert_eq!(cfg.stale_after(), Duration::seconds(5));
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = LedgerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: LedgerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.conversion_ratio, back.conversion_ratio);
        assert_eq!(cfg.tier_max, back.tier_max);
        assert_eq!(cfg.stale_after_ms, back.stale_after_ms);
    }
}
