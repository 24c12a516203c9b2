//! Balance and delta types for the tiered wallet model.
//!
//! A [`Balance`] holds one non-negative integer count per tier. There is no
//! fractional currency anywhere in the system. A [`TierDelta`] is the unit
//! of change: a signed amount applied to a single tier.

use serde::{Deserialize, Serialize};

use crate::Tier;

/// Per-tier balance counts for one user.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Balance {
    /// Counts indexed by [`Tier::index`].
    counts: [u64; 3],
}

impl Balance {
    /// Create a zero balance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a balance with explicit per-tier counts (green, blue, red).
    #[must_use]
    pub fn with_counts(green: u64, blue: u64, red: u64) -> Self {
        Self {
            counts: [green, blue, red],
        }
    }

    /// Count held in the given tier.
    #[must_use]
    pub fn get(&self, tier: Tier) -> u64 {
        self.counts[tier.index()]
    }

    /// Whether every tier is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Apply a delta with underflow/overflow checking.
    ///
    /// Returns `None` if the resulting count would be negative or exceed
    /// `u64::MAX`. Tier maxima are a policy concern, not checked here.
    #[must_use]
    pub fn checked_apply(&self, delta: TierDelta) -> Option<Balance> {
        let current = i128::from(self.get(delta.tier));
        let next = u64::try_from(current + i128::from(delta.amount)).ok()?;
        let mut out = *self;
        out.counts[delta.tier.index()] = next;
        Some(out)
    }

    /// Apply a delta, clamping the affected tier at zero instead of failing.
    ///
    /// Used only for the defensive display path: a projection must never
    /// show a negative count, even transiently.
    #[must_use]
    pub fn saturating_apply(&self, delta: TierDelta) -> Balance {
        let current = i128::from(self.get(delta.tier));
        let next = (current + i128::from(delta.amount)).max(0);
        let mut out = *self;
        out.counts[delta.tier.index()] = u64::try_from(next).unwrap_or(u64::MAX);
        out
    }

    /// Total value expressed in base-tier (green) equivalents.
    ///
    /// Conservation invariant: this never increases across a conversion.
    #[must_use]
    pub fn value_in_base(&self, ratio: u64) -> u128 {
        let r = u128::from(ratio);
        u128::from(self.counts[0])
            + u128::from(self.counts[1]) * r
            + u128::from(self.counts[2]) * r * r
    }
}

/// A signed change to a single tier's count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierDelta {
    /// The tier affected.
    pub tier: Tier,
    /// Signed count change (positive = credit, negative = debit).
    pub amount: i64,
}

impl TierDelta {
    #[must_use]
    pub fn new(tier: Tier, amount: i64) -> Self {
        Self { tier, amount }
    }

    /// A positive (crediting) delta.
    #[must_use]
    pub fn credit(tier: Tier, amount: i64) -> Self {
        Self {
            tier,
            amount: amount.abs(),
        }
    }

    /// A negative (debiting) delta.
    #[must_use]
    pub fn debit(tier: Tier, amount: i64) -> Self {
        Self {
            tier,
            amount: -amount.abs(),
        }
    }

    /// Whether this delta has no effect.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zero() {
        let bal = Balance::new();
        assert!(bal.is_zero());
        for tier in Tier::ALL {
            assert_eq!(bal.get(tier), 0);
        }
    }

    #[test]
    fn with_counts_maps_tiers() {
        let bal = Balance::with_counts(15, 2, 0);
        assert_eq!(bal.get(Tier::Green), 15);
        assert_eq!(bal.get(Tier::Blue), 2);
        assert_eq!(bal.get(Tier::Red), 0);
    }

    #[test]
    fn checked_apply_credit_and_debit() {
        let bal = Balance::with_counts(10, 0, 0);
        let credited = bal.checked_apply(TierDelta::credit(Tier::Green, 5)).unwrap();
        assert_eq!(credited.get(Tier::Green), 15);
        let debited = credited.checked_apply(TierDelta::debit(Tier::Green, 15)).unwrap();
        assert_eq!(debited.get(Tier::Green), 0);
    }

    #[test]
    fn checked_apply_underflow_is_none() {
        let bal = Balance::with_counts(3, 0, 0);
        assert!(bal.checked_apply(TierDelta::debit(Tier::Green, 4)).is_none());
    }

    #[test]
    fn saturating_apply_clamps_at_zero() {
        let bal = Balance::with_counts(3, 0, 0);
        let out = bal.saturating_apply(TierDelta::debit(Tier::Green, 10));
        assert_eq!(out.get(Tier::Green), 0);
    }

    #[test]
    fn value_in_base_weights_tiers() {
        // 5 green + 2 blue + 1 red at R=10 → 5 + 20 + 100 = 125
        let bal = Balance::with_counts(5, 2, 1);
        assert_eq!(bal.value_in_base(10), 125);
    }

    #[test]
    fn conversion_conserves_base_value() {
        // 10 green → 1 blue is value-neutral at R=10.
        let before = Balance::with_counts(15, 2, 0);
        let after = before
            .checked_apply(TierDelta::debit(Tier::Green, 10))
            .unwrap()
            .checked_apply(TierDelta::credit(Tier::Blue, 1))
            .unwrap();
        assert_eq!(before.value_in_base(10), after.value_in_base(10));
    }

    #[test]
    fn delta_constructors_normalize_sign() {
        assert_eq!(TierDelta::credit(Tier::Blue, -4).amount, 4);
        assert_eq!(TierDelta::debit(Tier::Blue, 4).amount, -4);
        assert!(TierDelta::new(Tier::Red, 0).is_zero());
    }

    #[test]
    fn balance_serde_roundtrip() {
        let bal = Balance::with_counts(7, 3, 1);
        let json = serde_json::to_string(&bal).unwrap();
        let back: Balance = serde_json::from_str(&json).unwrap();
        assert_eq!(bal, back);
    }
}
