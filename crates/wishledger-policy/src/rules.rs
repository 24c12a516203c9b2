//! Delta validation against tier bounds.
//!
//! The hard gate every balance mutation passes through. Validation never
//! mutates anything: callers apply the delta themselves only after an `Ok`.

use wishledger_types::{Balance, LedgerConfig, LedgerError, Result, Tier, TierDelta};

/// The pure rule set: conversion ratio and per-tier bounds.
///
/// Cheap to clone; both the engine and the authoritative log hold one.
#[derive(Debug, Clone, Default)]
pub struct CurrencyPolicy {
    config: LedgerConfig,
}

impl CurrencyPolicy {
    #[must_use]
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }

    /// The fixed lower→higher conversion ratio R.
    #[must_use]
    pub fn conversion_ratio(&self) -> u64 {
        self.config.conversion_ratio
    }

    /// Maximum count a tier may hold.
    #[must_use]
    pub fn max_for(&self, tier: Tier) -> u64 {
        self.config.max_for(tier)
    }

    /// Validate a single delta against a balance.
    ///
    /// # Errors
    /// - [`LedgerError::ZeroDelta`] if the delta has no effect
    /// - [`LedgerError::InsufficientBalance`] if the tier would go negative
    /// - [`LedgerError::OverMax`] if the tier would exceed its maximum
    pub fn validate(&self, balance: &Balance, delta: TierDelta) -> Result<()> {
        if delta.is_zero() {
            return Err(LedgerError::ZeroDelta);
        }

        let have = balance.get(delta.tier);
        let resulting = i128::from(have) + i128::from(delta.amount);

        if resulting < 0 {
            return Err(LedgerError::InsufficientBalance {
                tier: delta.tier,
                need: delta.amount.unsigned_abs(),
                have,
            });
        }
        if resulting > i128::from(self.max_for(delta.tier)) {
            return Err(LedgerError::OverMax {
                tier: delta.tier,
                max: self.max_for(delta.tier),
                resulting,
            });
        }
        Ok(())
    }

    /// Validate and fold a sequence of deltas, in order.
    ///
    /// Each delta is checked against the balance produced by the previous
    /// one, so a multi-delta operation (e.g. the two halves of a conversion)
    /// is legal only if every intermediate state is legal. On error the
    /// input balance is untouched.
    pub fn apply_checked(&self, balance: &Balance, deltas: &[TierDelta]) -> Result<Balance> {
        let mut current = *balance;
        for &delta in deltas {
            self.validate(&current, delta)?;
            current = current
                .checked_apply(delta)
                .ok_or_else(|| LedgerError::Internal("checked_apply after validate".into()))?;
        }
        Ok(current)
    }
}
