//! Conversion rules: adjacency, multiples, and quoted output.
//!
//! Conversion moves value strictly upward (lower tier → adjacent higher
//! tier) at the fixed ratio R. The input count must be a positive multiple
//! of R, so conversions are always lossless in base-tier value.

use wishledger_types::{LedgerError, Result, Tier, TierDelta};

use crate::CurrencyPolicy;

/// The two deltas a legal conversion will apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionQuote {
    /// Debit on the lower tier (`-count`).
    pub debit: TierDelta,
    /// Credit on the adjacent higher tier (`count / R`).
    pub credit: TierDelta,
}

impl CurrencyPolicy {
    /// Check a proposed conversion and quote its two deltas.
    ///
    /// # Errors
    /// - [`LedgerError::InvalidTierJump`] unless `to` is exactly one tier
    ///   above `from`
    /// - [`LedgerError::NonMultipleConversion`] unless `count` is a positive
    ///   multiple of the conversion ratio
    pub fn check_conversion(&self, from: Tier, to: Tier, count: u64) -> Result<ConversionQuote> {
        if from.next_up() != Some(to) {
            return Err(LedgerError::InvalidTierJump { from, to });
        }
        let ratio = self.conversion_ratio();
        if count == 0 || count % ratio != 0 {
            return Err(LedgerError::NonMultipleConversion { count, ratio });
        }

        let debit_amount = i64::try_from(count)
            .map_err(|_| LedgerError::Internal(format!("conversion count {count} out of range")))?;
        let credit_amount = i64::try_from(count / ratio)
            .map_err(|_| LedgerError::Internal(format!("conversion credit {count} out of range")))?;
        Ok(ConversionQuote {
            debit: TierDelta::debit(from, debit_amount),
            credit: TierDelta::credit(to, credit_amount),
        })
    }
}
