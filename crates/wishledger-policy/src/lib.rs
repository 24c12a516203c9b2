//! # wishledger-policy
//!
//! **Currency Policy**: the pure rules of the wish economy.
//!
//! No I/O, no clocks, no state beyond the configured bounds. Everything here
//! is a function of (balance, proposed change) → Ok / Rejected. Both the
//! Ledger State Machine (optimistic validation) and the Transaction Log
//! (authoritative validation) gate every mutation through this crate, so a
//! delta that is illegal here never reaches a balance anywhere.

pub mod conversion;
pub mod rules;

pub use conversion::ConversionQuote;
pub use rules::CurrencyPolicy;
