//! # wishledger-types
//!
//! Shared types, errors, and configuration for the **WishLedger** wallet &
//! ledger reconciliation engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`TransactionId`], [`LocalId`], [`DisputeId`]
//! - **Currency model**: [`Tier`], [`Balance`], [`TierDelta`]
//! - **Transaction model**: [`Transaction`], [`ProposedTransaction`], [`ProposedPair`], [`TxKind`], [`TxStatus`]
//! - **Event model**: [`LedgerEvent`], [`EventStatus`]
//! - **Configuration**: [`LedgerConfig`]
//! - **Errors**: [`LedgerError`] with `WL_ERR_` prefix codes
//! - **Constants**: conversion ratio, tier bounds, and defaults

pub mod balance;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod tier;
pub mod transaction;

// Re-export all primary types at crate root for ergonomic imports:
//   use wishledger_types::{Balance, Tier, Transaction, LedgerEvent, ...};

pub use balance::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use tier::*;
pub use transaction::*;

// Constants are accessed via `wishledger_types::constants::FOO`
// (not re-exported to avoid name collisions).
