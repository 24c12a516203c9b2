//! # wishledger-sync
//!
//! **Reconciliation plane**: the seam between a session's Ledger State
//! Machine and the authoritative world.
//!
//! ## Architecture
//!
//! 1. **[`TransactionLog`]**: the narrow async interface to the durable
//!    append-only store — `append`, `append_pair` (pair-atomic), and
//!    `snapshot` for resync
//! 2. **[`InMemoryLog`]**: a full in-process implementation, used by the
//!    integration tests; it assigns ids and per-user sequence numbers,
//!    re-validates every proposal against confirmed state (the final
//!    arbiter), and emits decision events
//! 3. **[`ReconciliationChannel`]**: consumes the at-least-once event
//!    stream, discards duplicates by sequence number, applies in-order
//!    events, and answers sequence gaps with a full resync
//!
//! ## Event Flow
//!
//! ```text
//! apply_local() → submit() → log.append() → decision → LedgerEvent
//!              → ReconciliationChannel.process() → confirm/reject/resync
//! ```
//!
//! The gap-triggers-resync policy is deliberate: no reorder buffer, and
//! eventual correctness is guaranteed by refolding the log, which is cheap
//! at wish-economy transaction volumes.

pub mod channel;
pub mod log;

pub use channel::{ReconcileOutcome, ReconciliationChannel};
pub use log::{AppendReceipt, InMemoryLog, LedgerSnapshot, PairReceipt, TransactionLog};
