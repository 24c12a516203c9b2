//! # wishledger-engine
//!
//! **Ledger State Machine**: the per-session, in-memory projection of every
//! user's wallet, and the operations that mutate it.
//!
//! ## Architecture
//!
//! One [`LedgerStateMachine`] per active session:
//! 1. **`LedgerProjection`**: confirmed balance + FIFO pending optimistic
//!    deltas + per-user sequence cursor
//! 2. **`AppliedIdWindow`**: bounded duplicate suppression for remote events
//! 3. **Conversion**: both-or-neither pending pair for tier exchanges
//! 4. **Dispute settlement**: compensating transactions through the same
//!    policy gate as everything else
//!
//! ## Mutation Flow
//!
//! ```text
//! UI → apply_local() → pending entry → (sync layer appends to log)
//!    → confirm_remote()/reject_remote() ← Reconciliation Channel
//! ```
//!
//! The machine never talks to the log or the transport itself; the sync
//! layer drives it. All validation goes through `wishledger-policy`, so an
//! optimistic balance can never display a state the policy would reject.

pub mod applied_ids;
pub mod conversion;
pub mod dispute;
pub mod machine;
pub mod projection;

pub use applied_ids::AppliedIdWindow;
pub use conversion::ConversionTicket;
pub use dispute::{settle_dispute, DisputeOutcome};
pub use machine::LedgerStateMachine;
pub use projection::{LedgerProjection, PendingDelta, PendingState};
