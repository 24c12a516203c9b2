//! Per-user projection: confirmed balance plus optimistic pending deltas.
//!
//! The projection is the only state a session renders from. It is derived:
//! the confirmed balance equals the fold of the user's confirmed
//! transactions in the log, and can always be rebuilt from there (resync).
//! Pending entries are FIFO in caller invocation order.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use wishledger_types::{Balance, LocalId, TierDelta, TransactionId, TxKind};

use crate::AppliedIdWindow;

/// Whether a pending entry is still awaiting a decision or has aged out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    /// Submitted (or about to be), decision expected.
    InFlight,
    /// No decision within the stale threshold: indeterminate. The UI must
    /// render this distinctly from both confirmed and rejected.
    Stale,
}

/// One optimistic, not-yet-confirmed balance change.
#[derive(Debug, Clone)]
pub struct PendingDelta {
    pub local_id: LocalId,
    pub kind: TxKind,
    pub delta: TierDelta,
    /// Log-assigned id, linked once the append receipt arrives.
    pub originating_tx: Option<TransactionId>,
    pub related_entity_id: Option<Uuid>,
    pub submitted_at: DateTime<Utc>,
    pub state: PendingState,
}

impl PendingDelta {
    #[must_use]
    pub fn new(kind: TxKind, delta: TierDelta, related_entity_id: Option<Uuid>) -> Self {
        Self {
            local_id: LocalId::new(),
            kind,
            delta,
            originating_tx: None,
            related_entity_id,
            submitted_at: Utc::now(),
            state: PendingState::InFlight,
        }
    }
}

/// In-memory projection of one user's wallet.
#[derive(Debug)]
pub struct LedgerProjection {
    /// Fold of the user's confirmed transactions, per tier.
    confirmed: Balance,
    /// Optimistic deltas in caller invocation order (front = oldest).
    pending: VecDeque<PendingDelta>,
    /// Highest remote sequence number applied so far.
    last_applied_seq: u64,
    /// Duplicate suppression for at-least-once remote events.
    applied_ids: AppliedIdWindow,
}

impl LedgerProjection {
    #[must_use]
    pub fn new(confirmed: Balance, last_applied_seq: u64, applied_id_window: usize) -> Self {
        Self {
            confirmed,
            pending: VecDeque::new(),
            last_applied_seq,
            applied_ids: AppliedIdWindow::new(applied_id_window),
        }
    }

    #[must_use]
    pub fn confirmed(&self) -> Balance {
        self.confirmed
    }

    #[must_use]
    pub fn last_applied_seq(&self) -> u64 {
        self.last_applied_seq
    }

    /// Advance the remote sequence cursor. Never moves backwards.
    pub fn advance_seq(&mut self, seq: u64) {
        self.last_applied_seq = self.last_applied_seq.max(seq);
    }

    /// Confirmed balance folded with every pending delta, clamped at zero
    /// per tier. The clamp is defensive: policy validation makes a negative
    /// fold unreachable, but the projection must never display one.
    #[must_use]
    pub fn optimistic(&self) -> Balance {
        self.pending
            .iter()
            .fold(self.confirmed, |bal, entry| bal.saturating_apply(entry.delta))
    }

    /// Record a remote transaction id as applied.
    ///
    /// Returns `false` if the id was already applied (replayed event).
    pub fn mark_applied(&mut self, tx_id: TransactionId) -> bool {
        self.applied_ids.insert(tx_id)
    }

    /// Fold an authoritative delta into the confirmed balance.
    ///
    /// The log has already validated the delta, so a failed checked apply
    /// means local state diverged; clamping keeps the display sane until
    /// the next resync repairs it.
    pub fn fold_confirmed(&mut self, delta: TierDelta) -> bool {
        match self.confirmed.checked_apply(delta) {
            Some(next) => {
                self.confirmed = next;
                true
            }
            None => {
                self.confirmed = self.confirmed.saturating_apply(delta);
                false
            }
        }
    }

    pub fn push_pending(&mut self, entry: PendingDelta) {
        self.pending.push_back(entry);
    }

    /// Remove the pending entry originated by the given transaction, if any.
    pub fn remove_by_tx(&mut self, tx_id: TransactionId) -> Option<PendingDelta> {
        let pos = self
            .pending
            .iter()
            .position(|e| e.originating_tx == Some(tx_id))?;
        self.pending.remove(pos)
    }

    /// Look up a pending entry by its local id.
    #[must_use]
    pub fn pending_by_local(&self, local_id: LocalId) -> Option<&PendingDelta> {
        self.pending.iter().find(|e| e.local_id == local_id)
    }

    /// Remove a pending entry by its local id.
    ///
    /// Only legal for entries the log never accepted (failed append): once
    /// a transaction is in the log it can only be compensated, not
    /// withdrawn.
    pub fn remove_by_local(&mut self, local_id: LocalId) -> Option<PendingDelta> {
        let pos = self.pending.iter().position(|e| e.local_id == local_id)?;
        self.pending.remove(pos)
    }

    /// Link a log-assigned transaction id to a pending entry.
    ///
    /// Returns `false` if no entry with that local id exists.
    pub fn attach_tx(&mut self, local_id: LocalId, tx_id: TransactionId) -> bool {
        match self.pending.iter_mut().find(|e| e.local_id == local_id) {
            Some(entry) => {
                entry.originating_tx = Some(tx_id);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn stale_count(&self) -> usize {
        self.pending
            .iter()
            .filter(|e| e.state == PendingState::Stale)
            .count()
    }

    /// Mark in-flight entries older than `threshold` as stale.
    ///
    /// Returns how many entries changed state in this sweep.
    pub fn sweep_stale(&mut self, now: DateTime<Utc>, threshold: Duration) -> usize {
        let mut swept = 0;
        for entry in &mut self.pending {
            if entry.state == PendingState::InFlight && now - entry.submitted_at > threshold {
                entry.state = PendingState::Stale;
                swept += 1;
            }
        }
        swept
    }

    /// Resync: replace confirmed balance and sequence cursor atomically,
    /// then drop pending entries whose originating transaction the server
    /// no longer holds as pending (their outcome is already in the new
    /// confirmed fold). Entries not yet linked to a transaction id are kept;
    /// their append receipt is still in flight.
    pub fn replace(
        &mut self,
        confirmed: Balance,
        last_applied_seq: u64,
        server_pending: &[TransactionId],
    ) -> usize {
        self.confirmed = confirmed;
        self.last_applied_seq = last_applied_seq;
        self.applied_ids.clear();

        let before = self.pending.len();
        self.pending.retain(|entry| match entry.originating_tx {
            Some(tx_id) => server_pending.contains(&tx_id),
            None => true,
        });
        before - self.pending.len()
    }
}
