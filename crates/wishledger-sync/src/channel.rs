//! The Reconciliation Channel: at-least-once decision events in,
//! exactly-once projection mutations out.
//!
//! Ordering discipline per user, keyed by the event's sequence number
//! against the projection's cursor:
//! - `seq <= last_applied`: replay, discard
//! - `seq == last_applied + 1`: in order, apply and advance
//! - `seq > last_applied + 1`: gap, drop the event and resync from a log
//!   snapshot (no reorder buffer)
//!
//! The channel also carries proposals outward: [`ReconciliationChannel::submit`]
//! and [`ReconciliationChannel::submit_conversion`] append to the log and
//! link the receipts back into the pending entries.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use wishledger_engine::{ConversionTicket, LedgerStateMachine};
use wishledger_types::{LedgerError, LedgerEvent, LocalId, Result, UserId};

use crate::log::{AppendReceipt, PairReceipt, TransactionLog};

/// What [`ReconciliationChannel::process`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// In-order event merged into the projection.
    Applied,
    /// Replay of an already-applied sequence number, discarded.
    Duplicate,
    /// A gap was detected; the event was dropped and the projection was
    /// rebuilt from a log snapshot (which already covers the event).
    Resynced,
}

/// Binds a session's [`LedgerStateMachine`] to a [`TransactionLog`].
pub struct ReconciliationChannel<L: TransactionLog> {
    machine: LedgerStateMachine,
    log: L,
}

impl<L: TransactionLog> ReconciliationChannel<L> {
    #[must_use]
    pub fn new(machine: LedgerStateMachine, log: L) -> Self {
        Self { machine, log }
    }

    #[must_use]
    pub fn machine(&self) -> &LedgerStateMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut LedgerStateMachine {
        &mut self.machine
    }

    /// Load a user's projection from a fresh log snapshot.
    ///
    /// # Errors
    /// [`LedgerError::ResyncFailed`] when the snapshot cannot be taken.
    pub async fn load_user(&mut self, user: UserId) -> Result<()> {
        let snap = self
            .log
            .snapshot(user)
            .await
            .map_err(|err| LedgerError::ResyncFailed {
                reason: err.to_string(),
            })?;
        self.machine.load(user, snap.confirmed, snap.last_seq);
        Ok(())
    }

    /// Handle one decision event from the transport.
    ///
    /// # Errors
    /// [`LedgerError::ResyncFailed`] when a gap was detected but the
    /// recovery snapshot could not be taken. Replays and in-order events
    /// never error.
    pub async fn process(&mut self, event: LedgerEvent) -> Result<ReconcileOutcome> {
        let user = event.user_id;
        if !self.machine.is_loaded(user) {
            debug!(%user, seq = event.seq, "event for unloaded user, loading from snapshot");
            self.load_user(user).await?;
            return Ok(ReconcileOutcome::Resynced);
        }

        let last = self.machine.last_applied_seq(user)?;
        if event.seq <= last {
            debug!(%user, seq = event.seq, last, "duplicate event discarded");
            return Ok(ReconcileOutcome::Duplicate);
        }
        if event.seq > last + 1 {
            warn!(%user, seq = event.seq, last, "sequence gap, resyncing");
            self.resync(user).await?;
            return Ok(ReconcileOutcome::Resynced);
        }

        if event.is_confirmed() {
            self.machine
                .confirm_remote(user, event.transaction_id, event.tier_delta())?;
        } else {
            let reason = event.reason.as_deref().unwrap_or("rejected");
            self.machine
                .reject_remote(user, event.transaction_id, reason)?;
        }
        self.machine.advance_seq(user, event.seq)?;
        Ok(ReconcileOutcome::Applied)
    }

    /// Rebuild a user's projection from an authoritative snapshot.
    ///
    /// # Errors
    /// [`LedgerError::ResyncFailed`] wrapping the underlying log error.
    pub async fn resync(&mut self, user: UserId) -> Result<()> {
        let snap = self
            .log
            .snapshot(user)
            .await
            .map_err(|err| LedgerError::ResyncFailed {
                reason: err.to_string(),
            })?;
        let pruned =
            self.machine
                .replace_confirmed(user, snap.confirmed, snap.last_seq, &snap.pending)?;
        info!(%user, seq = snap.last_seq, pruned, "projection resynced from snapshot");
        Ok(())
    }

    /// Append a pending entry's proposal to the log and link the assigned
    /// transaction id back into the projection.
    ///
    /// If the append fails the optimistic entry is rolled back: the log
    /// never saw it, so leaving it pending would diverge the projection
    /// permanently (resync keeps unlinked entries).
    ///
    /// # Errors
    /// [`LedgerError::PendingNotFound`] or log transport errors (4xx).
    pub async fn submit(&mut self, user: UserId, local_id: LocalId) -> Result<AppendReceipt> {
        let proposal = self.machine.proposal(user, local_id)?;
        let receipt = match self.log.append(proposal).await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(%user, %local_id, %err, "append failed, rolling back optimistic entry");
                self.machine.rollback_local(user, local_id)?;
                return Err(err);
            }
        };
        self.machine.attach_transaction(user, local_id, receipt.id)?;
        debug!(%user, %local_id, tx = %receipt.id, seq = receipt.seq, "proposal submitted");
        Ok(receipt)
    }

    /// Append a conversion pair atomically and link both receipts.
    ///
    /// A failed append rolls back both halves, mirroring [`Self::submit`].
    ///
    /// # Errors
    /// Log transport errors (4xx) or [`LedgerError::PendingNotFound`] if a
    /// half was already removed.
    pub async fn submit_conversion(
        &mut self,
        user: UserId,
        ticket: &ConversionTicket,
    ) -> Result<PairReceipt> {
        let receipt = match self.log.append_pair(ticket.proposal.clone()).await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(%user, %err, "pair append failed, rolling back both halves");
                self.machine.rollback_local(user, ticket.out_local)?;
                self.machine.rollback_local(user, ticket.in_local)?;
                return Err(err);
            }
        };
        self.machine
            .attach_transaction(user, ticket.out_local, receipt.ids[0])?;
        self.machine
            .attach_transaction(user, ticket.in_local, receipt.ids[1])?;
        debug!(%user, seq = receipt.seq, "conversion pair submitted");
        Ok(receipt)
    }

    /// Drive the channel from an event receiver until the transport closes.
    ///
    /// # Errors
    /// Propagates the first [`LedgerError::ResyncFailed`]. A transport that
    /// closes while the session user still has undecided pending entries
    /// yields [`LedgerError::TransportClosed`], telling the driver to
    /// reconnect and resync; a clean close ends the loop normally.
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<LedgerEvent>) -> Result<()> {
        while let Some(event) = events.recv().await {
            self.process(event).await?;
        }
        let user = self.machine.session_user();
        if self.machine.is_loaded(user) && self.machine.pending_count(user)? > 0 {
            warn!(%user, "transport closed with undecided pending entries");
            return Err(LedgerError::TransportClosed);
        }
        info!("event transport closed, reconciliation loop ending");
        Ok(())
    }
}
