//! The Ledger State Machine — one instance per active session.
//!
//! Holds a [`LedgerProjection`] per user, applies local mutations
//! optimistically, merges authoritative remote decisions, and publishes
//! projection changes to subscribers. It never performs I/O: the sync layer
//! appends proposals to the Transaction Log and feeds decisions back in.
//!
//! Conflict policy: the log is the final arbiter. Two optimistic spends may
//! both pass local validation on different devices; the loser arrives here
//! via [`LedgerStateMachine::reject_remote`] and is rolled back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;
use wishledger_policy::CurrencyPolicy;
use wishledger_types::{
    Balance, LedgerConfig, LedgerError, LocalId, ProposedTransaction, Result, TierDelta,
    TransactionId, TxKind, UserId,
};

use crate::projection::{LedgerProjection, PendingDelta};

/// Per-session ledger state: projections, policy, and change notification.
pub struct LedgerStateMachine {
    /// The user this session belongs to (dispute settlement needs to know).
    session_user: UserId,
    policy: CurrencyPolicy,
    config: LedgerConfig,
    projections: HashMap<UserId, LedgerProjection>,
    watchers: HashMap<UserId, watch::Sender<Balance>>,
}

impl LedgerStateMachine {
    #[must_use]
    pub fn new(session_user: UserId, config: LedgerConfig) -> Self {
        Self {
            session_user,
            policy: CurrencyPolicy::new(config.clone()),
            config,
            projections: HashMap::new(),
            watchers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn session_user(&self) -> UserId {
        self.session_user
    }

    #[must_use]
    pub fn policy(&self) -> &CurrencyPolicy {
        &self.policy
    }

    /// Enter `Loaded` for a user: install the confirmed balance computed by
    /// folding the Transaction Log, plus the log's sequence cursor.
    ///
    /// Replaces any existing projection (reconnect after a gap rebuilds
    /// from scratch).
    pub fn load(&mut self, user: UserId, confirmed: Balance, last_applied_seq: u64) {
        debug!(%user, seq = last_applied_seq, "projection loaded");
        self.projections.insert(
            user,
            LedgerProjection::new(confirmed, last_applied_seq, self.config.applied_id_window),
        );
        self.notify(user);
    }

    #[must_use]
    pub fn is_loaded(&self, user: UserId) -> bool {
        self.projections.contains_key(&user)
    }

    /// Apply a local mutation optimistically.
    ///
    /// Validates against the confirmed balance folded with all existing
    /// pending deltas, so two local spends cannot jointly overdraw what one
    /// alone could not. Returns synchronously; the caller submits the
    /// proposal to the log afterwards and links the receipt with
    /// [`Self::attach_transaction`].
    ///
    /// # Errors
    /// Policy violations (1xx) or [`LedgerError::ProjectionNotLoaded`].
    pub fn apply_local(
        &mut self,
        user: UserId,
        kind: TxKind,
        delta: TierDelta,
        related_entity_id: Option<Uuid>,
    ) -> Result<LocalId> {
        let proj = self.proj_mut(user)?;
        let optimistic = proj.optimistic();
        self.policy.validate(&optimistic, delta)?;

        let entry = PendingDelta::new(kind, delta, related_entity_id);
        let local_id = entry.local_id;
        let proj = self.proj_mut(user)?;
        proj.push_pending(entry);
        debug!(%user, %local_id, tier = %delta.tier, amount = delta.amount, "optimistic apply");
        self.notify(user);
        Ok(local_id)
    }

    /// Build the log proposal for a pending entry.
    pub fn proposal(&self, user: UserId, local_id: LocalId) -> Result<ProposedTransaction> {
        let entry = self
            .proj(user)?
            .pending_by_local(local_id)
            .ok_or(LedgerError::PendingNotFound(local_id))?;
        Ok(ProposedTransaction::new(
            user,
            entry.kind,
            entry.delta.tier,
            entry.delta.amount,
            entry.related_entity_id,
        ))
    }

    /// Link the log-assigned transaction id to a pending entry once the
    /// append receipt arrives.
    pub fn attach_transaction(
        &mut self,
        user: UserId,
        local_id: LocalId,
        tx_id: TransactionId,
    ) -> Result<()> {
        if self.proj_mut(user)?.attach_tx(local_id, tx_id) {
            Ok(())
        } else {
            Err(LedgerError::PendingNotFound(local_id))
        }
    }

    /// Roll back an optimistic entry whose append never reached the log.
    ///
    /// Without this the entry would sit unlinked forever: resync keeps
    /// unlinked entries (their receipt may still be in flight), so a failed
    /// append must be undone at the point of failure. The caller retries
    /// with a fresh `apply_local` once the log is reachable again.
    ///
    /// # Errors
    /// [`LedgerError::PendingNotFound`] or [`LedgerError::ProjectionNotLoaded`].
    pub fn rollback_local(&mut self, user: UserId, local_id: LocalId) -> Result<()> {
        let entry = self
            .proj_mut(user)?
            .remove_by_local(local_id)
            .ok_or(LedgerError::PendingNotFound(local_id))?;
        warn!(%user, %local_id, tier = %entry.delta.tier, amount = entry.delta.amount,
            "optimistic entry rolled back, append never reached the log");
        self.notify(user);
        Ok(())
    }

    /// Merge an authoritative confirmation.
    ///
    /// Idempotent: returns `Ok(false)` (no state change) when the
    /// transaction id has already been applied. If the id matches a pending
    /// entry, that entry graduates into the confirmed balance; otherwise the
    /// delta originated on another device or tab and folds in directly.
    pub fn confirm_remote(
        &mut self,
        user: UserId,
        tx_id: TransactionId,
        delta: TierDelta,
    ) -> Result<bool> {
        let proj = self.proj_mut(user)?;
        if !proj.mark_applied(tx_id) {
            debug!(%user, %tx_id, "duplicate confirmation ignored");
            return Ok(false);
        }

        let matched = proj.remove_by_tx(tx_id).is_some();
        if !proj.fold_confirmed(delta) {
            warn!(%user, %tx_id, "confirmed fold clamped; projection diverged, resync will repair");
        }
        debug!(%user, %tx_id, matched, "remote confirmation applied");
        self.notify(user);
        Ok(true)
    }

    /// Merge an authoritative rejection: the optimistic effect is rolled
    /// back without ever touching the confirmed balance.
    ///
    /// Returns the local id of the rolled-back entry so the caller can
    /// surface the rejection reason, or `None` when the rejection was a
    /// replay or concerned another device's transaction.
    pub fn reject_remote(
        &mut self,
        user: UserId,
        tx_id: TransactionId,
        reason: &str,
    ) -> Result<Option<LocalId>> {
        let proj = self.proj_mut(user)?;
        if !proj.mark_applied(tx_id) {
            return Ok(None);
        }

        let rolled_back = proj.remove_by_tx(tx_id).map(|entry| entry.local_id);
        if let Some(local_id) = rolled_back {
            warn!(%user, %tx_id, %local_id, reason, "optimistic entry rejected by log");
            self.notify(user);
        }
        Ok(rolled_back)
    }

    /// Projected balance: confirmed plus all pending deltas, clamped at
    /// zero per tier.
    pub fn current_balance(&self, user: UserId) -> Result<Balance> {
        Ok(self.proj(user)?.optimistic())
    }

    /// Authoritative balance only (no pending deltas).
    pub fn confirmed_balance(&self, user: UserId) -> Result<Balance> {
        Ok(self.proj(user)?.confirmed())
    }

    /// Number of pending optimistic entries (for "syncing" indicators).
    pub fn pending_count(&self, user: UserId) -> Result<usize> {
        Ok(self.proj(user)?.pending_count())
    }

    /// Number of pending entries that have aged into the stale state.
    pub fn stale_count(&self, user: UserId) -> Result<usize> {
        Ok(self.proj(user)?.stale_count())
    }

    pub fn last_applied_seq(&self, user: UserId) -> Result<u64> {
        Ok(self.proj(user)?.last_applied_seq())
    }

    /// Advance a user's remote sequence cursor (called by the
    /// Reconciliation Channel after each in-order apply).
    pub fn advance_seq(&mut self, user: UserId, seq: u64) -> Result<()> {
        self.proj_mut(user)?.advance_seq(seq);
        Ok(())
    }

    /// Mark in-flight pending entries older than the configured threshold
    /// as stale, across all loaded projections. Returns how many changed.
    pub fn sweep_stale(&mut self, now: DateTime<Utc>) -> usize {
        let threshold = self.config.stale_after();
        let mut total = 0;
        let changed: Vec<UserId> = self
            .projections
            .iter_mut()
            .filter_map(|(user, proj)| {
                let swept = proj.sweep_stale(now, threshold);
                total += swept;
                (swept > 0).then_some(*user)
            })
            .collect();
        for user in changed {
            self.notify(user);
        }
        total
    }

    /// Resync path: atomically replace the confirmed balance and sequence
    /// cursor from a fresh log snapshot, pruning pending entries whose
    /// originating transaction the server no longer holds as pending.
    pub fn replace_confirmed(
        &mut self,
        user: UserId,
        confirmed: Balance,
        last_applied_seq: u64,
        server_pending: &[TransactionId],
    ) -> Result<usize> {
        let pruned = self
            .proj_mut(user)?
            .replace(confirmed, last_applied_seq, server_pending);
        if pruned > 0 {
            warn!(%user, pruned, "resync pruned orphaned pending entries");
        }
        self.notify(user);
        Ok(pruned)
    }

    /// Subscribe to projection changes for a user. The receiver yields the
    /// optimistic balance after every mutation.
    pub fn subscribe(&mut self, user: UserId) -> watch::Receiver<Balance> {
        let current = self
            .projections
            .get(&user)
            .map(LedgerProjection::optimistic)
            .unwrap_or_default();
        self.watchers
            .entry(user)
            .or_insert_with(|| watch::channel(current).0)
            .subscribe()
    }

    pub(crate) fn notify(&mut self, user: UserId) {
        if let Some(sender) = self.watchers.get(&user) {
            let balance = self
                .projections
                .get(&user)
                .map(LedgerProjection::optimistic)
                .unwrap_or_default();
            sender.send_replace(balance);
        }
    }

    pub(crate) fn proj(&self, user: UserId) -> Result<&LedgerProjection> {
        self.projections
            .get(&user)
            .ok_or(LedgerError::ProjectionNotLoaded(user))
    }

    pub(crate) fn proj_mut(&mut self, user: UserId) -> Result<&mut LedgerProjection> {
        self.projections
            .get_mut(&user)
            .ok_or(LedgerError::ProjectionNotLoaded(user))
    }
}
