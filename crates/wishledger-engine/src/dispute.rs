//! Dispute settlement hook.
//!
//! A resolved dispute may compensate a user with a refund or payout. The
//! hook is a thin wrapper over [`LedgerStateMachine::apply_local`]: it goes
//! through the same policy gate as every other mutation and only acts when
//! the affected user owns the current session — other users' clients will
//! receive the corresponding remote event themselves.

use tracing::debug;
use wishledger_types::{
    DisputeId, LedgerError, LocalId, Result, Tier, TierDelta, TxKind, UserId,
};

use crate::machine::LedgerStateMachine;

/// How a dispute was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisputeOutcome {
    /// Return currency to the disputing user.
    Refund,
    /// Award currency to the prevailing user.
    Payout,
    /// No compensation owed.
    Dismissed,
}

/// Apply the compensating transaction for a resolved dispute.
///
/// Returns the local id of the pending compensation when this session's
/// user is the target, `None` when the outcome requires nothing locally
/// (dismissed, or the target is another user).
///
/// # Errors
/// Policy violations (the compensation would exceed a tier maximum) or
/// [`LedgerError::ProjectionNotLoaded`].
pub fn settle_dispute(
    machine: &mut LedgerStateMachine,
    dispute_id: DisputeId,
    outcome: DisputeOutcome,
    tier: Tier,
    amount: u64,
    target_user: UserId,
) -> Result<Option<LocalId>> {
    if outcome == DisputeOutcome::Dismissed {
        debug!(%dispute_id, "dispute dismissed, no compensation");
        return Ok(None);
    }
    if target_user != machine.session_user() {
        debug!(%dispute_id, %target_user, "dispute targets another user, no local effect");
        return Ok(None);
    }

    let amount = i64::try_from(amount)
        .map_err(|_| LedgerError::Internal(format!("dispute amount {amount} out of range")))?;
    let kind = match outcome {
        DisputeOutcome::Refund => TxKind::Refund,
        DisputeOutcome::Payout => TxKind::Adjustment,
        DisputeOutcome::Dismissed => unreachable!("handled above"),
    };

    let local_id = machine.apply_local(
        target_user,
        kind,
        TierDelta::credit(tier, amount),
        Some(dispute_id.into_uuid()),
    )?;
    Ok(Some(local_id))
}
