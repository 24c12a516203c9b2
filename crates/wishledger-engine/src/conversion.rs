//! Tier-to-tier conversion as an atomic pending pair.
//!
//! A conversion is two linked transactions: a `ConvertOut` debit on the
//! lower tier and a `ConvertIn` credit on the adjacent higher tier. Both
//! halves are validated together against the optimistic balance before
//! either pending entry exists, so a session never observes a partial
//! conversion. The Transaction Log upholds the same guarantee durably via
//! `append_pair`.

use tracing::debug;
use uuid::Uuid;
use wishledger_types::{
    LocalId, ProposedPair, ProposedTransaction, Result, Tier, TxKind, UserId,
};

use crate::machine::LedgerStateMachine;
use crate::projection::PendingDelta;

/// The result of a local conversion apply: the two pending entries and the
/// pair proposal for `append_pair`.
#[derive(Debug, Clone)]
pub struct ConversionTicket {
    /// Local id of the lower-tier debit entry.
    pub out_local: LocalId,
    /// Local id of the higher-tier credit entry.
    pub in_local: LocalId,
    /// Both halves, ready for atomic submission to the log.
    pub proposal: ProposedPair,
}

impl LedgerStateMachine {
    /// Perform an optimistic conversion of `count` units of `from` into
    /// `count / R` units of `to`.
    ///
    /// Constraints (enforced by policy): `to` must be exactly one tier
    /// above `from`, and `count` must be a positive multiple of R. Both
    /// deltas must individually be legal against the optimistic balance.
    ///
    /// # Errors
    /// Policy violations (1xx) or [`wishledger_types::LedgerError::ProjectionNotLoaded`].
    pub fn convert(
        &mut self,
        user: UserId,
        from: Tier,
        to: Tier,
        count: u64,
        related_entity_id: Option<Uuid>,
    ) -> Result<ConversionTicket> {
        let quote = self.policy().check_conversion(from, to, count)?;
        let optimistic = self.proj(user)?.optimistic();
        // Both halves validated before either entry is pushed.
        self.policy()
            .apply_checked(&optimistic, &[quote.debit, quote.credit])?;

        let out_entry = PendingDelta::new(TxKind::ConvertOut, quote.debit, related_entity_id);
        let in_entry = PendingDelta::new(TxKind::ConvertIn, quote.credit, related_entity_id);
        let out_local = out_entry.local_id;
        let in_local = in_entry.local_id;

        let proposal = ProposedPair::new(
            ProposedTransaction::new(
                user,
                TxKind::ConvertOut,
                quote.debit.tier,
                quote.debit.amount,
                related_entity_id,
            ),
            ProposedTransaction::new(
                user,
                TxKind::ConvertIn,
                quote.credit.tier,
                quote.credit.amount,
                related_entity_id,
            ),
        );

        let proj = self.proj_mut(user)?;
        proj.push_pending(out_entry);
        proj.push_pending(in_entry);
        debug!(%user, %from, %to, count, "optimistic conversion");
        self.notify(user);

        Ok(ConversionTicket {
            out_local,
            in_local,
            proposal,
        })
    }
}
