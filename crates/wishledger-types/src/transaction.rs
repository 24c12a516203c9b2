//! Transaction records — the immutable entries of the append-only log.
//!
//! A [`Transaction`] is owned by the Transaction Log once appended. Clients
//! hold read projections plus locally originated records still in
//! [`TxStatus::Pending`]. Once confirmed or rejected a transaction is
//! terminal; only new compensating transactions may follow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Tier, TierDelta, TransactionId, UserId};

/// What kind of balance-affecting action a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    /// Currency granted (wish fulfilled, reward, etc.).
    Earn,
    /// Currency spent (wish created, fulfilled for another user, etc.).
    Spend,
    /// Debit half of a conversion (lower tier).
    ConvertOut,
    /// Credit half of a conversion (higher tier).
    ConvertIn,
    /// Compensating credit from a dispute resolution.
    Refund,
    /// Operator correction.
    Adjustment,
}

/// Lifecycle status of a transaction in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Appended but not yet decided.
    Pending,
    /// Decided: applied to the authoritative balance.
    Confirmed,
    /// Decided: refused, has no balance effect.
    Rejected,
}

impl TxStatus {
    /// Whether the status is final (confirmed or rejected).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TxStatus::Confirmed | TxStatus::Rejected)
    }
}

/// An immutable ledger record. One user, one tier, one signed delta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    /// Server-assigned unique id.
    pub id: TransactionId,
    pub user_id: UserId,
    pub kind: TxKind,
    pub tier: Tier,
    /// Signed count delta for `tier`.
    pub amount: i64,
    /// Optional link to the product entity (wish, dispute) that caused this.
    pub related_entity_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub status: TxStatus,
}

impl Transaction {
    /// The balance change this transaction carries.
    #[must_use]
    pub fn delta(&self) -> TierDelta {
        TierDelta::new(self.tier, self.amount)
    }
}

/// A transaction as proposed by a client, before the log has assigned an id
/// and sequence number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposedTransaction {
    pub user_id: UserId,
    pub kind: TxKind,
    pub tier: Tier,
    pub amount: i64,
    pub related_entity_id: Option<Uuid>,
}

impl ProposedTransaction {
    #[must_use]
    pub fn new(
        user_id: UserId,
        kind: TxKind,
        tier: Tier,
        amount: i64,
        related_entity_id: Option<Uuid>,
    ) -> Self {
        Self {
            user_id,
            kind,
            tier,
            amount,
            related_entity_id,
        }
    }

    /// The balance change this proposal carries.
    #[must_use]
    pub fn delta(&self) -> TierDelta {
        TierDelta::new(self.tier, self.amount)
    }
}

/// The two linked halves of a conversion, submitted as one atomic unit.
///
/// The Transaction Log guarantees both halves confirm or both reject
/// together — never one without the other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposedPair {
    /// The `ConvertOut` debit on the lower tier.
    pub out_half: ProposedTransaction,
    /// The `ConvertIn` credit on the adjacent higher tier.
    pub in_half: ProposedTransaction,
}

impl ProposedPair {
    #[must_use]
    pub fn new(out_half: ProposedTransaction, in_half: ProposedTransaction) -> Self {
        Self { out_half, in_half }
    }

    /// The user both halves belong to.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.out_half.user_id
    }
}
