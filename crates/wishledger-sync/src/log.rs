//! The Transaction Log interface and an in-process implementation.
//!
//! The log is the single source of truth: it assigns transaction ids and
//! per-user sequence numbers atomically, re-validates every proposal
//! against the confirmed fold (clients only ever propose), and decides the
//! two halves of a conversion together. Balances are always derivable by
//! folding a user's confirmed transactions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::debug;
use wishledger_policy::CurrencyPolicy;
use wishledger_types::{
    Balance, EventStatus, LedgerConfig, LedgerError, LedgerEvent, ProposedPair,
    ProposedTransaction, Result, Transaction, TransactionId, TxStatus, UserId,
};

/// Receipt for a single appended proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Log-assigned transaction id.
    pub id: TransactionId,
    /// Per-user sequence number the decision event will carry.
    pub seq: u64,
}

/// Receipt for an atomically appended conversion pair.
///
/// The two decision events occupy `seq` and `seq + 1`; the log decides both
/// halves in one step, so they confirm or reject together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairReceipt {
    /// Ids for the out (debit) and in (credit) halves, in that order.
    pub ids: [TransactionId; 2],
    /// Sequence number of the first half's decision event.
    pub seq: u64,
}

/// Everything a resync needs, captured atomically.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    /// Fold of the user's confirmed transactions.
    pub confirmed: Balance,
    /// Sequence number of the latest decision event for this user.
    pub last_seq: u64,
    /// Transactions still awaiting a decision server-side.
    pub pending: Vec<TransactionId>,
}

/// The narrow async interface every durable log backend implements.
///
/// Integration contract: `append_pair` must be pair-atomic — both halves
/// decided together, their events adjacent in the per-user sequence.
pub trait TransactionLog {
    /// Append a proposal; the log assigns id and sequence number.
    fn append(
        &self,
        proposed: ProposedTransaction,
    ) -> impl std::future::Future<Output = Result<AppendReceipt>> + Send;

    /// Append a conversion pair as one atomic unit.
    fn append_pair(
        &self,
        pair: ProposedPair,
    ) -> impl std::future::Future<Output = Result<PairReceipt>> + Send;

    /// Capture a resync snapshot for one user.
    fn snapshot(
        &self,
        user: UserId,
    ) -> impl std::future::Future<Output = Result<LedgerSnapshot>> + Send;
}

impl<T: TransactionLog + Send + Sync> TransactionLog for Arc<T> {
    async fn append(&self, proposed: ProposedTransaction) -> Result<AppendReceipt> {
        self.as_ref().append(proposed).await
    }

    async fn append_pair(&self, pair: ProposedPair) -> Result<PairReceipt> {
        self.as_ref().append_pair(pair).await
    }

    async fn snapshot(&self, user: UserId) -> Result<LedgerSnapshot> {
        self.as_ref().snapshot(user).await
    }
}

/// One undecided record in the log.
#[derive(Debug)]
struct PendingRecord {
    tx: Transaction,
    seq: u64,
    /// The other half of a conversion pair, if any.
    pair_with: Option<TransactionId>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Confirmed fold per user.
    confirmed: HashMap<UserId, Balance>,
    /// Undecided records in append order (per-user order follows from this).
    pending: VecDeque<PendingRecord>,
    /// Next sequence number to assign per user (decision events are 1-based).
    next_seq: HashMap<UserId, u64>,
    /// Sequence of the latest decision event per user.
    last_decided_seq: HashMap<UserId, u64>,
    /// Push subscribers for decision events.
    subscribers: Vec<mpsc::UnboundedSender<LedgerEvent>>,
}

impl Inner {
    fn alloc_seq(&mut self, user: UserId) -> u64 {
        let next = self.next_seq.entry(user).or_insert(1);
        let seq = *next;
        *next += 1;
        seq
    }

    fn broadcast(&mut self, event: &LedgerEvent) {
        self.subscribers
            .retain(|sub| sub.send(event.clone()).is_ok());
    }
}

/// In-process Transaction Log: the final arbiter behind the tests.
///
/// Proposals pass optimistic validation client-side, but only the fold kept
/// here decides: a spend that raced another device is rejected even though
/// it looked fine when proposed.
pub struct InMemoryLog {
    policy: CurrencyPolicy,
    inner: Mutex<Inner>,
}

impl InMemoryLog {
    #[must_use]
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            policy: CurrencyPolicy::new(config),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Install a confirmed balance directly (test fixture seeding; models
    /// history that predates the session).
    pub fn seed(&self, user: UserId, balance: Balance) {
        self.lock().confirmed.insert(user, balance);
    }

    /// Current confirmed fold for a user.
    #[must_use]
    pub fn confirmed_balance(&self, user: UserId) -> Balance {
        self.lock().confirmed.get(&user).copied().unwrap_or_default()
    }

    /// Subscribe to decision events (at-least-once transports sit between
    /// this and a real client; tests forward, drop, or replay as needed).
    #[must_use]
    pub fn subscribe_events(&self) -> mpsc::UnboundedReceiver<LedgerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        rx
    }

    /// Number of undecided records for a user.
    #[must_use]
    pub fn pending_count(&self, user: UserId) -> usize {
        self.lock()
            .pending
            .iter()
            .filter(|rec| rec.tx.user_id == user)
            .count()
    }

    /// Decide the oldest undecided record for a user.
    ///
    /// Validates the delta against the confirmed fold; pairs are validated
    /// and decided together. Returns the emitted decision events (empty if
    /// nothing was pending).
    pub fn decide_next(&self, user: UserId) -> Vec<LedgerEvent> {
        let mut inner = self.lock();

        let Some(pos) = inner.pending.iter().position(|rec| rec.tx.user_id == user) else {
            return Vec::new();
        };
        let Some(record) = inner.pending.remove(pos) else {
            return Vec::new();
        };

        // Pull the partner half out too; it is decided in the same step.
        let partner = record.pair_with.and_then(|partner_id| {
            inner
                .pending
                .iter()
                .position(|rec| rec.tx.id == partner_id)
                .and_then(|p| inner.pending.remove(p))
        });

        let confirmed = inner.confirmed.get(&user).copied().unwrap_or_default();
        let deltas: Vec<_> = std::iter::once(&record)
            .chain(partner.as_ref())
            .map(|rec| rec.tx.delta())
            .collect();

        let verdict = self.policy.apply_checked(&confirmed, &deltas);
        let mut events = Vec::new();
        match verdict {
            Ok(folded) => {
                inner.confirmed.insert(user, folded);
                for rec in std::iter::once(&record).chain(partner.as_ref()) {
                    events.push(LedgerEvent {
                        user_id: user,
                        transaction_id: rec.tx.id,
                        seq: rec.seq,
                        tier: rec.tx.tier,
                        delta: rec.tx.amount,
                        status: EventStatus::Confirmed,
                        reason: None,
                    });
                }
            }
            Err(err) => {
                let reason = err.to_string();
                debug!(%user, %reason, "log rejected proposal");
                for rec in std::iter::once(&record).chain(partner.as_ref()) {
                    events.push(LedgerEvent {
                        user_id: user,
                        transaction_id: rec.tx.id,
                        seq: rec.seq,
                        tier: rec.tx.tier,
                        delta: rec.tx.amount,
                        status: EventStatus::Rejected,
                        reason: Some(reason.clone()),
                    });
                }
            }
        }

        events.sort_by_key(|ev| ev.seq);
        for event in &events {
            let last = inner.last_decided_seq.entry(user).or_insert(0);
            *last = (*last).max(event.seq);
            inner.broadcast(event);
        }
        events
    }

    /// Decide every undecided record for a user, oldest first.
    pub fn decide_all(&self, user: UserId) -> Vec<LedgerEvent> {
        let mut events = Vec::new();
        loop {
            let batch = self.decide_next(user);
            if batch.is_empty() {
                break;
            }
            events.extend(batch);
        }
        events
    }
}

impl TransactionLog for InMemoryLog {
    async fn append(&self, proposed: ProposedTransaction) -> Result<AppendReceipt> {
        if proposed.amount == 0 {
            return Err(LedgerError::ZeroDelta);
        }
        let mut inner = self.lock();
        let user = proposed.user_id;
        let seq = inner.alloc_seq(user);
        let tx = Transaction {
            id: TransactionId::new(),
            user_id: user,
            kind: proposed.kind,
            tier: proposed.tier,
            amount: proposed.amount,
            related_entity_id: proposed.related_entity_id,
            created_at: Utc::now(),
            status: TxStatus::Pending,
        };
        let receipt = AppendReceipt { id: tx.id, seq };
        inner.pending.push_back(PendingRecord {
            tx,
            seq,
            pair_with: None,
        });
        Ok(receipt)
    }

    async fn append_pair(&self, pair: ProposedPair) -> Result<PairReceipt> {
        let mut inner = self.lock();
        let user = pair.user_id();
        let out_seq = inner.alloc_seq(user);
        let in_seq = inner.alloc_seq(user);

        let out_id = TransactionId::new();
        let in_id = TransactionId::new();
        let now = Utc::now();

        let make = |proposed: &ProposedTransaction, id: TransactionId| Transaction {
            id,
            user_id: user,
            kind: proposed.kind,
            tier: proposed.tier,
            amount: proposed.amount,
            related_entity_id: proposed.related_entity_id,
            created_at: now,
            status: TxStatus::Pending,
        };

        inner.pending.push_back(PendingRecord {
            tx: make(&pair.out_half, out_id),
            seq: out_seq,
            pair_with: Some(in_id),
        });
        inner.pending.push_back(PendingRecord {
            tx: make(&pair.in_half, in_id),
            seq: in_seq,
            pair_with: Some(out_id),
        });

        Ok(PairReceipt {
            ids: [out_id, in_id],
            seq: out_seq,
        })
    }

    async fn snapshot(&self, user: UserId) -> Result<LedgerSnapshot> {
        let inner = self.lock();
        Ok(LedgerSnapshot {
            confirmed: inner.confirmed.get(&user).copied().unwrap_or_default(),
            last_seq: inner.last_decided_seq.get(&user).copied().unwrap_or(0),
            pending: inner
                .pending
                .iter()
                .filter(|rec| rec.tx.user_id == user)
                .map(|rec| rec.tx.id)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wishledger_types::{Tier, TxKind};

    fn proposal(user: UserId, tier: Tier, amount: i64) -> ProposedTransaction {
        let kind = if amount < 0 { TxKind::Spend } else { TxKind::Earn };
        ProposedTransaction::new(user, kind, tier, amount, None)
    }

    #[tokio::test]
    async fn append_assigns_increasing_seqs() {
        let log = InMemoryLog::new(LedgerConfig::default());
        let user = UserId::new();

        let r1 = log.append(proposal(user, Tier::Green, 5)).await.unwrap();
        let r2 = log.append(proposal(user, Tier::Green, 3)).await.unwrap();
        assert_eq!(r1.seq, 1);
        assert_eq!(r2.seq, 2);
        assert_ne!(r1.id, r2.id);
        assert_eq!(log.pending_count(user), 2);
    }

    #[tokio::test]
    async fn decisions_fold_in_append_order() {
        let log = InMemoryLog::new(LedgerConfig::default());
        let user = UserId::new();

        log.append(proposal(user, Tier::Green, 10)).await.unwrap();
        log.append(proposal(user, Tier::Green, -4)).await.unwrap();

        let events = log.decide_all(user);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(LedgerEvent::is_confirmed));
        assert_eq!(events[0].seq, 1);
        assert_eq!(events[1].seq, 2);
        assert_eq!(log.confirmed_balance(user), Balance::with_counts(6, 0, 0));
    }

    #[tokio::test]
    async fn log_is_final_arbiter() {
        // Two spends of 8 against a confirmed 10: both look fine to a
        // client that saw only one, but the log confirms the first and
        // rejects the second.
        let log = InMemoryLog::new(LedgerConfig::default());
        let user = UserId::new();
        log.seed(user, Balance::with_counts(10, 0, 0));

        log.append(proposal(user, Tier::Green, -8)).await.unwrap();
        log.append(proposal(user, Tier::Green, -8)).await.unwrap();

        let events = log.decide_all(user);
        assert_eq!(events[0].status, EventStatus::Confirmed);
        assert_eq!(events[1].status, EventStatus::Rejected);
        assert!(events[1].reason.as_deref().unwrap().contains("WL_ERR_100"));
        assert_eq!(log.confirmed_balance(user), Balance::with_counts(2, 0, 0));
    }

    #[tokio::test]
    async fn pair_confirms_together() {
        let log = InMemoryLog::new(LedgerConfig::default());
        let user = UserId::new();
        log.seed(user, Balance::with_counts(15, 2, 0));

        let pair = ProposedPair::new(
            ProposedTransaction::new(user, TxKind::ConvertOut, Tier::Green, -10, None),
            ProposedTransaction::new(user, TxKind::ConvertIn, Tier::Blue, 1, None),
        );
        let receipt = log.append_pair(pair).await.unwrap();
        assert_eq!(receipt.seq, 1);

        let events = log.decide_next(user);
        assert_eq!(events.len(), 2, "both halves decided in one step");
        assert!(events.iter().all(LedgerEvent::is_confirmed));
        assert_eq!(events[0].seq + 1, events[1].seq, "adjacent seqs");
        assert_eq!(log.confirmed_balance(user), Balance::with_counts(5, 3, 0));
    }

    #[tokio::test]
    async fn pair_rejects_together() {
        // Credit half would succeed alone; the insufficient debit drags
        // both halves down. No partial conversion state is ever visible.
        let log = InMemoryLog::new(LedgerConfig::default());
        let user = UserId::new();
        log.seed(user, Balance::with_counts(5, 0, 0));

        let pair = ProposedPair::new(
            ProposedTransaction::new(user, TxKind::ConvertOut, Tier::Green, -10, None),
            ProposedTransaction::new(user, TxKind::ConvertIn, Tier::Blue, 1, None),
        );
        log.append_pair(pair).await.unwrap();

        let events = log.decide_next(user);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|ev| ev.status == EventStatus::Rejected));
        assert_eq!(log.confirmed_balance(user), Balance::with_counts(5, 0, 0));
    }

    #[tokio::test]
    async fn snapshot_reflects_state() {
        let log = InMemoryLog::new(LedgerConfig::default());
        let user = UserId::new();
        log.seed(user, Balance::with_counts(10, 0, 0));

        log.append(proposal(user, Tier::Green, -3)).await.unwrap();
        log.decide_all(user);
        let undecided = log.append(proposal(user, Tier::Green, -2)).await.unwrap();

        let snap = log.snapshot(user).await.unwrap();
        assert_eq!(snap.confirmed, Balance::with_counts(7, 0, 0));
        assert_eq!(snap.last_seq, 1);
        assert_eq!(snap.pending, vec![undecided.id]);
    }

    #[tokio::test]
    async fn zero_delta_append_refused() {
        let log = InMemoryLog::new(LedgerConfig::default());
        let err = log
            .append(ProposedTransaction::new(
                UserId::new(),
                TxKind::Adjustment,
                Tier::Green,
                0,
                None,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ZeroDelta));
    }

    #[tokio::test]
    async fn events_reach_subscribers() {
        let log = InMemoryLog::new(LedgerConfig::default());
        let user = UserId::new();
        let mut rx = log.subscribe_events();

        log.append(proposal(user, Tier::Green, 5)).await.unwrap();
        log.decide_all(user);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.user_id, user);
        assert_eq!(event.seq, 1);
        assert!(event.is_confirmed());
    }

    #[tokio::test]
    async fn users_have_independent_sequences() {
        let log = InMemoryLog::new(LedgerConfig::default());
        let alice = UserId::new();
        let bob = UserId::new();

        let ra = log.append(proposal(alice, Tier::Green, 5)).await.unwrap();
        let rb = log.append(proposal(bob, Tier::Green, 5)).await.unwrap();
        assert_eq!(ra.seq, 1);
        assert_eq!(rb.seq, 1);
    }
}
