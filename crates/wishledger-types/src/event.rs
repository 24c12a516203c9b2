//! Remote ledger events delivered by the push transport.
//!
//! Each event reports the log's decision on one transaction, tagged with a
//! per-user monotonically increasing sequence number. Delivery is
//! at-least-once: events may arrive duplicated or with gaps, never ahead of
//! the log's own ordering.

use serde::{Deserialize, Serialize};

use crate::{Tier, TierDelta, TransactionId, UserId};

/// The log's decision carried by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Confirmed,
    Rejected,
}

/// A decision event for one transaction of one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEvent {
    pub user_id: UserId,
    pub transaction_id: TransactionId,
    /// Per-user sequence number assigned by the Transaction Log.
    pub seq: u64,
    pub tier: Tier,
    /// Signed count delta (meaningful only for confirmed events).
    pub delta: i64,
    pub status: EventStatus,
    /// Human-readable rejection reason, if rejected.
    pub reason: Option<String>,
}

impl LedgerEvent {
    /// The balance change this event confirms.
    #[must_use]
    pub fn tier_delta(&self) -> TierDelta {
        TierDelta::new(self.tier, self.delta)
    }

    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status == EventStatus::Confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LedgerEvent {
        LedgerEvent {
            user_id: UserId::new(),
            transaction_id: TransactionId::new(),
            seq: 7,
            tier: Tier::Green,
            delta: -10,
            status: EventStatus::Confirmed,
            reason: None,
        }
    }

    #[test]
    fn tier_delta_matches_fields() {
        let ev = sample();
        assert_eq!(ev.tier_delta(), TierDelta::new(Tier::Green, -10));
        assert!(ev.is_confirmed());
    }

    #[test]
    fn rejected_event_carries_reason() {
        let mut ev = sample();
        ev.status = EventStatus::Rejected;
        ev.reason = Some("insufficient balance".to_string());
        assert!(!ev.is_confirmed());
        assert!(ev.reason.is_some());
    }

    #[test]
    fn serde_roundtrip() {
        let ev = sample();
        let json = serde_json::to_string(&ev).unwrap();
        let back: LedgerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(ev, back);
    }
}
