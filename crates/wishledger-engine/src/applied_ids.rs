//! Bounded window of recently applied remote transaction ids.
//!
//! Remote events are delivered at-least-once, so every confirmation and
//! rejection is checked against this window before it touches the confirmed
//! balance. The window is bounded with FIFO eviction so memory stays
//! predictable in long-lived sessions; per-user transaction volume is low
//! enough that the window always covers the realistic replay horizon.

use std::collections::{HashSet, VecDeque};

use wishledger_types::TransactionId;

/// Remembers which remote transaction ids have already been applied.
///
/// Internally a bounded set with FIFO eviction: when the set reaches
/// `max_size`, the oldest entry is dropped to make room.
#[derive(Debug)]
pub struct AppliedIdWindow {
    /// Transaction ids already applied to the projection.
    applied: HashSet<TransactionId>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<TransactionId>,
    /// Maximum number of ids remembered.
    max_size: usize,
}

impl AppliedIdWindow {
    /// Create a new window with the given capacity.
    ///
    /// # Panics
    /// Panics if `max_size` is zero.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "AppliedIdWindow max_size must be > 0");
        Self {
            applied: HashSet::with_capacity(max_size),
            order: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Record a transaction id as applied.
    ///
    /// Returns `true` if the id was newly inserted, `false` if it was
    /// already present (i.e. this event is a replay and must be a no-op).
    pub fn insert(&mut self, tx_id: TransactionId) -> bool {
        if self.applied.contains(&tx_id) {
            return false;
        }

        if self.applied.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.applied.remove(&oldest);
            }
        }

        self.applied.insert(tx_id);
        self.order.push_back(tx_id);
        true
    }

    /// Whether an id is currently remembered as applied.
    #[must_use]
    pub fn contains(&self, tx_id: &TransactionId) -> bool {
        self.applied.contains(tx_id)
    }

    /// Number of ids currently remembered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.applied.len()
    }

    /// Whether the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    /// Forget everything (used when a resync rebuilds the projection).
    pub fn clear(&mut self) {
        self.applied.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_is_new() {
        let mut window = AppliedIdWindow::new(100);
        let tx = TransactionId::new();
        assert!(window.insert(tx));
        assert!(window.contains(&tx));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn second_insert_is_replay() {
        let mut window = AppliedIdWindow::new(100);
        let tx = TransactionId::new();
        assert!(window.insert(tx));
        assert!(!window.insert(tx));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn evicts_oldest() {
        let mut window = AppliedIdWindow::new(3);
        let t1 = TransactionId::new();
        let t2 = TransactionId::new();
        let t3 = TransactionId::new();
        let t4 = TransactionId::new();

        assert!(window.insert(t1));
        assert!(window.insert(t2));
        assert!(window.insert(t3));
        assert_eq!(window.len(), 3);

        // Inserting t4 evicts t1 (the oldest).
        assert!(window.insert(t4));
        assert_eq!(window.len(), 3);
        assert!(!window.contains(&t1), "t1 should have been evicted");
        assert!(window.contains(&t2));
        assert!(window.contains(&t3));
        assert!(window.contains(&t4));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut window = AppliedIdWindow::new(10);
        let tx = TransactionId::new();
        window.insert(tx);
        window.clear();
        assert!(window.is_empty());
        // Post-clear, the same id is treated as new again.
        assert!(window.insert(tx));
    }

    #[test]
    #[should_panic(expected = "max_size must be > 0")]
    fn zero_max_size_panics() {
        let _ = AppliedIdWindow::new(0);
    }
}
