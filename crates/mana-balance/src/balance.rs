// crates/mana-balance/src/balance.rs
//
// Mana balance of one identity, kept in canonical (spent-time) order.
//
// Calculator arithmetic is not associative, so the same transfers applied in
// different orders round differently. A late transfer therefore rolls back
// every entry spent at or after it, is applied, and the rolled-back
// transfers are replayed on top in their original order. Cost is O(k) in the
// number of rolled-back entries, not O(n) in the history length.

use std::sync::Arc;

use serde::Serialize;

use mana_core::{ManaCalculator, ManaError, Mana, Timestamp, Transfer};

use crate::history::{BalanceHistoryEntry, HistoryError, TransferHistory};
use crate::retention::{Checkpoint, RetentionPolicy};

/// What a single `add_transfer` did to the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TransferReceipt {
    /// Entries rolled back and replayed after the new transfer.
    pub rolled_back: usize,
    /// Entries dropped from the head by retention.
    pub pruned: usize,
}

/// Serializable view of a balance.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceSnapshot {
    pub value: Mana,
    pub last_erosion: Timestamp,
    pub checkpoint: Option<Checkpoint>,
    pub history: Vec<BalanceHistoryEntry>,
}

/// Mana balance derived from an ordered transfer history.
///
/// Not internally synchronized. Callers sharing a balance across threads must
/// serialize every call, reads included, behind one lock per identity.
pub struct Balance {
    calculator: Arc<dyn ManaCalculator>,
    history: TransferHistory,
    retention: RetentionPolicy,
    checkpoint: Option<Checkpoint>,
}

impl Balance {
    /// Create an empty balance that keeps its full history.
    pub fn new(calculator: Arc<dyn ManaCalculator>) -> Self {
        Self::with_retention(calculator, RetentionPolicy::Unbounded)
    }

    pub fn with_retention(calculator: Arc<dyn ManaCalculator>, retention: RetentionPolicy) -> Self {
        Self {
            calculator,
            history: TransferHistory::new(),
            retention,
            checkpoint: None,
        }
    }

    /// Current mana balance. 0 for a fresh balance.
    pub fn value(&self) -> Mana {
        self.current().0
    }

    /// Time up to which erosion has been applied to `value()`. 0 for a fresh
    /// balance.
    pub fn last_erosion(&self) -> Timestamp {
        self.current().1
    }

    /// Book a transfer, keeping the history in canonical order.
    ///
    /// An existing entry with the same spent time is rolled back and
    /// replayed after the new transfer, so ties resolve in insertion order.
    ///
    /// # Errors
    /// Returns `ManaError::BeyondRetention` if the transfer is spent at or
    /// before the retention checkpoint. The balance is unchanged.
    ///
    /// # Panics
    /// Panics if the history is found corrupted. State past that point can't
    /// be trusted and must not be used.
    pub fn add_transfer(&mut self, transfer: Arc<Transfer>) -> Result<TransferReceipt, ManaError> {
        if let Some(checkpoint) = &self.checkpoint {
            if transfer.spent_time() <= checkpoint.spent_time {
                return Err(ManaError::BeyondRetention {
                    spent_time: transfer.spent_time(),
                    checkpoint_time: checkpoint.spent_time,
                });
            }
        }

        let rolled_back = self.rollback_transfers(transfer.spent_time());
        if !rolled_back.is_empty() {
            tracing::debug!(
                "Rolling back {} transfers at or after spent_time {}",
                rolled_back.len(),
                transfer.spent_time()
            );
        }

        self.apply_transfer(transfer);

        // rolled_back is newest-first
        for replayed in rolled_back.iter().rev() {
            self.apply_transfer(Arc::clone(replayed));
        }

        let pruned = self.prune();

        Ok(TransferReceipt {
            rolled_back: rolled_back.len(),
            pruned,
        })
    }

    /// Entries from oldest to newest.
    pub fn history(&self) -> impl Iterator<Item = &BalanceHistoryEntry> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn checkpoint(&self) -> Option<Checkpoint> {
        self.checkpoint
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    pub fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            value: self.value(),
            last_erosion: self.last_erosion(),
            checkpoint: self.checkpoint,
            history: self.history.iter().cloned().collect(),
        }
    }

    /// Balance and erosion time of the tail, falling back to the checkpoint
    /// and then to zero.
    fn current(&self) -> (Mana, Timestamp) {
        match (self.history.peek_tail(), &self.checkpoint) {
            (Some(tail), _) => (tail.balance(), tail.spent_time()),
            (None, Some(checkpoint)) => (checkpoint.balance, checkpoint.spent_time),
            (None, None) => (0, 0),
        }
    }

    /// Pop every tail entry spent at or after `reference_time`. Returned
    /// newest-first.
    fn rollback_transfers(&mut self, reference_time: Timestamp) -> Vec<Arc<Transfer>> {
        let mut rolled_back = Vec::new();
        while let Some(tail) = self.history.peek_tail() {
            if tail.spent_time() < reference_time {
                break;
            }
            match self.history.pop_tail() {
                Some(entry) => rolled_back.push(Arc::clone(entry.transfer())),
                None => break,
            }
        }
        rolled_back
    }

    fn apply_transfer(&mut self, transfer: Arc<Transfer>) {
        let (mut current_balance, last_erosion) = self.current();

        if current_balance != 0 {
            let elapsed = match transfer.spent_time().checked_sub(last_erosion) {
                Some(elapsed) => elapsed,
                None => corrupted(HistoryError::Corruption {
                    tail: last_erosion,
                    pushed: transfer.spent_time(),
                }),
            };
            (current_balance, _) = self.calculator.erode_mana(current_balance, elapsed);
        }

        let (gained, rounding_error) = self
            .calculator
            .generate_mana(transfer.moved_coins(), transfer.held_time());

        let balance = current_balance.saturating_add(gained);
        tracing::trace!(
            "Applied transfer spent at {}: gained {}, balance {}",
            transfer.spent_time(),
            gained,
            balance
        );

        let entry = BalanceHistoryEntry::new(transfer, balance, rounding_error);
        if let Err(e) = self.history.push_tail(entry) {
            corrupted(e);
        }
    }

    /// Fold head entries past the retention horizon into the checkpoint.
    /// The tail entry is always kept.
    fn prune(&mut self) -> usize {
        let cutoff = match self.retention.cutoff(self.last_erosion()) {
            Some(cutoff) => cutoff,
            None => return 0,
        };

        let mut pruned = 0;
        while self.history.len() > 1 {
            match self.history.peek_head() {
                Some(head) if head.spent_time() < cutoff => {}
                _ => break,
            }
            if let Some(head) = self.history.pop_head() {
                self.checkpoint = Some(Checkpoint {
                    balance: head.balance(),
                    spent_time: head.spent_time(),
                });
                pruned += 1;
            }
        }

        if pruned > 0 {
            tracing::debug!(
                "Pruned {} history entries older than {}, {} remain",
                pruned,
                cutoff,
                self.history.len()
            );
        }
        pruned
    }
}

/// Abort on a corrupted history.
fn corrupted(error: HistoryError) -> ! {
    tracing::error!("Fatal: {}", error);
    panic!("{}", error);
}
