// crates/mana-balance/src/history.rs
//
// Tail-accessed log of balance snapshots, one per applied transfer.
//
// Entries are non-decreasing in transfer spent time between operations.
// The balance only ever touches the tail (rollback is stack-like); the head
// is touched only when retention prunes old entries.

use std::collections::vec_deque::{self, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use mana_core::{Mana, RoundingError, Timestamp, Transfer};

/// Snapshot of a balance after applying one transfer.
///
/// Created once per application (replays create fresh entries that share the
/// same `Arc<Transfer>`), immutable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceHistoryEntry {
    transfer: Arc<Transfer>,
    balance: Mana,
    accumulated_rounding_error: RoundingError,
}

impl BalanceHistoryEntry {
    pub fn new(
        transfer: Arc<Transfer>,
        balance: Mana,
        accumulated_rounding_error: RoundingError,
    ) -> Self {
        Self {
            transfer,
            balance,
            accumulated_rounding_error,
        }
    }

    pub fn transfer(&self) -> &Arc<Transfer> {
        &self.transfer
    }

    /// Balance after eroding the prior balance and adding this transfer's gain.
    pub fn balance(&self) -> Mana {
        self.balance
    }

    /// Rounding residue of the mana generated by this application.
    pub fn accumulated_rounding_error(&self) -> RoundingError {
        self.accumulated_rounding_error
    }

    pub fn spent_time(&self) -> Timestamp {
        self.transfer.spent_time()
    }
}

/// Failure of a history operation other than "empty".
///
/// Any of these means the ordering invariant no longer holds and the history
/// must not be trusted further.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("history corruption: pushed entry spent at {pushed} behind tail spent at {tail}")]
    Corruption { tail: Timestamp, pushed: Timestamp },
}

/// Ring buffer of `BalanceHistoryEntry`, oldest at the head.
#[derive(Debug, Clone, Default)]
pub struct TransferHistory {
    entries: VecDeque<BalanceHistoryEntry>,
}

impl TransferHistory {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Most recent entry, or `None` if the history is empty.
    pub fn peek_tail(&self) -> Option<&BalanceHistoryEntry> {
        self.entries.back()
    }

    /// Remove and return the most recent entry, or `None` if empty.
    pub fn pop_tail(&mut self) -> Option<BalanceHistoryEntry> {
        self.entries.pop_back()
    }

    /// Append a new most-recent entry.
    ///
    /// # Errors
    /// Returns `HistoryError::Corruption` if the entry is older than the
    /// current tail. The history is left unchanged in that case.
    pub fn push_tail(&mut self, entry: BalanceHistoryEntry) -> Result<(), HistoryError> {
        if let Some(tail) = self.entries.back() {
            if entry.spent_time() < tail.spent_time() {
                return Err(HistoryError::Corruption {
                    tail: tail.spent_time(),
                    pushed: entry.spent_time(),
                });
            }
        }
        self.entries.push_back(entry);
        Ok(())
    }

    /// Oldest entry, or `None` if empty.
    pub fn peek_head(&self) -> Option<&BalanceHistoryEntry> {
        self.entries.front()
    }

    /// Remove and return the oldest entry. Used by retention pruning only.
    pub fn pop_head(&mut self) -> Option<BalanceHistoryEntry> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> vec_deque::Iter<'_, BalanceHistoryEntry> {
        self.entries.iter()
    }
}
