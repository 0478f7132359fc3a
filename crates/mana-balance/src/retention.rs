// crates/mana-balance/src/retention.rs
//
// Bounded retention for transfer history.
//
// Entries far enough behind the newest transfer can no longer be reached by
// rollback of a plausible late arrival. They are dropped from the head and
// folded into a checkpoint that replaces the empty-history defaults.

use serde::{Deserialize, Serialize};

use mana_core::{Mana, Timestamp};

/// How much history a balance keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetentionPolicy {
    /// Keep every entry.
    #[default]
    Unbounded,
    /// Drop entries spent more than this many time units before the newest one.
    Horizon(u64),
}

impl RetentionPolicy {
    /// Entries with a spent time strictly below the returned cutoff may be
    /// pruned. `None` means nothing is eligible.
    pub fn cutoff(&self, latest: Timestamp) -> Option<Timestamp> {
        match self {
            RetentionPolicy::Unbounded => None,
            RetentionPolicy::Horizon(horizon) => latest.checked_sub(*horizon),
        }
    }
}

/// State folded out of the pruned head of a history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Balance after the last pruned entry.
    pub balance: Mana,
    /// Spent time of the last pruned entry. Transfers at or before it are
    /// rejected.
    pub spent_time: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_never_cuts() {
        assert_eq!(RetentionPolicy::Unbounded.cutoff(u64::MAX), None);
    }

    #[test]
    fn test_horizon_cutoff() {
        let policy = RetentionPolicy::Horizon(100);
        assert_eq!(policy.cutoff(250), Some(150));
        assert_eq!(policy.cutoff(100), Some(0));
    }

    #[test]
    fn test_horizon_before_enough_time_has_passed() {
        assert_eq!(RetentionPolicy::Horizon(100).cutoff(99), None);
    }
}
