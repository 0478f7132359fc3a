// crates/mana-core/src/traits.rs

use crate::{Mana, RoundingError};

/// Decay and accrual formulas for mana.
///
/// Implemented by mana-balance (`HalfLifeCalculator`), or by any caller
/// supplying its own formulas.
///
/// Both functions must be pure: identical inputs give identical outputs on
/// every node, with no dependence on call history, global state, or the wall
/// clock. Nodes only converge on the same balance if this holds.
pub trait ManaCalculator: Send + Sync {
    /// Decay `balance` over `elapsed` time units. Non-increasing as
    /// `elapsed` grows.
    fn erode_mana(&self, balance: Mana, elapsed: u64) -> (Mana, RoundingError);

    /// Mana accrued by holding `moved_coins` for `held_time` before moving them.
    fn generate_mana(&self, moved_coins: u64, held_time: u64) -> (Mana, RoundingError);
}
