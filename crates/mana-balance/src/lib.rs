// crates/mana-balance/src/lib.rs
//
// mana-balance: Ordered transfer history and the rollback/replay balance.
//
// Every node applies transfers to a balance in ascending spent-time order,
// whatever order it learned of them in. Out-of-order arrivals roll back the
// newer history entries, apply, then replay, so rounding in the calculator
// is reproduced identically network-wide.

pub mod balance;
pub mod calculator;
pub mod history;
pub mod retention;

pub use balance::{Balance, BalanceSnapshot, TransferReceipt};
pub use calculator::HalfLifeCalculator;
pub use history::{BalanceHistoryEntry, HistoryError, TransferHistory};
pub use retention::{Checkpoint, RetentionPolicy};
