// crates/mana-core/src/transfer.rs

use serde::{Deserialize, Serialize};

use crate::error::ManaError;
use crate::Timestamp;

/// An observed movement of coins, the input event for mana accounting.
///
/// Immutable once constructed. History entries share it behind an `Arc`
/// rather than copying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TransferFields")]
pub struct Transfer {
    /// Amount of value transacted.
    moved_coins: u64,
    /// When the mover had received these coins.
    received_time: Timestamp,
    /// When this transfer moves the coins onward.
    spent_time: Timestamp,
}

/// Unvalidated wire form, checked on deserialization.
#[derive(Deserialize)]
struct TransferFields {
    moved_coins: u64,
    received_time: Timestamp,
    spent_time: Timestamp,
}

impl TryFrom<TransferFields> for Transfer {
    type Error = ManaError;

    fn try_from(fields: TransferFields) -> Result<Self, Self::Error> {
        Transfer::new(fields.moved_coins, fields.received_time, fields.spent_time)
    }
}

impl Transfer {
    /// Create a transfer.
    ///
    /// # Errors
    /// Returns `ManaError::InvalidTransfer` if `spent_time < received_time`.
    pub fn new(
        moved_coins: u64,
        received_time: Timestamp,
        spent_time: Timestamp,
    ) -> Result<Self, ManaError> {
        if spent_time < received_time {
            return Err(ManaError::InvalidTransfer(format!(
                "spent_time {} precedes received_time {}",
                spent_time, received_time
            )));
        }
        Ok(Self {
            moved_coins,
            received_time,
            spent_time,
        })
    }

    pub fn moved_coins(&self) -> u64 {
        self.moved_coins
    }

    pub fn received_time(&self) -> Timestamp {
        self.received_time
    }

    pub fn spent_time(&self) -> Timestamp {
        self.spent_time
    }

    /// How long the coins were held before being moved.
    pub fn held_time(&self) -> u64 {
        self.spent_time - self.received_time
    }
}
