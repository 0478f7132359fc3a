use thiserror::Error;

use crate::Timestamp;

/// Error types shared across the mana workspace.
///
/// History corruption is deliberately absent: it is a defect, not a
/// condition a caller can handle, and is raised as a panic by the balance.
#[derive(Debug, Error)]
pub enum ManaError {
    /// A transfer violates its own invariants (e.g. spent before received).
    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    /// The transfer is older than the retention checkpoint and can no longer
    /// be placed in canonical order.
    #[error(
        "Transfer spent at {spent_time} is at or before the retention checkpoint at {checkpoint_time}"
    )]
    BeyondRetention {
        spent_time: Timestamp,
        checkpoint_time: Timestamp,
    },

    /// A previous operation on this identity's balance hit a fatal corruption.
    #[error("Balance for identity {0} is poisoned and must not be used")]
    Poisoned(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ManaError {
    fn from(e: serde_json::Error) -> Self {
        ManaError::Serialization(e.to_string())
    }
}
