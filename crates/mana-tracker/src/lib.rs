// crates/mana-tracker/src/lib.rs
//
// mana-tracker: Mana balances for every tracked identity.
//
// Owns one `Balance` per identity behind its own lock, so each
// `add_transfer` runs as a single atomic step while different identities
// proceed in parallel. Publishes balance events to registered subscribers.

pub mod config;
pub mod events;
pub mod telemetry;
pub mod tracker;

pub use config::{CalculatorConfig, ManaConfig, RetentionConfig};
pub use events::{BalanceEvent, BalanceEvents, SubscriptionId};
pub use tracker::ManaTracker;
