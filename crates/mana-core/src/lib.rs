// crates/mana-core/src/lib.rs
//
// mana-core: Core types, errors, and the calculator trait for mana accounting.
//
// This is the leaf crate every other crate in the workspace depends on.
// Mana is a decaying, accruing reputation weight derived from observed value
// transfers. All arithmetic on it must be deterministic across nodes.

pub mod error;
pub mod identity;
pub mod traits;
pub mod transfer;

/// Point in time, in protocol time units. Injected by the caller, never read
/// from a wall clock.
pub type Timestamp = u64;

/// Mana amount in base units.
pub type Mana = u64;

/// Residue discarded by a calculator step, in calculator-specific units.
pub type RoundingError = u64;

pub use error::ManaError;
pub use identity::IdentityId;
pub use traits::ManaCalculator;
pub use transfer::Transfer;
