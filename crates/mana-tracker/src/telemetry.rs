// crates/mana-tracker/src/telemetry.rs

use tracing_subscriber::EnvFilter;

use mana_core::ManaError;

/// Install a global fmt subscriber. `RUST_LOG` takes precedence over
/// `log_level`.
///
/// # Errors
/// Returns `ManaError::Config` if a global subscriber is already installed.
pub fn init_tracing(log_level: &str) -> Result<(), ManaError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| ManaError::Config(format!("tracing already initialized: {}", e)))
}
