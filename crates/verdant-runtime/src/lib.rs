//! Wiring for the alerting core: TOML configuration, the reading
//! ingestion loop, and the recurring escalation tick.
//!
//! [`runner::Monitor`] owns the rule store, the escalation engine, and
//! the action dispatcher, and keeps dispatch off the ingestion hot path
//! by spawning each dispatch onto its own task.

pub mod config;
pub mod runner;

#[cfg(test)]
mod tests;

pub use config::{ConfigError, MonitorConfig};
pub use runner::Monitor;

/// Initialize tracing from `RUST_LOG`, defaulting the `verdant` targets
/// to `info`.
///
/// # Errors
///
/// Returns an error if the default directive fails to parse, which only
/// happens when the hardcoded directive string is invalid.
pub fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("verdant=info".parse()?))
        .init();
    Ok(())
}
