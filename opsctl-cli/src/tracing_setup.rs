//! Tracing setup for the opsctl CLI
//!
//! Usage:
//!   opsctl -v ...                     # Debug logging to console
//!   RUST_LOG=opsctl_pg=debug opsctl   # Fine-grained log control
//!
//! Environment variables:
//!   RUST_LOG                          # Log filter (default: info)

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Debug level unless RUST_LOG is explicitly set
    pub verbose: bool,
}

impl TracingConfig {
    fn default_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Initialize console tracing once; later calls fail harmlessly
pub fn init(config: &TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.verbose) // Show targets in verbose mode
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_follows_verbose() {
        assert_eq!(TracingConfig { verbose: false }.default_level(), "info");
        assert_eq!(TracingConfig { verbose: true }.default_level(), "debug");
    }
}
