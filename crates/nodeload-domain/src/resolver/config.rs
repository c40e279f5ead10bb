//! Configuration for the node resolver.

use std::time::Duration;

/// Configuration for the node resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Upper bound on one resolution (fetch plus visibility checks).
    pub fetch_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl ResolverConfig {
    /// Creates a new configuration with the specified fetch timeout.
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }
}
