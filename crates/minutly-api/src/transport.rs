// Shared transport configuration for building reqwest::Client instances.
//
// Hosts that already own a connection pool pass it to `MinutClient::new`
// directly. Everyone else builds one here.

use std::time::Duration;

use crate::error::Error;

/// Default per-request timeout for every vendor call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Transport settings for the pooled HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("minutly/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(Error::Transport)
    }
}
