// Shared transport configuration for building reqwest::Client instances.
//
// Timeout and default-header plumbing lives here so the directory client
// stays focused on endpoint mechanics.

use std::time::Duration;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` with the given default headers.
    ///
    /// The directory client injects the application key header here so
    /// every request carries it without per-call bookkeeping.
    pub fn build_client(
        &self,
        headers: reqwest::header::HeaderMap,
    ) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent("latchkey/0.1.0")
            .default_headers(headers)
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
