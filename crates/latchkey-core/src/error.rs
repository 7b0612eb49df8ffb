// ── Core error type ──

use thiserror::Error;

/// Errors produced by the reconciliation engine and bridge lifecycle.
///
/// None of these are fatal to the poll loop: cycle-level failures feed
/// the poller's backoff rule, malformed records are aggregated and
/// reported once per cycle.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Api(#[from] latchkey_api::Error),

    #[error("Malformed device record: missing {field}")]
    MalformedRecord { field: &'static str },

    #[error("Lock not found: {id}")]
    DeviceNotFound { id: String },

    #[error("Bridge is not running")]
    Disconnected,

    #[error("Invalid command: {message}")]
    InvalidCommand { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl CoreError {
    /// Whether the failure means the session should be re-established.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_auth_expired())
    }
}
