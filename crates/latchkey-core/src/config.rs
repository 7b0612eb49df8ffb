// ── Bridge configuration ──

use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// Install identifier posted with the session request. The cloud ties
/// remote-operate permission grants to this value, so it must stay
/// stable across restarts.
pub const DEFAULT_INSTALL_ID: &str = "E629CCCC-A9E0-40F1-8BB8-43A24830346B";

/// Polling cadence configuration.
///
/// SHORT is used right after activity or errors, LONG otherwise. The
/// SHORT-tick budget is derived: `short_duration / short_interval`,
/// floored, minimum 1.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Fast cadence (seconds), used while recent activity is expected.
    pub short_interval_secs: u64,
    /// Slow cadence (seconds), used when the system is quiet.
    pub long_interval_secs: u64,
    /// How long to stay on the fast cadence after activity (seconds).
    pub short_duration_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            short_interval_secs: 5,
            long_interval_secs: 300,
            short_duration_secs: 120,
        }
    }
}

impl PollConfig {
    /// Number of consecutive SHORT ticks granted after activity.
    pub fn budget(&self) -> u32 {
        let ticks = self.short_duration_secs / self.short_interval_secs;
        u32::try_from(ticks.max(1)).unwrap_or(u32::MAX)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, value) in [
            ("short_interval_secs", self.short_interval_secs),
            ("long_interval_secs", self.long_interval_secs),
            ("short_duration_secs", self.short_duration_secs),
        ] {
            if value == 0 {
                return Err(CoreError::InvalidConfig {
                    message: format!("{name} must be greater than zero"),
                });
            }
        }
        Ok(())
    }
}

/// Configuration for a single account's bridge session.
///
/// Built by the CLI, passed to `Bridge` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Cloud API base URL.
    pub url: Url,
    /// Account identifier (phone number or email).
    pub identifier: String,
    /// Account password.
    pub password: SecretString,
    /// Application key sent with every request.
    pub api_key: String,
    /// Install identifier posted with the session request.
    pub install_id: String,
    /// Polling cadences.
    pub poll: PollConfig,
    /// Request timeout.
    pub timeout: std::time::Duration,
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.identifier.is_empty() {
            return Err(CoreError::InvalidConfig {
                message: "identifier must not be empty".into(),
            });
        }
        if self.api_key.is_empty() {
            return Err(CoreError::InvalidConfig {
                message: "api_key must not be empty".into(),
            });
        }
        self.poll.validate()
    }
}
