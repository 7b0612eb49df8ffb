//! CLI configuration: TOML file + environment + flag overrides.
//!
//! Resolution order is flag > environment > file. The file is TOML at
//! the platform config dir (or `--config`); environment variables use
//! the `LATCHKEY_` prefix.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use latchkey_core::{BridgeConfig, DEFAULT_INSTALL_ID, PollConfig};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;

/// Production cloud endpoint.
const DEFAULT_URL: &str = "https://api-production.august.com";

// ── TOML file shape ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
pub struct FileConfig {
    /// Cloud API base URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Account identifier (phone number or email).
    pub identifier: Option<String>,

    /// Account password (plaintext -- prefer LATCHKEY_PASSWORD).
    pub password: Option<String>,

    /// Application key (plaintext -- prefer LATCHKEY_API_KEY).
    pub api_key: Option<String>,

    /// Install identifier tied to remote-operate grants. Keep stable.
    #[serde(default = "default_install_id")]
    pub install_id: String,

    /// Fast poll cadence in seconds.
    #[serde(default = "default_short_interval")]
    pub short_interval_secs: u64,

    /// Slow poll cadence in seconds.
    #[serde(default = "default_long_interval")]
    pub long_interval_secs: u64,

    /// How long to stay fast after activity, in seconds.
    #[serde(default = "default_short_duration")]
    pub short_duration_secs: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            identifier: None,
            password: None,
            api_key: None,
            install_id: default_install_id(),
            short_interval_secs: default_short_interval(),
            long_interval_secs: default_long_interval(),
            short_duration_secs: default_short_duration(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_URL.into()
}
fn default_install_id() -> String {
    DEFAULT_INSTALL_ID.into()
}
fn default_short_interval() -> u64 {
    5
}
fn default_long_interval() -> u64 {
    300
}
fn default_short_duration() -> u64 {
    120
}

// ── Paths and loading ───────────────────────────────────────────────

pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "latchkey", "latchkey").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("latchkey");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Load the file + environment layers.
pub fn load_file_config(path: Option<&Path>) -> Result<FileConfig, CliError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("LATCHKEY_"));

    Ok(figment.extract()?)
}

// ── Resolution to BridgeConfig ──────────────────────────────────────

/// Build a `BridgeConfig` from the file config and CLI flag overrides.
pub fn resolve(global: &GlobalOpts, run: Option<&RunArgs>) -> Result<BridgeConfig, CliError> {
    let file = load_file_config(global.config.as_deref())?;

    let url_str = global.url.as_deref().unwrap_or(&file.url);
    let url: url::Url = url_str.parse().map_err(|_| CliError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {url_str}"),
    })?;

    let identifier = global
        .identifier
        .clone()
        .or(file.identifier)
        .ok_or(CliError::NoCredentials)?;
    let password = global
        .password
        .clone()
        .or(file.password)
        .map(SecretString::from)
        .ok_or(CliError::NoCredentials)?;
    let api_key = global
        .api_key
        .clone()
        .or(file.api_key)
        .ok_or(CliError::NoCredentials)?;

    let poll = PollConfig {
        short_interval_secs: run
            .and_then(|r| r.short_interval)
            .unwrap_or(file.short_interval_secs),
        long_interval_secs: run
            .and_then(|r| r.long_interval)
            .unwrap_or(file.long_interval_secs),
        short_duration_secs: run
            .and_then(|r| r.short_duration)
            .unwrap_or(file.short_duration_secs),
    };

    let config = BridgeConfig {
        url,
        identifier,
        password,
        api_key,
        install_id: file.install_id,
        poll,
        timeout: Duration::from_secs(global.timeout),
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn file_defaults_match_service_cadence() {
        let cfg = FileConfig::default();
        assert_eq!(cfg.short_interval_secs, 5);
        assert_eq!(cfg.long_interval_secs, 300);
        assert_eq!(cfg.short_duration_secs, 120);
        assert_eq!(cfg.url, DEFAULT_URL);
    }

    #[test]
    fn toml_file_layers_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "identifier = \"me@example.com\"\nshort_interval_secs = 10\n",
        )
        .unwrap();

        let cfg = load_file_config(Some(&path)).unwrap();
        assert_eq!(cfg.identifier.as_deref(), Some("me@example.com"));
        assert_eq!(cfg.short_interval_secs, 10);
        assert_eq!(cfg.long_interval_secs, 300);
    }
}
