//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and API errors into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use latchkey_core::CoreError;

/// Exit codes for scripting.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed")]
    #[diagnostic(
        code(latchkey::auth_failed),
        help(
            "Verify the identifier and password in your config.\n\
             New accounts must be verified first: latchkey verify send phone <number>"
        )
    )]
    AuthFailed,

    #[error("No credentials configured")]
    #[diagnostic(
        code(latchkey::no_credentials),
        help(
            "Set identifier and password in the config file,\n\
             or use LATCHKEY_IDENTIFIER / LATCHKEY_PASSWORD."
        )
    )]
    NoCredentials,

    // ── Resources ────────────────────────────────────────────────────

    #[error("Lock '{identifier}' not found")]
    #[diagnostic(
        code(latchkey::not_found),
        help("Run: latchkey status to see the account's locks")
    )]
    NotFound { identifier: String },

    #[error("Lock '{identifier}' rejected the operation")]
    #[diagnostic(
        code(latchkey::conflict),
        help("The lock may be mid-operation; retry in a few seconds.")
    )]
    Conflict { identifier: String },

    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the lock cloud")]
    #[diagnostic(
        code(latchkey::connection_failed),
        help("Check network connectivity and the configured URL.")
    )]
    ConnectionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── Validation / configuration ───────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(latchkey::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(latchkey::no_config),
        help(
            "Create one at: {path}\n\
             Or pass credentials via flags / environment."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(latchkey::config))]
    Config(Box<figment::Error>),

    // ── API / engine passthrough ─────────────────────────────────────

    #[error("Cloud API error ({status}): {message}")]
    #[diagnostic(code(latchkey::api_error))]
    Api { status: u16, message: String },

    #[error("{message}")]
    #[diagnostic(code(latchkey::engine))]
    Engine { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthFailed | Self::NoCredentials => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Validation { .. } | Self::NoConfig { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Api(api) => api.into(),
            CoreError::DeviceNotFound { id } => Self::NotFound { identifier: id },
            CoreError::InvalidConfig { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            other => Self::Engine {
                message: other.to_string(),
            },
        }
    }
}

impl From<latchkey_api::Error> for CliError {
    fn from(err: latchkey_api::Error) -> Self {
        if err.is_auth_expired() {
            return Self::AuthFailed;
        }
        match err {
            latchkey_api::Error::Api { status, message } if status == 404 => Self::NotFound {
                identifier: message,
            },
            latchkey_api::Error::Api { status, message } if status == 409 => Self::Conflict {
                identifier: message,
            },
            latchkey_api::Error::Api { status, message } => Self::Api { status, message },
            latchkey_api::Error::Transport(e) => Self::ConnectionFailed {
                source: Box::new(e),
            },
            other => Self::Engine {
                message: other.to_string(),
            },
        }
    }
}
