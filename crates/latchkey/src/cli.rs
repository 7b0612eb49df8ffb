//! Clap derive structures for the `latchkey` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// latchkey -- bridge smart-lock cloud accounts to local automation
#[derive(Debug, Parser)]
#[command(
    name = "latchkey",
    version,
    about = "Poll, inspect, and operate cloud-connected smart locks",
    long_about = "Bridges one smart-lock cloud account into local automation.\n\n\
        `run` keeps an adaptive poll loop alive and pushes lock telemetry;\n\
        `status`, `lock`, and `unlock` are one-shot operations.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Path to the config file (default: platform config dir)
    #[arg(long, env = "LATCHKEY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Cloud API base URL (overrides config)
    #[arg(long, env = "LATCHKEY_URL", global = true)]
    pub url: Option<String>,

    /// Account identifier: phone number or email (overrides config)
    #[arg(long, short = 'u', env = "LATCHKEY_IDENTIFIER", global = true)]
    pub identifier: Option<String>,

    /// Account password
    #[arg(long, env = "LATCHKEY_PASSWORD", global = true, hide_env = true)]
    pub password: Option<String>,

    /// Application key sent with every request
    #[arg(long, env = "LATCHKEY_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "LATCHKEY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds
    #[arg(long, env = "LATCHKEY_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Plain text, one lock id per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bridge: poll the cloud and push lock telemetry
    Run(RunArgs),

    /// One-shot: fetch and display the account's locks
    #[command(alias = "st")]
    Status(StatusArgs),

    /// One-shot: drive a lock to the locked state
    Lock(OperateArgs),

    /// One-shot: drive a lock to the unlocked state
    Unlock(OperateArgs),

    /// Account verification codes (phone/email)
    Verify(VerifyArgs),

    /// Inspect or initialize the configuration file
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Fast poll cadence in seconds (overrides config)
    #[arg(long)]
    pub short_interval: Option<u64>,

    /// Slow poll cadence in seconds (overrides config)
    #[arg(long)]
    pub long_interval: Option<u64>,

    /// How long to stay on the fast cadence after activity, in seconds
    #[arg(long)]
    pub short_duration: Option<u64>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Show only this lock
    #[arg(value_name = "LOCK_ID")]
    pub lock_id: Option<String>,
}

#[derive(Debug, Args)]
pub struct OperateArgs {
    /// Lock identifier (case-insensitive)
    #[arg(value_name = "LOCK_ID")]
    pub lock_id: String,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    #[command(subcommand)]
    pub action: VerifyAction,
}

#[derive(Debug, Subcommand)]
pub enum VerifyAction {
    /// Request a verification code
    Send {
        /// Where to send the code
        #[arg(value_enum)]
        channel: VerifyChannel,
        /// Phone number (+15551234567) or email address
        value: String,
    },
    /// Submit a received verification code
    Submit {
        #[arg(value_enum)]
        channel: VerifyChannel,
        /// Phone number or email address the code was sent to
        value: String,
        /// The received code
        code: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum VerifyChannel {
    Phone,
    Email,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Write a template config file with defaults
    Init,
}
