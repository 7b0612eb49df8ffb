//! Async client for the smart-lock cloud directory API.
//!
//! Wraps `reqwest::Client` with the service's header conventions
//! (per-request access token, application key) and the small set of
//! endpoints the bridge needs:
//!
//! - **Session**: `authenticate()` posts credentials and captures the
//!   access token from the response headers.
//! - **Directory**: `list_locks()` enumerates the account's locks,
//!   `get_lock()` fetches a single lock's detail record.
//! - **Operation**: `remote_operate()` drives a lock to a target state.
//! - **Verification**: `send_code_to_*()` / `validate_*()` support the
//!   account verification flow.
//!
//! All wire shapes live in [`types`]; the higher-level reconciliation
//! and polling logic lives in `latchkey-core`.

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::{ApiHeaders, DirectoryClient};
pub use error::Error;
pub use transport::TransportConfig;
pub use types::{LockOperation, LockSummary, OperateAck, RawLockRecord, Session};
