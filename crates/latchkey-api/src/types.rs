//! Wire types for the lock cloud API.
//!
//! Field names follow the upstream JSON exactly (mixed Pascal/camel case),
//! with serde renames so the Rust side stays conventional. Most record
//! fields are optional: the directory feed omits them when a lock is
//! offline or mid-enrollment, and validation happens downstream.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Authenticated session returned by the session endpoint.
///
/// The access token arrives in a response header rather than the body,
/// so this is assembled by the client, not deserialized directly.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SecretString,
    pub user_id: String,
}

/// Remote operation verb accepted by the operate endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOperation {
    Lock,
    Unlock,
}

impl LockOperation {
    /// Path segment used in the operate URL.
    pub fn as_path(self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Unlock => "unlock",
        }
    }
}

impl std::fmt::Display for LockOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_path())
    }
}

/// Summary entry from the lock directory listing.
///
/// The listing endpoint returns a JSON object keyed by lock id; the
/// values carry only the display fields. Full state requires a per-lock
/// detail fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct LockSummary {
    #[serde(rename = "LockName")]
    pub name: Option<String>,
    #[serde(rename = "HouseName")]
    pub house_name: Option<String>,
    #[serde(rename = "UserType")]
    pub user_type: Option<String>,
}

/// Reported lock bolt status, nested inside the detail record.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LockStatus {
    pub status: Option<String>,
    #[serde(rename = "doorState")]
    pub door_state: Option<String>,
}

/// Full per-lock record from the detail endpoint.
///
/// `bridge` is kept as raw JSON: the feed sends an object when a bridge
/// is paired, and omits the field (or sends null/false) otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLockRecord {
    #[serde(rename = "LockID")]
    pub lock_id: Option<String>,
    #[serde(rename = "LockName")]
    pub name: Option<String>,
    #[serde(rename = "HouseName")]
    pub house_name: Option<String>,
    #[serde(rename = "SerialNumber")]
    pub serial_number: Option<String>,
    #[serde(rename = "skuNumber")]
    pub sku_number: Option<String>,
    #[serde(rename = "currentFirmwareVersion")]
    pub firmware_version: Option<String>,
    #[serde(rename = "Bridge")]
    pub bridge: Option<serde_json::Value>,
    #[serde(rename = "LockStatus")]
    pub lock_status: Option<LockStatus>,
    /// Battery charge as a fraction in `[0.0, 1.0]`.
    pub battery: Option<f64>,
}

impl RawLockRecord {
    /// Whether the record indicates a paired bridge.
    ///
    /// A missing field, `null`, or `false` all mean no bridge; any other
    /// value (the usual case is an object) counts as present.
    pub fn has_bridge(&self) -> bool {
        match &self.bridge {
            None => false,
            Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::Bool(b)) => *b,
            Some(_) => true,
        }
    }
}

/// Acknowledgement from the remote operate endpoint.
///
/// The interesting part is the echoed status; callers treat a 2xx with
/// any body as accepted and poll for the settled state separately.
#[derive(Debug, Clone, Deserialize)]
pub struct OperateAck {
    pub status: Option<String>,
}
