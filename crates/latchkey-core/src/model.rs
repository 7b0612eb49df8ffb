// ── Domain model ──
//
// Canonical lock types built from `latchkey-api` wire records. These
// are plain data: logging and telemetry sinks are injected where the
// records are produced, never stored on the entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use latchkey_api::LockOperation;

/// Battery percentage below which a lock reports low battery.
pub const LOW_BATTERY_THRESHOLD: u8 = 20;

/// Lock identifier, normalized to uppercase.
///
/// The cloud is case-insensitive on input but returns uppercase ids,
/// and some endpoints reject lowercase, so normalization happens at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockId(String);

impl LockId {
    pub fn new(raw: &str) -> Self {
        Self(raw.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LockId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Bolt state of a lock.
///
/// Only `"locked"` and `"unlocked"` status strings are recognized;
/// anything else maps to `Unknown` and never counts as a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LockState {
    Locked,
    Unlocked,
    Unknown,
}

impl LockState {
    /// Map a server-reported status string.
    pub fn from_status(status: &str) -> Self {
        match status {
            "locked" => Self::Locked,
            "unlocked" => Self::Unlocked,
            _ => Self::Unknown,
        }
    }

    /// The remote command that drives a lock to this state.
    ///
    /// `Unknown` is not a commandable target.
    pub fn operation(self) -> Option<LockOperation> {
        match self {
            Self::Locked => Some(LockOperation::Lock),
            Self::Unlocked => Some(LockOperation::Unlock),
            Self::Unknown => None,
        }
    }
}

/// Round a battery fraction (0.0..=1.0) to a whole percentage.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn battery_percentage(fraction: f64) -> u8 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}

/// One physical lock as held in the device cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockDevice {
    pub id: LockId,
    pub name: String,
    pub house: Option<String>,
    pub serial: Option<String>,
    pub model: Option<String>,
    pub firmware: Option<String>,
    /// Whole-number percentage, recomputed from every fetch.
    pub battery_pct: u8,
    pub low_battery: bool,
    pub state: LockState,
    pub reachable: bool,
    pub last_seen: DateTime<Utc>,
}

impl LockDevice {
    /// Derived low-battery flag: strictly below the threshold. A lock
    /// at exactly 20% reports normal battery.
    pub fn is_low_battery(battery_pct: u8) -> bool {
        battery_pct < LOW_BATTERY_THRESHOLD
    }
}

/// Registration payload handed to the accessory registry when a lock
/// is first observed.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessoryDescriptor {
    pub id: LockId,
    pub name: String,
    pub serial: Option<String>,
    pub model: Option<String>,
    pub house: Option<String>,
    pub battery_pct: u8,
    pub low_battery: bool,
}

impl From<&LockDevice> for AccessoryDescriptor {
    fn from(device: &LockDevice) -> Self {
        Self {
            id: device.id.clone(),
            name: device.name.clone(),
            serial: device.serial.clone(),
            model: device.model.clone(),
            house: device.house.clone(),
            battery_pct: device.battery_pct,
            low_battery: device.low_battery,
        }
    }
}

/// Per-lock telemetry pushed to the accessory registry after each
/// successful cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    pub state: LockState,
    pub battery_pct: u8,
    pub low_battery: bool,
    pub reachable: bool,
}

impl From<&LockDevice> for Telemetry {
    fn from(device: &LockDevice) -> Self {
        Self {
            state: device.state,
            battery_pct: device.battery_pct,
            low_battery: device.low_battery,
            reachable: device.reachable,
        }
    }
}
