//! State reconciliation and adaptive polling engine for latchkey.
//!
//! This crate owns the business logic between `latchkey-api` and the
//! host consumer (CLI or embedding process):
//!
//! - **[`Bridge`]** — Central facade managing one account's lifecycle:
//!   [`start()`](Bridge::start) authenticates, runs an immediate fetch
//!   cycle, then spawns the adaptive poll loop and command processor.
//!   [`Bridge::oneshot()`] provides a lightweight mode for single CLI
//!   invocations.
//!
//! - **[`Reconciler`]** — Merges fetched lock records into the
//!   [`DeviceCache`], recognizes bolt transitions, and drives accessory
//!   registration through the [`AccessoryRegistry`] seam.
//!
//! - **[`PollState`]** — Pure SHORT/LONG countdown machine: activity
//!   grants a budget of fast ticks, a failed cycle grants exactly one
//!   fast retry, otherwise the loop settles on the slow cadence.
//!
//! - **[`SessionManager`]** — Token lifecycle; re-authenticates only
//!   when the cycle runner stops trusting its data.
//!
//! - **[`Command`]** — Typed mutation requests routed through an `mpsc`
//!   channel to the bridge's processor task; reads bypass the channel
//!   via cache snapshots.

pub mod bridge;
pub mod cache;
pub mod command;
pub mod config;
pub mod directory;
pub mod error;
pub mod model;
pub mod poll;
pub mod reconcile;
pub mod registry;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{Bridge, BridgeState};
pub use cache::DeviceCache;
pub use command::{Command, CommandEnvelope, CommandResult};
pub use config::{BridgeConfig, DEFAULT_INSTALL_ID, PollConfig};
pub use directory::DeviceDirectory;
pub use error::CoreError;
pub use model::{
    AccessoryDescriptor, LOW_BATTERY_THRESHOLD, LockDevice, LockId, LockState, Telemetry,
};
pub use poll::{IntervalClass, PollState};
pub use reconcile::{CycleResult, ReconcileOutcome, Reconciler};
pub use registry::{AccessoryRegistry, NoopRegistry};
pub use session::SessionManager;
