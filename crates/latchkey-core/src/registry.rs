// ── Accessory registry seam ──

use crate::model::{AccessoryDescriptor, LockId, Telemetry};

/// Host-provided accessory store.
///
/// All three operations are fire-and-forget: the host owns accessory
/// lifecycle failures, the engine never blocks a cycle on them. The
/// CLI supplies a logging implementation; embedders wire in their own.
pub trait AccessoryRegistry: Send + Sync + 'static {
    /// A lock was observed for the first time this session.
    fn register(&self, descriptor: AccessoryDescriptor);

    /// A lock dropped off the bridge or failed a command; forget it
    /// until a successful fetch re-creates it.
    fn unregister(&self, id: &LockId);

    /// Fresh state/battery readings for a known lock.
    fn update_telemetry(&self, id: &LockId, telemetry: Telemetry);
}

/// Registry that discards everything. Useful for one-shot CLI commands
/// that only need the cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRegistry;

impl AccessoryRegistry for NoopRegistry {
    fn register(&self, _descriptor: AccessoryDescriptor) {}
    fn unregister(&self, _id: &LockId) {}
    fn update_telemetry(&self, _id: &LockId, _telemetry: Telemetry) {}
}
