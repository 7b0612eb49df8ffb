//! Tracing-backed accessory registry.
//!
//! The CLI has no home-automation platform to hand accessories to, so
//! registry callbacks surface as structured log lines instead. `run`
//! output therefore shows every register/unregister and telemetry push.

use latchkey_core::{AccessoryDescriptor, AccessoryRegistry, LockId, Telemetry};
use tracing::info;

#[derive(Debug, Default)]
pub struct LogRegistry;

impl AccessoryRegistry for LogRegistry {
    fn register(&self, descriptor: AccessoryDescriptor) {
        info!(
            id = %descriptor.id,
            name = %descriptor.name,
            model = descriptor.model.as_deref().unwrap_or("-"),
            "lock discovered"
        );
    }

    fn unregister(&self, id: &LockId) {
        info!(id = %id, "lock removed");
    }

    fn update_telemetry(&self, id: &LockId, telemetry: Telemetry) {
        info!(
            id = %id,
            state = %telemetry.state,
            battery_pct = telemetry.battery_pct,
            low_battery = telemetry.low_battery,
            reachable = telemetry.reachable,
            "telemetry"
        );
    }
}
