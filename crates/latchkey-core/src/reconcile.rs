// ── Device state reconciliation ──
//
// Merges fetched lock records into the device cache, detects bolt
// transitions, and drives accessory registration. This is the heart of
// the engine: the poller decides when to fetch, the reconciler decides
// what a fetch means.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use latchkey_api::RawLockRecord;

use crate::cache::DeviceCache;
use crate::error::CoreError;
use crate::model::{LockDevice, LockId, LockState, battery_percentage};
use crate::registry::AccessoryRegistry;

/// What one `reconcile` call did.
///
/// `Skipped` and `Created` are distinct from `Updated` so the cycle
/// runner can tell "no real device observed yet" apart from "observed
/// and up to date" -- a plain boolean conflates an empty cache with a
/// failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Record is not a bridged lock endpoint (keypad, virtual entry).
    Skipped,
    /// First observation: cache entry created, accessory registered.
    Created,
    /// Existing entry refreshed. `state_changed` is true only for a
    /// recognized locked/unlocked transition.
    Updated { state_changed: bool },
}

/// Aggregate of one full fetch cycle.
#[derive(Debug, Default)]
pub struct CycleResult {
    /// At least one bridged lock was reconciled this cycle.
    pub any_device_seen: bool,
    /// At least one bolt transition was recognized this cycle.
    pub any_state_changed: bool,
    /// Malformed-record descriptions, reported once per cycle.
    pub malformed: Vec<String>,
}

impl CycleResult {
    pub fn absorb(&mut self, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Skipped => {}
            ReconcileOutcome::Created => self.any_device_seen = true,
            ReconcileOutcome::Updated { state_changed } => {
                self.any_device_seen = true;
                self.any_state_changed |= state_changed;
            }
        }
    }
}

/// Merges raw records into the cache and mutates the registry.
pub struct Reconciler<R: AccessoryRegistry> {
    cache: Arc<DeviceCache>,
    registry: Arc<R>,
}

impl<R: AccessoryRegistry> Reconciler<R> {
    pub fn new(cache: Arc<DeviceCache>, registry: Arc<R>) -> Self {
        Self { cache, registry }
    }

    /// Merge one raw record into the cache.
    ///
    /// Malformed input returns `Err(MalformedRecord)` -- the caller
    /// logs it into the cycle aggregate and continues with the next
    /// device, never aborting the loop.
    pub fn reconcile(&self, raw: &RawLockRecord) -> Result<ReconcileOutcome, CoreError> {
        let id = raw
            .lock_id
            .as_deref()
            .map(LockId::new)
            .ok_or(CoreError::MalformedRecord { field: "LockID" })?;

        if !raw.has_bridge() {
            // Not a real lock endpoint. A previously cached entry means
            // the bridge was unpaired since last cycle; forget it.
            if let Some(gone) = self.cache.remove(&id) {
                info!(lock = %id, name = %gone.name, "lock no longer bridged, removing");
                self.registry.unregister(&id);
            } else {
                debug!(lock = %id, "skipping unbridged record");
            }
            return Ok(ReconcileOutcome::Skipped);
        }

        let fraction = raw
            .battery
            .ok_or(CoreError::MalformedRecord { field: "battery" })?;
        let battery_pct = battery_percentage(fraction);
        let low_battery = LockDevice::is_low_battery(battery_pct);

        let new_state = raw
            .lock_status
            .as_ref()
            .and_then(|s| s.status.as_deref())
            .map_or(LockState::Unknown, LockState::from_status);

        let name = raw.name.clone().unwrap_or_else(|| id.to_string());

        match self.cache.get(&id) {
            None => {
                let device = LockDevice {
                    id: id.clone(),
                    name,
                    house: raw.house_name.clone(),
                    serial: raw.serial_number.clone(),
                    model: raw.sku_number.clone(),
                    firmware: raw.firmware_version.clone(),
                    battery_pct,
                    low_battery,
                    state: new_state,
                    reachable: true,
                    last_seen: Utc::now(),
                };
                info!(lock = %id, name = %device.name, state = %device.state, "new lock observed");
                self.registry.register((&device).into());
                self.cache.upsert(device);
                Ok(ReconcileOutcome::Created)
            }
            Some(existing) => {
                // Transitions are recognized only between the two known
                // bolt states; a drop to Unknown is stored but never
                // counts as a change.
                let state_changed =
                    new_state != existing.state && new_state != LockState::Unknown;

                let device = LockDevice {
                    id: id.clone(),
                    name,
                    house: raw.house_name.clone(),
                    serial: raw.serial_number.clone(),
                    model: raw.sku_number.clone(),
                    firmware: raw.firmware_version.clone(),
                    battery_pct,
                    low_battery,
                    state: new_state,
                    reachable: true,
                    last_seen: Utc::now(),
                };
                self.cache.upsert(device);

                if state_changed {
                    let total = self.cache.note_state_change();
                    info!(
                        lock = %id,
                        from = %existing.state,
                        to = %new_state,
                        changes = total,
                        "bolt state transition"
                    );
                }
                Ok(ReconcileOutcome::Updated { state_changed })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Telemetry;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Debug, PartialEq)]
    enum RegistryEvent {
        Registered(String),
        Unregistered(String),
        Telemetry(String, Telemetry),
    }

    #[derive(Default)]
    struct RecordingRegistry {
        events: Mutex<Vec<RegistryEvent>>,
    }

    impl AccessoryRegistry for RecordingRegistry {
        fn register(&self, descriptor: crate::model::AccessoryDescriptor) {
            self.events
                .lock()
                .unwrap()
                .push(RegistryEvent::Registered(descriptor.id.to_string()));
        }

        fn unregister(&self, id: &LockId) {
            self.events
                .lock()
                .unwrap()
                .push(RegistryEvent::Unregistered(id.to_string()));
        }

        fn update_telemetry(&self, id: &LockId, telemetry: Telemetry) {
            self.events
                .lock()
                .unwrap()
                .push(RegistryEvent::Telemetry(id.to_string(), telemetry));
        }
    }

    fn setup() -> (Arc<DeviceCache>, Arc<RecordingRegistry>, Reconciler<RecordingRegistry>) {
        let cache = Arc::new(DeviceCache::new());
        let registry = Arc::new(RecordingRegistry::default());
        let reconciler = Reconciler::new(Arc::clone(&cache), Arc::clone(&registry));
        (cache, registry, reconciler)
    }

    fn record(id: &str, status: &str, battery: f64) -> RawLockRecord {
        serde_json::from_value(serde_json::json!({
            "LockID": id,
            "LockName": "Front Door",
            "HouseName": "Home",
            "SerialNumber": "L1AAA000XX",
            "skuNumber": "AUG-SL03",
            "Bridge": { "_id": "b1" },
            "LockStatus": { "status": status },
            "battery": battery,
        }))
        .unwrap()
    }

    #[test]
    fn unbridged_record_is_skipped_and_cache_untouched() {
        let (cache, registry, reconciler) = setup();
        let raw: RawLockRecord =
            serde_json::from_value(serde_json::json!({ "LockID": "A", "battery": 0.5 })).unwrap();

        let outcome = reconciler.reconcile(&raw).unwrap();

        assert_eq!(outcome, ReconcileOutcome::Skipped);
        assert!(cache.is_empty());
        assert!(registry.events.lock().unwrap().is_empty());
    }

    #[test]
    fn unbridged_record_evicts_previously_cached_lock() {
        let (cache, registry, reconciler) = setup();
        reconciler.reconcile(&record("A", "locked", 0.8)).unwrap();
        assert_eq!(cache.len(), 1);

        let mut gone = record("A", "locked", 0.8);
        gone.bridge = None;
        let outcome = reconciler.reconcile(&gone).unwrap();

        assert_eq!(outcome, ReconcileOutcome::Skipped);
        assert!(cache.is_empty());
        assert_eq!(
            *registry.events.lock().unwrap(),
            vec![
                RegistryEvent::Registered("A".into()),
                RegistryEvent::Unregistered("A".into()),
            ]
        );
    }

    #[test]
    fn first_sight_creates_and_registers() {
        let (cache, registry, reconciler) = setup();

        let outcome = reconciler.reconcile(&record("A", "locked", 0.87)).unwrap();

        assert_eq!(outcome, ReconcileOutcome::Created);
        assert_eq!(cache.len(), 1);
        let device = cache.get(&LockId::new("A")).unwrap();
        assert_eq!(device.battery_pct, 87);
        assert_eq!(device.state, LockState::Locked);
        assert!(device.reachable);
        assert_eq!(
            *registry.events.lock().unwrap(),
            vec![RegistryEvent::Registered("A".into())]
        );
    }

    #[test]
    fn reconcile_is_idempotent_for_unchanged_records() {
        let (cache, _registry, reconciler) = setup();
        let raw = record("A", "locked", 0.87);

        reconciler.reconcile(&raw).unwrap();
        let outcome = reconciler.reconcile(&raw).unwrap();

        assert_eq!(outcome, ReconcileOutcome::Updated { state_changed: false });
        assert_eq!(cache.change_count(), 0);
    }

    #[test]
    fn transition_counts_exactly_once() {
        let (cache, _registry, reconciler) = setup();

        reconciler.reconcile(&record("A", "locked", 0.87)).unwrap();
        let outcome = reconciler.reconcile(&record("A", "unlocked", 0.87)).unwrap();

        assert_eq!(outcome, ReconcileOutcome::Updated { state_changed: true });
        assert_eq!(cache.change_count(), 1);
        assert_eq!(
            cache.get(&LockId::new("A")).unwrap().state,
            LockState::Unlocked
        );
    }

    #[test]
    fn drop_to_unknown_is_stored_but_not_a_change() {
        let (cache, _registry, reconciler) = setup();

        reconciler.reconcile(&record("A", "locked", 0.87)).unwrap();
        let outcome = reconciler
            .reconcile(&record("A", "kAugLockState_Locking", 0.87))
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Updated { state_changed: false });
        assert_eq!(cache.change_count(), 0);
        assert_eq!(
            cache.get(&LockId::new("A")).unwrap().state,
            LockState::Unknown
        );
    }

    #[test]
    fn battery_fraction_rounds_and_derives_low_flag() {
        let (cache, _registry, reconciler) = setup();

        reconciler.reconcile(&record("A", "locked", 0.15)).unwrap();
        let device = cache.get(&LockId::new("A")).unwrap();
        assert_eq!(device.battery_pct, 15);
        assert!(device.low_battery);

        reconciler.reconcile(&record("A", "locked", 0.25)).unwrap();
        let device = cache.get(&LockId::new("A")).unwrap();
        assert_eq!(device.battery_pct, 25);
        assert!(!device.low_battery);
    }

    #[test]
    fn missing_required_fields_are_malformed_not_fatal() {
        let (cache, _registry, reconciler) = setup();

        let no_id: RawLockRecord =
            serde_json::from_value(serde_json::json!({ "Bridge": {}, "battery": 0.5 })).unwrap();
        let err = reconciler.reconcile(&no_id).unwrap_err();
        assert!(matches!(err, CoreError::MalformedRecord { field: "LockID" }));

        let no_battery: RawLockRecord =
            serde_json::from_value(serde_json::json!({ "LockID": "A", "Bridge": {} })).unwrap();
        let err = reconciler.reconcile(&no_battery).unwrap_err();
        assert!(matches!(err, CoreError::MalformedRecord { field: "battery" }));

        assert!(cache.is_empty());
    }

    #[test]
    fn cycle_result_aggregation() {
        let mut cycle = CycleResult::default();
        cycle.absorb(ReconcileOutcome::Skipped);
        assert!(!cycle.any_device_seen);

        cycle.absorb(ReconcileOutcome::Updated { state_changed: false });
        assert!(cycle.any_device_seen);
        assert!(!cycle.any_state_changed);

        cycle.absorb(ReconcileOutcome::Updated { state_changed: true });
        assert!(cycle.any_state_changed);
    }
}
