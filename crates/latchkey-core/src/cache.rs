// ── Reactive device cache ──
//
// Lock-free concurrent storage for the session's lock devices, with a
// push-based snapshot for observers and a shared change counter that
// drives poll-interval decay.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::{LockDevice, LockId};

/// In-process cache of the account's locks.
///
/// `DashMap` gives O(1) concurrent lookups; a `watch` channel carries a
/// full snapshot rebuilt on every mutation. Devices are always replaced
/// wholesale -- concurrent writers to the same id serialize on the map
/// entry, so observers never see a partially updated record.
pub struct DeviceCache {
    by_id: DashMap<LockId, Arc<LockDevice>>,

    /// Full snapshot, rebuilt on mutation for cheap subscription.
    snapshot: watch::Sender<Arc<Vec<Arc<LockDevice>>>>,

    /// Bumped whenever any lock's bolt state transitions.
    change_counter: AtomicU64,
}

impl Default for DeviceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceCache {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_id: DashMap::new(),
            snapshot,
            change_counter: AtomicU64::new(0),
        }
    }

    /// Insert or replace a device. Returns `true` if the id was new.
    pub fn upsert(&self, device: LockDevice) -> bool {
        let is_new = !self.by_id.contains_key(&device.id);
        self.by_id.insert(device.id.clone(), Arc::new(device));
        self.rebuild_snapshot();
        is_new
    }

    /// Remove a device. Returns the removed record if it existed.
    pub fn remove(&self, id: &LockId) -> Option<Arc<LockDevice>> {
        let removed = self.by_id.remove(id).map(|(_, v)| v);
        if removed.is_some() {
            self.rebuild_snapshot();
        }
        removed
    }

    pub fn get(&self, id: &LockId) -> Option<Arc<LockDevice>> {
        self.by_id.get(id).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, id: &LockId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<Arc<LockDevice>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<LockDevice>>>> {
        self.snapshot.subscribe()
    }

    /// Record one bolt-state transition.
    pub fn note_state_change(&self) -> u64 {
        self.change_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn change_count(&self) -> u64 {
        self.change_counter.load(Ordering::Relaxed)
    }

    fn rebuild_snapshot(&self) {
        let values: Vec<Arc<LockDevice>> =
            self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}
