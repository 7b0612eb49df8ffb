// ── Bridge abstraction ──
//
// Full lifecycle management for one account's lock bridge. Handles
// session establishment, the adaptive poll loop, command routing, and
// telemetry push into the accessory registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, Notify, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::DeviceCache;
use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::BridgeConfig;
use crate::directory::DeviceDirectory;
use crate::error::CoreError;
use crate::model::{LockDevice, LockId, LockState};
use crate::poll::{PollState, interval_duration};
use crate::reconcile::{CycleResult, Reconciler};
use crate::registry::AccessoryRegistry;
use crate::session::SessionManager;

const COMMAND_CHANNEL_SIZE: usize = 16;

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Stopped,
    Running,
}

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<BridgeInner>`. [`start()`](Self::start)
/// establishes a session, runs one immediate fetch cycle, then spawns
/// the adaptive poll loop and the command processor.
pub struct Bridge<D: DeviceDirectory, R: AccessoryRegistry> {
    inner: Arc<BridgeInner<D, R>>,
}

impl<D: DeviceDirectory, R: AccessoryRegistry> Clone for Bridge<D, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct BridgeInner<D: DeviceDirectory, R: AccessoryRegistry> {
    config: BridgeConfig,
    directory: D,
    registry: Arc<R>,
    cache: Arc<DeviceCache>,
    reconciler: Reconciler<R>,
    session: SessionManager,
    poll: std::sync::Mutex<PollState>,
    /// Whether the last cycle observed at least one valid device.
    /// Consulted by the session manager: while true the cached token
    /// is trusted, once false the next cycle re-authenticates.
    data_valid: AtomicBool,
    /// Wakes the armed poll timer early so countdown changes take
    /// effect before the old interval elapses.
    retune: Notify,
    state: watch::Sender<BridgeState>,
    cancel: CancellationToken,
    command_tx: Mutex<mpsc::Sender<CommandEnvelope>>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<D: DeviceDirectory, R: AccessoryRegistry> Bridge<D, R> {
    /// Create a new bridge. Does NOT poll -- call
    /// [`start()`](Self::start) to authenticate and begin the loop.
    pub fn new(config: BridgeConfig, directory: D, registry: R) -> Result<Self, CoreError> {
        config.validate()?;

        let cache = Arc::new(DeviceCache::new());
        let registry = Arc::new(registry);
        let reconciler = Reconciler::new(Arc::clone(&cache), Arc::clone(&registry));
        let session = SessionManager::new(
            config.identifier.clone(),
            config.password.clone(),
            config.install_id.clone(),
        );
        let poll = std::sync::Mutex::new(PollState::new(config.poll.budget()));
        let (state, _) = watch::channel(BridgeState::Stopped);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(BridgeInner {
                config,
                directory,
                registry,
                cache,
                reconciler,
                session,
                poll,
                data_valid: AtomicBool::new(false),
                retune: Notify::new(),
                state,
                cancel: CancellationToken::new(),
                command_tx: Mutex::new(command_tx),
                command_rx: Mutex::new(Some(command_rx)),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &Arc<DeviceCache> {
        &self.inner.cache
    }

    /// Current device snapshot (cheap `Arc` clone).
    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<LockDevice>>> {
        self.inner.cache.snapshot()
    }

    /// Subscribe to device snapshot changes.
    pub fn devices(&self) -> watch::Receiver<Arc<Vec<Arc<LockDevice>>>> {
        self.inner.cache.subscribe()
    }

    /// Subscribe to lifecycle state changes.
    pub fn state(&self) -> watch::Receiver<BridgeState> {
        self.inner.state.subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start the bridge.
    ///
    /// Authenticates, runs one immediate fetch cycle (so callers see a
    /// populated cache), then spawns the poll loop and the command
    /// processor. The initial cycle's failure is fatal here -- later
    /// cycle failures only feed the poller's backoff.
    pub async fn start(&self) -> Result<(), CoreError> {
        self.run_cycle().await;
        if !self.inner.data_valid.load(Ordering::Relaxed) && self.inner.cache.is_empty() {
            // Distinguish "no locks on the account" from "could not
            // even authenticate": probe the session once so bad
            // credentials fail fast instead of festering in the loop.
            self.inner
                .session
                .ensure(&self.inner.directory, false)
                .await?;
        }

        let mut handles = self.inner.task_handles.lock().await;

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let bridge = self.clone();
            handles.push(tokio::spawn(command_processor_task(bridge, rx)));
        }

        let bridge = self.clone();
        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(poll_task(bridge, cancel)));

        let _ = self.inner.state.send(BridgeState::Running);
        info!(locks = self.inner.cache.len(), "bridge started");
        Ok(())
    }

    /// Stop the bridge: cancel background tasks and join them.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        let _ = self.inner.state.send(BridgeState::Stopped);
        debug!("bridge stopped");
    }

    /// Cancel the armed poll timer and immediately re-arm it from the
    /// current countdown state.
    pub fn retune(&self) {
        self.inner.retune.notify_one();
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command against the bridge.
    ///
    /// Routed through the internal channel to the command processor so
    /// commands serialize in arrival order.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        if *self.inner.state.borrow() != BridgeState::Running {
            return Err(CoreError::Disconnected);
        }

        let (tx, rx) = oneshot::channel();
        let command_tx = self.inner.command_tx.lock().await.clone();
        command_tx
            .send(CommandEnvelope {
                command,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::Disconnected)?;

        rx.await.map_err(|_| CoreError::Disconnected)?
    }

    /// Convenience wrapper for [`Command::SetLockState`].
    pub async fn set_lock_state(
        &self,
        id: LockId,
        desired: LockState,
    ) -> Result<CommandResult, CoreError> {
        self.execute(Command::SetLockState { id, desired }).await
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: start, run closure, stop. Optimized for single CLI
    /// invocations that need one populated fetch cycle.
    pub async fn oneshot<F, Fut, T>(
        config: BridgeConfig,
        directory: D,
        registry: R,
        f: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce(Bridge<D, R>) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let bridge = Bridge::new(config, directory, registry)?;
        bridge.start().await?;
        let result = f(bridge.clone()).await;
        bridge.stop().await;
        result
    }

    // ── Fetch cycle ──────────────────────────────────────────────

    /// Run one fetch cycle if none is in flight.
    ///
    /// Never returns an error: cycle outcomes feed the poll state
    /// machine and are reported as a single log line.
    async fn run_cycle(&self) {
        {
            let mut poll = self.inner.poll.lock().expect("poll lock poisoned");
            if !poll.begin_cycle() {
                debug!("fetch cycle already pending, tick dropped");
                return;
            }
        }

        let result = self.fetch_cycle().await;

        // Bookkeeping under the poll lock happens in this block; the
        // guard must be released before the session await below or the
        // spawned future is not `Send`.
        let failure = {
            let mut poll = self.inner.poll.lock().expect("poll lock poisoned");
            poll.end_cycle();
            match result {
                Ok(cycle) => {
                    self.inner
                        .data_valid
                        .store(cycle.any_device_seen, Ordering::Relaxed);
                    if !cycle.malformed.is_empty() {
                        warn!(
                            count = cycle.malformed.len(),
                            records = cycle.malformed.join("; "),
                            "malformed device records skipped this cycle"
                        );
                    }
                    if cycle.any_state_changed {
                        poll.record_activity();
                    }
                    None
                }
                Err(e) => {
                    self.inner.data_valid.store(false, Ordering::Relaxed);
                    poll.record_failure();
                    Some(e)
                }
            }
        };

        match failure {
            None => {
                // Push fresh readings for every cached lock.
                for device in self.inner.cache.snapshot().iter() {
                    self.inner
                        .registry
                        .update_telemetry(&device.id, device.as_ref().into());
                }
            }
            Some(e) => {
                if e.is_auth_expired() {
                    self.inner.session.invalidate().await;
                }
                warn!(error = %e, "fetch cycle failed");
            }
        }
    }

    /// Authenticate if needed, list locks, fetch and reconcile each.
    ///
    /// Transport and auth failures abort the cycle; malformed records
    /// are collected and the loop continues with the next device.
    async fn fetch_cycle(&self) -> Result<CycleResult, CoreError> {
        let cache_valid = self.inner.data_valid.load(Ordering::Relaxed);
        self.inner
            .session
            .ensure(&self.inner.directory, cache_valid)
            .await?;

        let refs = self.inner.directory.list_locks().await?;
        debug!(locks = refs.len(), "directory listing fetched");

        let mut cycle = CycleResult::default();
        for (lock_id, _summary) in refs {
            let raw = self.inner.directory.get_lock(&lock_id).await?;
            match self.inner.reconciler.reconcile(&raw) {
                Ok(outcome) => cycle.absorb(outcome),
                Err(CoreError::MalformedRecord { field }) => {
                    cycle.malformed.push(format!("{lock_id}: missing {field}"));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(cycle)
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Adaptive poll loop: arm a timer from the countdown state, run a
/// cycle when it fires, re-arm. A retune wakes the armed timer early so
/// the next arming re-reads the countdown.
async fn poll_task<D: DeviceDirectory, R: AccessoryRegistry>(
    bridge: Bridge<D, R>,
    cancel: CancellationToken,
) {
    loop {
        let class = {
            let mut poll = bridge.inner.poll.lock().expect("poll lock poisoned");
            poll.next_interval()
        };
        let period = interval_duration(class, &bridge.inner.config.poll);
        debug!(cadence = %class, secs = period.as_secs(), "poll timer armed");

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = bridge.inner.retune.notified() => {
                debug!("poll timer retuned");
            }
            () = tokio::time::sleep(period) => {
                bridge.run_cycle().await;
            }
        }
    }
}

/// Process commands from the mpsc channel in arrival order.
async fn command_processor_task<D: DeviceDirectory, R: AccessoryRegistry>(
    bridge: Bridge<D, R>,
    mut rx: mpsc::Receiver<CommandEnvelope>,
) {
    let cancel = bridge.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&bridge, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

/// Route a command to the directory and apply its poll/cache policy.
///
/// Success accelerates polling so the commanded state is confirmed
/// quickly. Failure means the lock likely dropped off the bridge: the
/// cache entry is evicted and the accessory unregistered until a
/// successful fetch re-creates it.
async fn route_command<D: DeviceDirectory, R: AccessoryRegistry>(
    bridge: &Bridge<D, R>,
    command: Command,
) -> Result<CommandResult, CoreError> {
    match command {
        Command::SetLockState { id, desired } => {
            let Some(op) = desired.operation() else {
                return Err(CoreError::InvalidCommand {
                    message: format!("cannot drive {id} to state {desired}"),
                });
            };

            match bridge.inner.directory.remote_operate(id.as_str(), op).await {
                Ok(ack) => {
                    info!(lock = %id, operation = %op, "remote operation accepted");
                    {
                        let mut poll = bridge.inner.poll.lock().expect("poll lock poisoned");
                        poll.record_activity();
                    }
                    bridge.retune();
                    Ok(CommandResult::Operated { status: ack.status })
                }
                Err(e) => {
                    warn!(lock = %id, operation = %op, error = %e, "remote operation failed, evicting lock");
                    bridge.inner.cache.remove(&id);
                    bridge.inner.registry.unregister(&id);
                    Err(e.into())
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::PollConfig;
    use crate::model::{AccessoryDescriptor, Telemetry};
    use latchkey_api::{Error as ApiError, LockOperation, LockSummary, OperateAck, RawLockRecord, Session};
    use secrecy::SecretString;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicU32;

    // ── Test doubles ────────────────────────────────────────────

    #[derive(Default)]
    struct FakeDirectory {
        records: StdMutex<HashMap<String, RawLockRecord>>,
        auth_calls: AtomicU32,
        list_calls: AtomicU32,
        fail_list: AtomicBool,
        fail_operate: AtomicBool,
    }

    impl FakeDirectory {
        fn with_lock(id: &str, status: &str, battery: f64) -> Self {
            let dir = Self::default();
            dir.put_lock(id, status, battery);
            dir
        }

        fn put_lock(&self, id: &str, status: &str, battery: f64) {
            let raw: RawLockRecord = serde_json::from_value(serde_json::json!({
                "LockID": id,
                "LockName": "Front Door",
                "Bridge": { "_id": "b1" },
                "LockStatus": { "status": status },
                "battery": battery,
            }))
            .unwrap();
            self.records.lock().unwrap().insert(id.to_string(), raw);
        }
    }

    impl DeviceDirectory for FakeDirectory {
        async fn authenticate(
            &self,
            _identifier: &str,
            _password: &SecretString,
            _install_id: &str,
        ) -> Result<Session, ApiError> {
            self.auth_calls.fetch_add(1, Ordering::Relaxed);
            Ok(Session {
                token: SecretString::from("tok".to_string()),
                user_id: "u1".into(),
            })
        }

        async fn list_locks(&self) -> Result<Vec<(String, LockSummary)>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::Relaxed);
            if self.fail_list.load(Ordering::Relaxed) {
                return Err(ApiError::Api {
                    status: 500,
                    message: "boom".into(),
                });
            }
            Ok(self
                .records
                .lock()
                .unwrap()
                .keys()
                .map(|id| {
                    let summary: LockSummary =
                        serde_json::from_value(serde_json::json!({ "LockName": "Front Door" }))
                            .unwrap();
                    (id.clone(), summary)
                })
                .collect())
        }

        async fn get_lock(&self, lock_id: &str) -> Result<RawLockRecord, ApiError> {
            self.records
                .lock()
                .unwrap()
                .get(lock_id)
                .cloned()
                .ok_or(ApiError::Api {
                    status: 404,
                    message: "no such lock".into(),
                })
        }

        async fn remote_operate(
            &self,
            _lock_id: &str,
            _op: LockOperation,
        ) -> Result<OperateAck, ApiError> {
            if self.fail_operate.load(Ordering::Relaxed) {
                return Err(ApiError::Api {
                    status: 502,
                    message: "bridge offline".into(),
                });
            }
            Ok(OperateAck { status: None })
        }
    }

    #[derive(Default)]
    struct RecordingRegistry {
        registered: StdMutex<Vec<String>>,
        unregistered: StdMutex<Vec<String>>,
        telemetry: StdMutex<Vec<(String, Telemetry)>>,
    }

    impl AccessoryRegistry for RecordingRegistry {
        fn register(&self, descriptor: AccessoryDescriptor) {
            self.registered
                .lock()
                .unwrap()
                .push(descriptor.id.to_string());
        }

        fn unregister(&self, id: &LockId) {
            self.unregistered.lock().unwrap().push(id.to_string());
        }

        fn update_telemetry(&self, id: &LockId, telemetry: Telemetry) {
            self.telemetry
                .lock()
                .unwrap()
                .push((id.to_string(), telemetry));
        }
    }

    fn config() -> BridgeConfig {
        BridgeConfig {
            url: "https://cloud.example".parse().unwrap(),
            identifier: "me@example.com".into(),
            password: SecretString::from("pw".to_string()),
            api_key: "key".into(),
            install_id: "install".into(),
            poll: PollConfig {
                short_interval_secs: 5,
                long_interval_secs: 300,
                short_duration_secs: 15,
            },
            timeout: std::time::Duration::from_secs(30),
        }
    }

    // ── Tests ───────────────────────────────────────────────────

    #[tokio::test]
    async fn start_runs_an_immediate_cycle_and_populates_cache() {
        let bridge = Bridge::new(
            config(),
            FakeDirectory::with_lock("A", "locked", 0.87),
            RecordingRegistry::default(),
        )
        .unwrap();

        bridge.start().await.unwrap();

        let snapshot = bridge.devices_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].battery_pct, 87);
        assert_eq!(snapshot[0].state, LockState::Locked);
        assert_eq!(*bridge.state().borrow(), BridgeState::Running);

        bridge.stop().await;
        assert_eq!(*bridge.state().borrow(), BridgeState::Stopped);
    }

    #[tokio::test]
    async fn bad_credentials_fail_start() {
        struct RejectingDirectory;
        impl DeviceDirectory for RejectingDirectory {
            async fn authenticate(
                &self,
                _identifier: &str,
                _password: &SecretString,
                _install_id: &str,
            ) -> Result<Session, ApiError> {
                Err(ApiError::Authentication {
                    message: "invalid credentials".into(),
                })
            }
            async fn list_locks(&self) -> Result<Vec<(String, LockSummary)>, ApiError> {
                unreachable!("listing requires a session")
            }
            async fn get_lock(&self, _lock_id: &str) -> Result<RawLockRecord, ApiError> {
                unreachable!("fetch requires a session")
            }
            async fn remote_operate(
                &self,
                _lock_id: &str,
                _op: LockOperation,
            ) -> Result<OperateAck, ApiError> {
                unreachable!("operate requires a session")
            }
        }

        let bridge = Bridge::new(config(), RejectingDirectory, RecordingRegistry::default())
            .unwrap();
        let err = bridge.start().await.unwrap_err();
        assert!(err.is_auth_expired(), "expected auth failure, got: {err:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn command_success_forces_short_cadence() {
        let bridge = Bridge::new(
            config(),
            FakeDirectory::with_lock("A", "locked", 0.87),
            RecordingRegistry::default(),
        )
        .unwrap();
        bridge.start().await.unwrap();

        // Settled state: the armed timer is LONG (300s).
        let calls_before = bridge.inner.directory.list_calls.load(Ordering::Relaxed);

        let result = bridge
            .set_lock_state(LockId::new("A"), LockState::Locked)
            .await
            .unwrap();
        assert!(matches!(result, CommandResult::Operated { .. }));

        // The retune rearms at SHORT; well before the LONG interval
        // elapses, another cycle must have run.
        tokio::time::sleep(std::time::Duration::from_secs(12)).await;
        let calls_after = bridge.inner.directory.list_calls.load(Ordering::Relaxed);
        assert!(
            calls_after > calls_before,
            "expected accelerated polling after command ({calls_before} -> {calls_after})"
        );

        bridge.stop().await;
    }

    #[tokio::test]
    async fn command_failure_evicts_and_unregisters_once() {
        let directory = FakeDirectory::with_lock("A", "locked", 0.87);
        directory.fail_operate.store(true, Ordering::Relaxed);
        let bridge =
            Bridge::new(config(), directory, RecordingRegistry::default()).unwrap();
        bridge.start().await.unwrap();
        assert_eq!(bridge.cache().len(), 1);

        let err = bridge
            .set_lock_state(LockId::new("A"), LockState::Locked)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Api(_)));

        assert!(bridge.cache().is_empty());
        assert_eq!(
            *bridge.inner.registry.unregistered.lock().unwrap(),
            vec!["A".to_string()]
        );

        bridge.stop().await;
    }

    #[tokio::test]
    async fn unknown_target_state_is_rejected_without_side_effects() {
        let bridge = Bridge::new(
            config(),
            FakeDirectory::with_lock("A", "locked", 0.87),
            RecordingRegistry::default(),
        )
        .unwrap();
        bridge.start().await.unwrap();

        let err = bridge
            .set_lock_state(LockId::new("A"), LockState::Unknown)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidCommand { .. }));
        assert_eq!(bridge.cache().len(), 1);

        bridge.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cycle_gets_one_short_retry() {
        let bridge = Bridge::new(
            config(),
            FakeDirectory::with_lock("A", "locked", 0.87),
            RecordingRegistry::default(),
        )
        .unwrap();
        bridge.start().await.unwrap();

        // Break the directory, let the LONG tick fail, then heal it.
        bridge.inner.directory.fail_list.store(true, Ordering::Relaxed);
        tokio::time::sleep(std::time::Duration::from_secs(301)).await;
        bridge.inner.directory.fail_list.store(false, Ordering::Relaxed);

        // The retry must land within one SHORT interval, not a LONG one.
        let calls_before = bridge.inner.directory.list_calls.load(Ordering::Relaxed);
        tokio::time::sleep(std::time::Duration::from_secs(6)).await;
        let calls_after = bridge.inner.directory.list_calls.load(Ordering::Relaxed);
        assert!(
            calls_after > calls_before,
            "expected a SHORT-cadence retry after a failed cycle"
        );

        bridge.stop().await;
    }

    #[tokio::test]
    async fn state_change_marks_cycle_and_telemetry_is_pushed() {
        let bridge = Bridge::new(
            config(),
            FakeDirectory::with_lock("A", "locked", 0.87),
            RecordingRegistry::default(),
        )
        .unwrap();
        bridge.start().await.unwrap();

        bridge.inner.directory.put_lock("A", "unlocked", 0.85);
        bridge.run_cycle().await;

        assert_eq!(bridge.cache().change_count(), 1);
        let telemetry = bridge.inner.registry.telemetry.lock().unwrap();
        let (_, last) = telemetry.last().unwrap();
        assert_eq!(last.state, LockState::Unlocked);
        assert_eq!(last.battery_pct, 85);

        drop(telemetry);
        bridge.stop().await;
    }
}
