//! Polling and reconciliation engine
//!
//! `StatusMonitor` drives the periodic query cycles: bay phase first
//! (chargers), then mic phase (receivers), then a merge of both into the
//! persistent per-microphone view. Each cycle carries an id; results of a
//! cycle that has been superseded are dropped instead of applied, so a slow
//! device can never overwrite fresher data.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use serde::Serialize;
use ssc_client::DeviceType;

use crate::client::DeviceClient;
use crate::device::DeviceInfo;
use crate::error::{MonitorError, Result};
use crate::registry::DeviceRegistry;
use crate::status::{ChargingBayStatus, MicState, MicStatus};

/// Timing knobs for the polling loop
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Pause between the end of one cycle and the start of the next
    pub poll_interval: Duration,
    /// Grace period before the first cycle after `start_monitoring`
    pub initial_delay: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            initial_delay: Duration::from_secs(1),
        }
    }
}

/// One published view of the whole system, updated at most once per phase
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub mic_statuses: Vec<MicStatus>,
    pub bay_statuses: Vec<ChargingBayStatus>,
    /// Whether a cycle is currently in flight
    pub is_updating: bool,
    /// False only when no registered device was reachable last cycle
    pub last_cycle_successful: bool,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            mic_statuses: Vec::new(),
            bay_statuses: Vec::new(),
            is_updating: false,
            last_cycle_successful: true,
        }
    }
}

#[derive(Default)]
struct MonitorState {
    cycle_id: u64,
    mic_statuses: BTreeMap<usize, MicStatus>,
    bay_statuses: Vec<ChargingBayStatus>,
    is_updating: bool,
    last_cycle_successful: bool,
    clients: HashMap<String, DeviceClient>,
    /// Devices already reported unreachable, to keep the log quiet across
    /// repeated failing cycles
    logged_unreachable: HashSet<String>,
    /// Bay and mic ids whose readings were already announced this cycle,
    /// reset when the next cycle starts
    logged_bay_ids: HashSet<usize>,
    logged_mic_ids: HashSet<usize>,
}

struct Inner {
    registry: Arc<dyn DeviceRegistry>,
    config: MonitorConfig,
    state: Mutex<MonitorState>,
    sender: watch::Sender<StatusSnapshot>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

/// Periodic poller publishing merged device state
///
/// Cheap to clone; clones drive the same engine.
#[derive(Clone)]
pub struct StatusMonitor {
    inner: Arc<Inner>,
}

impl StatusMonitor {
    pub fn new(registry: Arc<dyn DeviceRegistry>) -> Self {
        Self::with_config(registry, MonitorConfig::default())
    }

    pub fn with_config(registry: Arc<dyn DeviceRegistry>, config: MonitorConfig) -> Self {
        let (sender, _) = watch::channel(StatusSnapshot {
            last_cycle_successful: true,
            ..StatusSnapshot::default()
        });
        Self {
            inner: Arc::new(Inner {
                registry,
                config,
                state: Mutex::new(MonitorState {
                    last_cycle_successful: true,
                    ..MonitorState::default()
                }),
                sender,
                timer: Mutex::new(None),
            }),
        }
    }

    /// Subscribe to published snapshots
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.inner.sender.subscribe()
    }

    /// Most recently published snapshot
    pub fn latest_snapshot(&self) -> StatusSnapshot {
        self.inner.sender.borrow().clone()
    }

    /// Start the periodic polling loop
    ///
    /// Opens the UDP associations for every registered device up front, runs
    /// the first cycle after the initial delay, then polls on a fixed-rate
    /// timer. Ticks elapsing while a cycle is still running are skipped, not
    /// queued.
    pub fn start_monitoring(&self) -> Result<()> {
        let mut timer = self.inner.timer.lock();
        if timer.as_ref().map_or(false, |handle| !handle.is_finished()) {
            return Err(MonitorError::AlreadyRunning);
        }
        info!(
            interval = ?self.inner.config.poll_interval,
            "starting status monitoring"
        );
        let monitor = self.clone();
        *timer = Some(tokio::spawn(async move {
            sleep(monitor.inner.config.initial_delay).await;
            monitor.connect_clients().await;
            let mut ticker = interval(monitor.inner.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                monitor.poll_once().await;
            }
        }));
        Ok(())
    }

    async fn connect_clients(&self) {
        let devices = self.inner.registry.registered_devices();
        join_all(devices.iter().map(|device| {
            let client = self.client_for(device);
            async move {
                if let Err(e) = client.connect().await {
                    debug!(device = %client.device().name, error = %e, "pre-connect failed");
                }
            }
        }))
        .await;
    }

    /// Stop the polling loop, drop the device associations, and invalidate
    /// any cycle still in flight
    ///
    /// Published state is cleared; subscribers see an empty snapshot until
    /// monitoring is started again.
    pub fn stop_monitoring(&self) {
        if let Some(handle) = self.inner.timer.lock().take() {
            handle.abort();
            info!("status monitoring stopped");
        }
        let mut state = self.inner.state.lock();
        state.cycle_id += 1;
        state.is_updating = false;
        for client in state.clients.values() {
            client.disconnect();
        }
        state.clients.clear();
        state.mic_statuses.clear();
        state.bay_statuses.clear();
        state.logged_unreachable.clear();
        state.logged_bay_ids.clear();
        state.logged_mic_ids.clear();
        self.publish(&state);
    }

    /// Run one full query-and-merge cycle immediately
    pub async fn poll_once(&self) {
        let cycle = self.begin_cycle();
        if let Some(success) = self.run_cycle(cycle).await {
            self.finish_cycle(cycle, success);
        } else {
            debug!(cycle, "cycle superseded, results dropped");
        }
    }

    fn begin_cycle(&self) -> u64 {
        let mut state = self.inner.state.lock();
        state.cycle_id += 1;
        state.is_updating = true;
        // De-duplication is per cycle; every cycle announces its readings
        // once.
        state.logged_bay_ids.clear();
        state.logged_mic_ids.clear();
        self.publish(&state);
        state.cycle_id
    }

    async fn run_cycle(&self, cycle: u64) -> Option<bool> {
        let chargers = self.inner.registry.devices_by_type(DeviceType::Charger);
        let receivers = self.inner.registry.devices_by_type(DeviceType::Receiver);
        let total_devices = chargers.len() + receivers.len();
        let mut reachable_devices = 0usize;

        let bay_results = join_all(chargers.iter().map(|device| {
            let client = self.client_for(device);
            async move { (device, client.query_bay_status().await) }
        }))
        .await;

        let mut bays = Vec::new();
        for (device, result) in bay_results {
            match result {
                Ok(mut statuses) => {
                    reachable_devices += 1;
                    self.note_reachability(device, true);
                    bays.append(&mut statuses);
                }
                Err(e) => {
                    debug!(device = %device.name, error = %e, "bay query failed");
                    self.note_reachability(device, false);
                }
            }
        }
        if !self.apply_bays(cycle, bays) {
            return None;
        }

        let mic_results = join_all(receivers.iter().map(|device| {
            let client = self.client_for(device);
            async move {
                let mut statuses = Vec::new();
                let mut reachable = false;
                for channel in 1..=2u8 {
                    match client.query_mic_status(channel).await {
                        Ok(status) => {
                            reachable = true;
                            statuses.push(status);
                        }
                        Err(e) => {
                            debug!(device = %device.name, channel, error = %e, "mic query failed")
                        }
                    }
                }
                (device, reachable, statuses)
            }
        }))
        .await;

        let mut fresh = Vec::new();
        for (device, reachable, mut statuses) in mic_results {
            if reachable {
                reachable_devices += 1;
            }
            self.note_reachability(device, reachable);
            fresh.append(&mut statuses);
        }
        if !self.apply_mics(cycle, fresh) {
            return None;
        }

        Some(total_devices == 0 || reachable_devices > 0)
    }

    fn apply_bays(&self, cycle: u64, bays: Vec<ChargingBayStatus>) -> bool {
        let mut state = self.inner.state.lock();
        if state.cycle_id != cycle {
            return false;
        }
        for bay in bays.iter().filter(|bay| bay.has_device()) {
            if state.logged_bay_ids.insert(bay.id) {
                info!(
                    bay = bay.id,
                    occupant = %bay.device_type,
                    battery = bay.battery_percentage,
                    "charging bay occupied"
                );
            }
        }
        state.bay_statuses = bays;
        true
    }

    fn apply_mics(&self, cycle: u64, fresh: Vec<MicStatus>) -> bool {
        let mut state = self.inner.state.lock();
        if state.cycle_id != cycle {
            return false;
        }
        for mic in fresh.iter().filter(|mic| mic.battery_percentage > 0) {
            if state.logged_mic_ids.insert(mic.id) {
                info!(
                    mic = mic.id,
                    name = %mic.name,
                    battery = mic.battery_percentage,
                    "microphone reporting"
                );
            }
        }
        let merged = merge_mic_statuses(&state.mic_statuses, &fresh, &state.bay_statuses);
        state.mic_statuses = merged;
        true
    }

    fn finish_cycle(&self, cycle: u64, success: bool) {
        let mut state = self.inner.state.lock();
        if state.cycle_id != cycle {
            return;
        }
        state.is_updating = false;
        state.last_cycle_successful = success;
        if !success {
            warn!("no registered device reachable this cycle");
        }
        self.publish(&state);
    }

    fn client_for(&self, device: &DeviceInfo) -> DeviceClient {
        self.inner
            .state
            .lock()
            .clients
            .entry(device.ip_address.clone())
            .or_insert_with(|| DeviceClient::new(device.clone()))
            .clone()
    }

    fn note_reachability(&self, device: &DeviceInfo, reachable: bool) {
        let mut state = self.inner.state.lock();
        if reachable {
            if state.logged_unreachable.remove(&device.ip_address) {
                info!(device = %device.name, "device reachable again");
            }
        } else if state.logged_unreachable.insert(device.ip_address.clone()) {
            warn!(
                device = %device.name,
                ip = %device.ip_address,
                "device unreachable, keeping last known state"
            );
        }
    }

    fn publish(&self, state: &MonitorState) {
        self.inner.sender.send_replace(StatusSnapshot {
            mic_statuses: state.mic_statuses.values().cloned().collect(),
            bay_statuses: state.bay_statuses.clone(),
            is_updating: state.is_updating,
            last_cycle_successful: state.last_cycle_successful,
        });
    }
}

/// Merge one cycle's fresh readings into the persistent per-mic view
///
/// Priority per id: an occupied charging bay overrides everything; else a
/// receiver reading with positive battery is taken as-is, retaining the
/// previous positive runtime over a transient zero; else the previous entry
/// degrades to disconnected, keeping its last battery gauge. Ids never seen
/// with real data stay as empty placeholders.
fn merge_mic_statuses(
    previous: &BTreeMap<usize, MicStatus>,
    fresh: &[MicStatus],
    bays: &[ChargingBayStatus],
) -> BTreeMap<usize, MicStatus> {
    let bay_by_id: HashMap<usize, &ChargingBayStatus> = bays
        .iter()
        .filter(|bay| bay.has_device())
        .map(|bay| (bay.id, bay))
        .collect();
    let fresh_by_id: HashMap<usize, &MicStatus> =
        fresh.iter().map(|mic| (mic.id, mic)).collect();

    let mut ids: BTreeSet<usize> = previous.keys().copied().collect();
    ids.extend(bay_by_id.keys());
    ids.extend(fresh_by_id.keys());

    let mut merged = BTreeMap::new();
    for id in ids {
        let prev = previous.get(&id);
        let status = if let Some(bay) = bay_by_id.get(&id) {
            let mut status = prev.cloned().unwrap_or_else(|| MicStatus::empty(id));
            status.state = MicState::Charging;
            status.battery_percentage = bay.battery_percentage;
            status.signal_strength = 0;
            status.battery_runtime = 0;
            status.warning = false;
            status.source_device = bay.source_device.clone();
            status
        } else if let Some(mic) = fresh_by_id
            .get(&id)
            .copied()
            .filter(|mic| mic.battery_percentage > 0)
        {
            let mut status = mic.clone();
            if status.battery_runtime <= 0 {
                if let Some(prev) = prev.filter(|p| p.battery_runtime > 0) {
                    status.battery_runtime = prev.battery_runtime;
                }
            }
            status
        } else if let Some(prev) = prev {
            let mut status = prev.clone();
            status.set_disconnected();
            status
        } else {
            MicStatus::empty(id)
        };
        merged.insert(id, status);
    }
    merged
}
