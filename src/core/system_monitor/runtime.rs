//! Background polling loop for metrics collection.
//!
//! The loop runs on the tokio runtime; each collection runs on the blocking
//! pool so process-table scans never stall async tasks. Cancellation is only
//! observed between collections, so a snapshot is never torn.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::core::config::MonitorConfig;
use crate::error::{InfermonError, Result};

use super::collector::MetricsCollector;
use super::history::MetricsHistory;
use super::metrics::{MetricsSnapshot, ThermalState};

/// Polling cadence and retention
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub history_capacity: usize,
    /// Interval multiplier while thermal pressure is serious or critical
    pub thermal_backoff_factor: u32,
}

impl PollerConfig {
    /// Delay before the next poll given the latest thermal state
    pub fn interval_for(&self, thermal: ThermalState) -> Duration {
        if thermal.is_elevated() {
            self.interval * self.thermal_backoff_factor.max(1)
        } else {
            self.interval
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

impl From<&MonitorConfig> for PollerConfig {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            history_capacity: config.history_capacity,
            thermal_backoff_factor: config.thermal_backoff_factor,
        }
    }
}

struct PollLoop {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// Periodic collector driver with a bounded snapshot history.
pub struct MetricsPoller {
    collector: Arc<Mutex<MetricsCollector>>,
    history: Arc<Mutex<MetricsHistory>>,
    snapshot_tx: watch::Sender<Option<Arc<MetricsSnapshot>>>,
    thermal_tx: watch::Sender<ThermalState>,
    collecting: Arc<AtomicBool>,
    config: PollerConfig,
    worker: tokio::sync::Mutex<Option<PollLoop>>,
}

impl MetricsPoller {
    pub fn new(collector: MetricsCollector, config: PollerConfig) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        let (thermal_tx, _) = watch::channel(ThermalState::default());

        Self {
            collector: Arc::new(Mutex::new(collector)),
            history: Arc::new(Mutex::new(MetricsHistory::with_capacity(config.history_capacity))),
            snapshot_tx,
            thermal_tx,
            collecting: Arc::new(AtomicBool::new(false)),
            config,
            worker: tokio::sync::Mutex::new(None),
        }
    }

    /// Receiver for every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<MetricsSnapshot>>> {
        self.snapshot_tx.subscribe()
    }

    /// Receiver notified when the thermal state changes
    pub fn thermal_updates(&self) -> watch::Receiver<ThermalState> {
        self.thermal_tx.subscribe()
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting.load(Ordering::SeqCst)
    }

    /// Start the polling loop. Returns `Ok(false)` if it is already running.
    pub async fn start(&self) -> Result<bool> {
        let mut worker = self.worker.lock().await;
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            return Ok(false);
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| InfermonError::runtime(format!("Poller needs a tokio runtime: {}", e)))?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        self.collecting.store(true, Ordering::SeqCst);

        let handle = runtime.spawn(poll_loop(
            Arc::clone(&self.collector),
            Arc::clone(&self.history),
            self.snapshot_tx.clone(),
            self.thermal_tx.clone(),
            Arc::clone(&self.collecting),
            self.config.clone(),
            shutdown_rx,
        ));

        log::info!("Metrics polling started (interval {:?})", self.config.interval);
        *worker = Some(PollLoop { shutdown_tx, handle });
        Ok(true)
    }

    /// Stop the polling loop, waiting for an in-flight collection to finish.
    pub async fn stop(&self) {
        let Some(poll_loop) = self.worker.lock().await.take() else {
            return;
        };

        // Fails only when the loop already exited
        let _ = poll_loop.shutdown_tx.send(());
        if let Err(e) = poll_loop.handle.await {
            log::error!("Metrics polling task failed: {}", e);
        }
        self.collecting.store(false, Ordering::SeqCst);
        log::info!("Metrics polling stopped");
    }

    /// Latest published snapshot while polling; otherwise a fresh collection.
    pub async fn sample_once(&self) -> Result<MetricsSnapshot> {
        if self.is_collecting() {
            if let Some(latest) = self.snapshot_tx.borrow().as_ref() {
                return Ok(latest.as_ref().clone());
            }
        }

        let collector = Arc::clone(&self.collector);
        tokio::task::spawn_blocking(move || collector.lock().collect())
            .await
            .map_err(|e| InfermonError::runtime(format!("Collection task failed: {}", e)))
    }

    pub fn history(&self) -> Vec<MetricsSnapshot> {
        self.history.lock().snapshots()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Blocks while a collection is in flight
    pub fn reset_cpu_tracking(&self) {
        self.collector.lock().reset_cpu_tracking();
    }
}

async fn poll_loop(
    collector: Arc<Mutex<MetricsCollector>>,
    history: Arc<Mutex<MetricsHistory>>,
    snapshot_tx: watch::Sender<Option<Arc<MetricsSnapshot>>>,
    thermal_tx: watch::Sender<ThermalState>,
    collecting: Arc<AtomicBool>,
    config: PollerConfig,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        let worker = Arc::clone(&collector);
        let snapshot = match tokio::task::spawn_blocking(move || worker.lock().collect()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("Metrics collection panicked: {}", e);
                break;
            }
        };

        let thermal = snapshot.thermal_state;
        let snapshot = Arc::new(snapshot);
        snapshot_tx.send_replace(Some(Arc::clone(&snapshot)));
        history.lock().push(snapshot.as_ref().clone());

        thermal_tx.send_if_modified(|current| {
            if *current == thermal {
                return false;
            }
            log::info!("Thermal state changed: {} -> {}", current, thermal);
            *current = thermal;
            true
        });

        let delay = config.interval_for(thermal);
        log::trace!("Next poll in {:?}", delay);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.recv() => break,
        }
    }

    collecting.store(false, Ordering::SeqCst);
}
