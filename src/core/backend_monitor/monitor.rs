//! The single owner of detection, cache, override and CPU baseline state.
//!
//! Every operation takes the state lock for its whole duration, so scans and
//! cache updates never interleave. Port lookups spawn an external tool and
//! run before the lock is taken.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::cache::{BackendCache, Override};
use super::cpu::CpuSampler;
use super::detector::{Detection, ProcessDetector};
use super::memory::MemoryAccountant;
use super::process_index::ProcessIndex;
use super::source::{PortResolver, ProcessSource};
use super::types::{BackendSnapshot, BackendType, CandidateProcess};
use crate::core::config::MonitorConfig;
use crate::platform::{LsofPortResolver, SysinfoProcessSource};

struct MonitorState {
    source: Box<dyn ProcessSource>,
    cache: BackendCache,
    cpu: CpuSampler,
}

pub struct BackendMonitor {
    state: Mutex<MonitorState>,
    ports: Box<dyn PortResolver>,
    detector: ProcessDetector,
    accountant: MemoryAccountant,
}

impl BackendMonitor {
    pub fn new(source: Box<dyn ProcessSource>, ports: Box<dyn PortResolver>, cache_ttl: Duration) -> Self {
        Self {
            state: Mutex::new(MonitorState {
                source,
                cache: BackendCache::new(cache_ttl),
                cpu: CpuSampler::new(),
            }),
            ports,
            detector: ProcessDetector::new(),
            accountant: MemoryAccountant::new(),
        }
    }

    /// Monitor backed by the live process table and `lsof`
    pub fn system(config: &MonitorConfig) -> Self {
        Self::new(
            Box::new(SysinfoProcessSource::new()),
            Box::new(LsofPortResolver::new(config.port_lookup_timeout())),
            config.cache_ttl(),
        )
    }

    /// Every detected backend, at most one per type. Served from the cache
    /// while it is fresh.
    pub fn detect_backends(&self) -> Vec<BackendSnapshot> {
        let mut guard = self.state.lock();
        self.cached_or_scan(&mut guard).0
    }

    /// The backend to monitor: the override if one is set and alive,
    /// otherwise `preferred` or the highest-priority detected type.
    pub fn find_primary_backend(&self, preferred: Option<BackendType>) -> Option<BackendSnapshot> {
        let mut guard = self.state.lock();
        if let Some(snapshot) = self.resolve_override(&mut guard) {
            return Some(snapshot);
        }
        let (all, _) = self.cached_or_scan(&mut guard);
        BackendCache::select(&all, preferred)
    }

    /// Like [`BackendMonitor::find_primary_backend`], but memory and CPU are
    /// always read fresh rather than taken from the cached scan.
    pub fn measure_primary(&self, preferred: Option<BackendType>) -> Option<BackendSnapshot> {
        let mut guard = self.state.lock();
        if let Some(snapshot) = self.resolve_override(&mut guard) {
            return Some(snapshot);
        }

        let (all, scanned_now) = self.cached_or_scan(&mut guard);
        let selected = BackendCache::select(&all, preferred)?;
        if scanned_now {
            return Some(selected);
        }

        let state = &mut *guard;
        state.source.refresh();
        let index = ProcessIndex::capture(state.source.as_ref());
        Some(self.measure(state, &index, selected.pid, selected.backend_type, &selected.name, false))
    }

    /// Identify the process listening on `port`. Unrecognised listeners are
    /// reported as [`BackendType::Unknown`].
    pub fn find_process_on_port(&self, port: u16) -> Option<BackendSnapshot> {
        let pid = self.ports.listening_pid(port)?;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.source.refresh();
        let detection = self.detector.classify(pid, state.source.as_ref())?;
        let index = ProcessIndex::capture(state.source.as_ref());
        Some(self.measure_detection(state, &index, &detection, false))
    }

    /// Find the listener on `port` and install it as the override.
    ///
    /// For bundle-style backends the override targets the heaviest related
    /// process, since the listener is often a thin shell around a worker.
    pub fn auto_detect_by_port(&self, port: u16) -> Option<BackendSnapshot> {
        let pid = self.ports.listening_pid(port)?;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.source.refresh();
        let detection = self.detector.classify(pid, state.source.as_ref())?;
        let index = ProcessIndex::capture(state.source.as_ref());

        let (target, single_process_mode) = match self
            .accountant
            .heaviest_related(&index, state.source.as_ref(), pid)
        {
            Some((heaviest, _)) => (heaviest, true),
            None => (pid, false),
        };

        let manual = Override {
            pid: target,
            name: detection.name.clone(),
            backend_type: detection.backend_type,
            single_process_mode,
        };
        log::info!(
            "Port {} served by {} (pid {}), monitoring pid {}",
            port,
            detection.name,
            pid,
            target
        );
        state.cache.set_override(manual.clone());

        Some(self.measure(
            state,
            &index,
            manual.pid,
            manual.backend_type,
            &manual.name,
            manual.single_process_mode,
        ))
    }

    /// Monitor exactly `pid` until cleared or until it exits.
    pub fn set_custom_process(&self, pid: u32, name: &str) {
        self.set_custom_process_with_mode(pid, name, true);
    }

    pub fn set_custom_process_with_mode(&self, pid: u32, name: &str, single_process_mode: bool) {
        log::info!("Custom process set: {} (pid {})", name, pid);
        self.state.lock().cache.set_override(Override {
            pid,
            name: name.to_string(),
            backend_type: BackendType::Custom,
            single_process_mode,
        });
    }

    pub fn clear_custom_process(&self) {
        if let Some(previous) = self.state.lock().cache.clear_override() {
            log::info!("Custom process cleared (was pid {})", previous.pid);
        }
    }

    pub fn has_custom_process(&self) -> bool {
        self.state.lock().cache.has_override()
    }

    pub fn custom_process(&self) -> Option<Override> {
        self.state.lock().cache.manual().cloned()
    }

    /// Processes using at least `min_memory_bytes`, heaviest first. The
    /// calling process is never offered.
    pub fn list_candidate_processes(&self, min_memory_bytes: u64) -> Vec<CandidateProcess> {
        let own_pid = std::process::id();

        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.source.refresh();
        let index = ProcessIndex::capture(state.source.as_ref());

        let mut candidates: Vec<CandidateProcess> = index
            .records()
            .iter()
            .filter(|r| r.pid != own_pid && !r.executable_path.is_empty())
            .filter_map(|r| {
                let memory_bytes = self.accountant.memory_of(state.source.as_ref(), r.pid);
                (memory_bytes >= min_memory_bytes).then(|| CandidateProcess {
                    name: r.executable_name().to_string(),
                    record: r.clone(),
                    memory_bytes,
                })
            })
            .collect();

        candidates.sort_by(|a, b| b.memory_bytes.cmp(&a.memory_bytes).then(a.record.pid.cmp(&b.record.pid)));
        candidates
    }

    pub fn reset_cpu_tracking(&self) {
        self.state.lock().cpu.reset();
    }

    fn resolve_override(&self, state: &mut MonitorState) -> Option<BackendSnapshot> {
        let manual = state.cache.manual()?.clone();

        if !state.source.is_alive(manual.pid) {
            log::info!(
                "Custom process {} (pid {}) exited, clearing override",
                manual.name,
                manual.pid
            );
            state.cache.clear_override();
            state.cpu.forget(manual.pid);
            return None;
        }

        state.source.refresh();
        let index = if manual.single_process_mode {
            ProcessIndex::default()
        } else {
            ProcessIndex::capture(state.source.as_ref())
        };

        Some(self.measure(
            state,
            &index,
            manual.pid,
            manual.backend_type,
            &manual.name,
            manual.single_process_mode,
        ))
    }

    /// Cached scan when fresh, otherwise a new scan. The flag reports whether
    /// the returned snapshots were measured just now.
    fn cached_or_scan(&self, state: &mut MonitorState) -> (Vec<BackendSnapshot>, bool) {
        let source = &state.source;
        if let Some(hit) = state.cache.fresh(Instant::now(), |pid| source.is_alive(pid)) {
            log::trace!("Backend cache hit ({} entries)", hit.len());
            return (hit.to_vec(), false);
        }

        let snapshots = self.scan(state);
        log::debug!("Backend scan found {} backends", snapshots.len());
        state.cache.store(snapshots.clone(), Instant::now());
        (snapshots, true)
    }

    /// Full scan over a freshly read table. Runs when the cache is empty or
    /// invalid, which includes a cached pid having exited, so a throttled
    /// refresh could still list that pid.
    fn scan(&self, state: &mut MonitorState) -> Vec<BackendSnapshot> {
        state.source.force_refresh();
        let index = ProcessIndex::capture(state.source.as_ref());
        let detections: Vec<Detection> = self
            .detector
            .scan(&index, state.source.as_ref())
            .into_iter()
            .filter(|d| state.source.is_alive(d.pid))
            .collect();

        let snapshots: Vec<BackendSnapshot> = detections
            .iter()
            .map(|d| self.measure_detection(state, &index, d, false))
            .collect();

        let manual_pid = state.cache.manual().map(|m| m.pid);
        state
            .cpu
            .retain(|pid| manual_pid == Some(pid) || snapshots.iter().any(|s| s.pid == pid));

        snapshots
    }

    fn measure_detection(
        &self,
        state: &mut MonitorState,
        index: &ProcessIndex,
        detection: &Detection,
        single_process_mode: bool,
    ) -> BackendSnapshot {
        self.measure(
            state,
            index,
            detection.pid,
            detection.backend_type,
            &detection.name,
            single_process_mode,
        )
    }

    fn measure(
        &self,
        state: &mut MonitorState,
        index: &ProcessIndex,
        pid: u32,
        backend_type: BackendType,
        name: &str,
        single_process_mode: bool,
    ) -> BackendSnapshot {
        let source = state.source.as_ref();
        let memory_bytes = if single_process_mode {
            self.accountant.memory_of(source, pid)
        } else {
            self.accountant.aggregate(index, source, pid).total_bytes
        };

        BackendSnapshot {
            pid,
            backend_type,
            name: name.to_string(),
            memory_bytes,
            cpu_percent: state.cpu.percent(source, pid),
        }
    }
}
