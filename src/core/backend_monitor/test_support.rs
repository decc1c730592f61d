//! In-memory process table for unit tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;

use super::source::{CpuTicks, PortResolver, ProcessSource};

pub const MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default)]
struct FakeProcess {
    path: String,
    parent: Option<u32>,
    footprint: Option<u64>,
    resident: Option<u64>,
    args: Option<Vec<String>>,
    ticks: Option<CpuTicks>,
}

#[derive(Debug, Default)]
struct FakeState {
    processes: BTreeMap<u32, FakeProcess>,
    refreshes: usize,
    forced_refreshes: usize,
    /// Plain refreshes keep exited processes in the table, like a rate-limited live source
    throttled: bool,
    exited: BTreeSet<u32>,
}

impl FakeState {
    fn reap(&mut self) {
        for pid in std::mem::take(&mut self.exited) {
            self.processes.remove(&pid);
        }
    }
}

/// Cloneable handle; clones share the same table so tests can mutate it
/// after handing a box to the monitor.
#[derive(Debug, Clone, Default)]
pub struct FakeProcessSource {
    state: Arc<Mutex<FakeState>>,
}

impl FakeProcessSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(self, pid: u32, path: &str, parent: Option<u32>, memory_mb: u64) -> Self {
        self.state.lock().processes.insert(
            pid,
            FakeProcess {
                path: path.to_string(),
                parent,
                footprint: Some(memory_mb * MB),
                resident: Some(memory_mb * MB / 2),
                ..Default::default()
            },
        );
        self
    }

    pub fn with_args(self, pid: u32, args: &[&str]) -> Self {
        if let Some(p) = self.state.lock().processes.get_mut(&pid) {
            p.args = Some(args.iter().map(|a| a.to_string()).collect());
        }
        self
    }

    /// Detailed query fails; only the coarse resident value is readable
    pub fn with_resident_only(self, pid: u32, resident: Option<u64>) -> Self {
        if let Some(p) = self.state.lock().processes.get_mut(&pid) {
            p.footprint = None;
            p.resident = resident;
        }
        self
    }

    pub fn set_ticks(&self, pid: u32, user: u64, system: u64) {
        if let Some(p) = self.state.lock().processes.get_mut(&pid) {
            p.ticks = Some(CpuTicks { user, system });
        }
    }

    /// Only a forced refresh drops exited processes from the table
    pub fn throttled(self) -> Self {
        self.state.lock().throttled = true;
        self
    }

    pub fn kill(&self, pid: u32) {
        let mut state = self.state.lock();
        if state.throttled {
            state.exited.insert(pid);
        } else {
            state.processes.remove(&pid);
        }
    }

    pub fn refreshes(&self) -> usize {
        self.state.lock().refreshes
    }

    pub fn forced_refreshes(&self) -> usize {
        self.state.lock().forced_refreshes
    }
}

impl ProcessSource for FakeProcessSource {
    fn refresh(&mut self) {
        let mut state = self.state.lock();
        state.refreshes += 1;
        if !state.throttled {
            state.reap();
        }
    }

    fn force_refresh(&mut self) {
        let mut state = self.state.lock();
        state.refreshes += 1;
        state.forced_refreshes += 1;
        state.reap();
    }

    fn pids(&self) -> Vec<u32> {
        self.state.lock().processes.keys().copied().collect()
    }

    fn executable_path(&self, pid: u32) -> Option<String> {
        self.state.lock().processes.get(&pid).map(|p| p.path.clone())
    }

    fn parent_pid(&self, pid: u32) -> Option<u32> {
        self.state.lock().processes.get(&pid).and_then(|p| p.parent)
    }

    fn footprint_bytes(&self, pid: u32) -> Option<u64> {
        self.state.lock().processes.get(&pid).and_then(|p| p.footprint)
    }

    fn resident_bytes(&self, pid: u32) -> Option<u64> {
        self.state.lock().processes.get(&pid).and_then(|p| p.resident)
    }

    fn cpu_ticks(&self, pid: u32) -> Option<CpuTicks> {
        self.state.lock().processes.get(&pid).and_then(|p| p.ticks)
    }

    fn ticks_per_second(&self) -> f64 {
        100.0
    }

    fn arguments(&self, pid: u32) -> Option<Vec<String>> {
        self.state.lock().processes.get(&pid).and_then(|p| p.args.clone())
    }

    fn is_alive(&self, pid: u32) -> bool {
        let state = self.state.lock();
        state.processes.contains_key(&pid) && !state.exited.contains(&pid)
    }

    fn active_cores(&self) -> usize {
        8
    }
}

/// Port table for unit tests
#[derive(Debug, Clone, Default)]
pub struct FakePortResolver {
    listeners: Arc<Mutex<BTreeMap<u16, u32>>>,
}

impl FakePortResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(self, port: u16, pid: u32) -> Self {
        self.listeners.lock().insert(port, pid);
        self
    }
}

impl PortResolver for FakePortResolver {
    fn listening_pid(&self, port: u16) -> Option<u32> {
        self.listeners.lock().get(&port).copied()
    }
}
