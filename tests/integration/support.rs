//! Process table and host fakes built on the public capability traits.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use infermon::core::backend_monitor::{BackendMonitor, CpuTicks, HostCpuTicks, PortResolver, ProcessSource};
use infermon::core::system_monitor::{HostSource, ThermalState};
use parking_lot::Mutex;

pub const MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default)]
struct Entry {
    path: String,
    parent: Option<u32>,
    footprint: u64,
    args: Vec<String>,
    ticks: CpuTicks,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessTable {
    entries: Arc<Mutex<BTreeMap<u32, Entry>>>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(self, pid: u32, path: &str, parent: u32, memory_mb: u64) -> Self {
        self.entries.lock().insert(
            pid,
            Entry {
                path: path.to_string(),
                parent: Some(parent),
                footprint: memory_mb * MB,
                ..Default::default()
            },
        );
        self
    }

    pub fn argv(self, pid: u32, args: &[&str]) -> Self {
        if let Some(entry) = self.entries.lock().get_mut(&pid) {
            entry.args = args.iter().map(|a| a.to_string()).collect();
        }
        self
    }

    pub fn burn(&self, pid: u32, ticks: u64) {
        if let Some(entry) = self.entries.lock().get_mut(&pid) {
            entry.ticks.user += ticks;
        }
    }

    pub fn exit(&self, pid: u32) {
        self.entries.lock().remove(&pid);
    }

    pub fn monitor(&self, ports: PortTable, ttl: Duration) -> BackendMonitor {
        BackendMonitor::new(Box::new(self.clone()), Box::new(ports), ttl)
    }
}

impl ProcessSource for ProcessTable {
    fn refresh(&mut self) {}

    fn pids(&self) -> Vec<u32> {
        self.entries.lock().keys().copied().collect()
    }

    fn executable_path(&self, pid: u32) -> Option<String> {
        self.entries.lock().get(&pid).map(|e| e.path.clone())
    }

    fn parent_pid(&self, pid: u32) -> Option<u32> {
        self.entries.lock().get(&pid).and_then(|e| e.parent)
    }

    fn footprint_bytes(&self, pid: u32) -> Option<u64> {
        self.entries.lock().get(&pid).map(|e| e.footprint)
    }

    fn resident_bytes(&self, pid: u32) -> Option<u64> {
        self.entries.lock().get(&pid).map(|e| e.footprint / 2)
    }

    fn cpu_ticks(&self, pid: u32) -> Option<CpuTicks> {
        self.entries.lock().get(&pid).map(|e| e.ticks)
    }

    fn ticks_per_second(&self) -> f64 {
        100.0
    }

    fn arguments(&self, pid: u32) -> Option<Vec<String>> {
        self.entries
            .lock()
            .get(&pid)
            .map(|e| e.args.clone())
            .filter(|args| !args.is_empty())
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.entries.lock().contains_key(&pid)
    }

    fn active_cores(&self) -> usize {
        4
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortTable {
    listeners: BTreeMap<u16, u32>,
}

impl PortTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(mut self, port: u16, pid: u32) -> Self {
        self.listeners.insert(port, pid);
        self
    }
}

impl PortResolver for PortTable {
    fn listening_pid(&self, port: u16) -> Option<u32> {
        self.listeners.get(&port).copied()
    }
}

/// Host with constant readings
pub struct QuietHost {
    pub thermal: ThermalState,
}

impl HostSource for QuietHost {
    fn refresh(&mut self) {}

    fn cpu_ticks(&self) -> Option<HostCpuTicks> {
        None
    }

    fn cpu_usage_fallback(&self) -> f64 {
        25.0
    }

    fn memory(&self) -> (u64, u64) {
        (8 * 1024 * MB, 32 * 1024 * MB)
    }

    fn thermal_state(&self) -> ThermalState {
        self.thermal
    }
}
