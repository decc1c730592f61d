//! Delta-based CPU usage from cumulative tick counters.

use std::collections::HashMap;
use std::time::Instant;

use super::source::{CpuTicks, ProcessSource};

#[derive(Debug, Clone, Copy)]
struct CpuBaseline {
    ticks: CpuTicks,
    at: Instant,
}

/// Per-process CPU percentage between consecutive reads.
///
/// The first read for a pid stores a baseline and reports 0. Every read
/// replaces the baseline, so each value covers only the time since the
/// previous read. Values are clamped to `[0, 100 × cores]`.
#[derive(Debug, Default)]
pub struct CpuSampler {
    baselines: HashMap<u32, CpuBaseline>,
}

impl CpuSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percent(&mut self, source: &dyn ProcessSource, pid: u32) -> f64 {
        let Some(ticks) = source.cpu_ticks(pid) else {
            self.baselines.remove(&pid);
            return 0.0;
        };
        self.observe(
            pid,
            ticks,
            Instant::now(),
            source.ticks_per_second(),
            source.active_cores(),
        )
    }

    /// Record a tick reading taken at `now` and return usage since the last one.
    pub fn observe(&mut self, pid: u32, ticks: CpuTicks, now: Instant, ticks_per_second: f64, cores: usize) -> f64 {
        let previous = self.baselines.insert(pid, CpuBaseline { ticks, at: now });
        let Some(previous) = previous else {
            return 0.0;
        };

        let elapsed = now.saturating_duration_since(previous.at).as_secs_f64();
        if elapsed <= 0.0 || ticks_per_second <= 0.0 {
            return 0.0;
        }

        let user = ticks.user.saturating_sub(previous.ticks.user);
        let system = ticks.system.saturating_sub(previous.ticks.system);
        let busy_secs = (user + system) as f64 / ticks_per_second;

        let ceiling = 100.0 * cores.max(1) as f64;
        (busy_secs / elapsed * 100.0).clamp(0.0, ceiling)
    }

    pub fn forget(&mut self, pid: u32) {
        self.baselines.remove(&pid);
    }

    /// Drop baselines of pids for which `keep` returns false
    pub fn retain(&mut self, keep: impl Fn(u32) -> bool) {
        self.baselines.retain(|pid, _| keep(*pid));
    }

    pub fn reset(&mut self) {
        self.baselines.clear();
    }

    pub fn tracked(&self) -> usize {
        self.baselines.len()
    }
}

/// Cumulative host-wide CPU time, in ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostCpuTicks {
    pub busy: u64,
    pub total: u64,
}

/// Host-wide CPU percentage between consecutive reads, in `[0, 100]`.
#[derive(Debug, Default)]
pub struct HostCpuSampler {
    baseline: Option<HostCpuTicks>,
}

impl HostCpuSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, ticks: HostCpuTicks) -> f64 {
        let Some(previous) = self.baseline.replace(ticks) else {
            return 0.0;
        };

        let total = ticks.total.saturating_sub(previous.total);
        if total == 0 {
            return 0.0;
        }
        let busy = ticks.busy.saturating_sub(previous.busy);
        (busy as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }

    pub fn reset(&mut self) {
        self.baseline = None;
    }
}
