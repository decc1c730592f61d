//! Live process table backed by sysinfo.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use sysinfo::{
    CpuRefreshKind, Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System, UpdateKind,
};

use crate::core::backend_monitor::{CpuTicks, ProcessSource};

#[cfg(target_os = "linux")]
use super::proc_stats;

/// Avoid back-to-back full process refreshes when several operations run in
/// the same polling cycle.
const MIN_PROCESS_REFRESH_INTERVAL: Duration = Duration::from_millis(750);

pub struct SysinfoProcessSource {
    system: System,
    last_refresh: Option<Instant>,
    gpu_memory: HashMap<u32, u64>,
    ticks_per_second: f64,
}

impl SysinfoProcessSource {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing()),
        );

        let mut source = Self {
            system,
            last_refresh: None,
            gpu_memory: HashMap::new(),
            ticks_per_second: ticks_per_second(),
        };
        source.refresh();
        source
    }

    fn process(&self, pid: u32) -> Option<&sysinfo::Process> {
        self.system.process(Pid::from_u32(pid))
    }
}

impl Default for SysinfoProcessSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SysinfoProcessSource {
    fn refresh(&mut self) {
        if self
            .last_refresh
            .is_some_and(|at| at.elapsed() < MIN_PROCESS_REFRESH_INTERVAL)
        {
            log::trace!(
                "Skipping process refresh (last refresh < {:?})",
                MIN_PROCESS_REFRESH_INTERVAL
            );
            return;
        }
        self.force_refresh();
    }

    fn force_refresh(&mut self) {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_memory()
                .with_cpu()
                .with_exe(UpdateKind::OnlyIfNotSet)
                .with_cmd(UpdateKind::OnlyIfNotSet),
        );
        self.gpu_memory = super::gpu::process_gpu_memory();
        self.last_refresh = Some(Instant::now());
    }

    fn pids(&self) -> Vec<u32> {
        self.system
            .processes()
            .iter()
            // Linux threads show up as processes; only keep the leaders
            .filter(|(_, p)| p.thread_kind().is_none())
            .map(|(pid, _)| pid.as_u32())
            .collect()
    }

    fn executable_path(&self, pid: u32) -> Option<String> {
        self.process(pid)?
            .exe()
            .map(|p| p.to_string_lossy().to_string())
    }

    fn parent_pid(&self, pid: u32) -> Option<u32> {
        self.process(pid)?.parent().map(|p| p.as_u32())
    }

    fn footprint_bytes(&self, pid: u32) -> Option<u64> {
        #[cfg(target_os = "linux")]
        let base = proc_stats::read_smaps_rollup(pid);
        #[cfg(not(target_os = "linux"))]
        let base: Option<u64> = None;

        let gpu = self.gpu_memory.get(&pid).copied();
        match (base, gpu) {
            (Some(bytes), gpu) => Some(bytes + gpu.unwrap_or(0)),
            (None, Some(gpu)) => self.resident_bytes(pid).map(|r| r + gpu),
            (None, None) => None,
        }
    }

    fn resident_bytes(&self, pid: u32) -> Option<u64> {
        self.process(pid).map(|p| p.memory())
    }

    fn cpu_ticks(&self, pid: u32) -> Option<CpuTicks> {
        #[cfg(target_os = "linux")]
        {
            proc_stats::read_stat_ticks(pid)
        }
        #[cfg(not(target_os = "linux"))]
        {
            // Accumulated milliseconds, reported as user time at 1000 ticks/s
            self.process(pid).map(|p| CpuTicks {
                user: p.accumulated_cpu_time(),
                system: 0,
            })
        }
    }

    fn ticks_per_second(&self) -> f64 {
        self.ticks_per_second
    }

    fn arguments(&self, pid: u32) -> Option<Vec<String>> {
        let cmd = self.process(pid)?.cmd();
        if cmd.is_empty() {
            return None;
        }
        Some(cmd.iter().map(|a| a.to_string_lossy().to_string()).collect())
    }

    fn is_alive(&self, pid: u32) -> bool {
        #[cfg(unix)]
        {
            // pid 0 would address our own process group
            let raw = match libc::pid_t::try_from(pid) {
                Ok(raw) if raw > 0 => raw,
                _ => return false,
            };
            // SAFETY: signal 0 performs the permission and existence check only
            let rc = unsafe { libc::kill(raw, 0) };
            rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
        }
        #[cfg(not(unix))]
        {
            self.process(pid).is_some()
        }
    }

    fn active_cores(&self) -> usize {
        self.system.cpus().len().max(1)
    }
}

#[cfg(target_os = "linux")]
fn ticks_per_second() -> f64 {
    proc_stats::clock_ticks_per_second()
}

#[cfg(not(target_os = "linux"))]
fn ticks_per_second() -> f64 {
    1000.0
}
