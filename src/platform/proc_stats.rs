//! Linux `/proc` readings through the `procfs` crate.

use procfs::process::Process;
use procfs::{CpuTime, CurrentSI, KernelStats};

use crate::core::backend_monitor::{CpuTicks, HostCpuTicks};

fn process(pid: u32) -> Option<Process> {
    let pid = i32::try_from(pid).ok().filter(|p| *p > 0)?;
    Process::new(pid).ok()
}

/// utime and stime of one process, in clock ticks
pub fn read_stat_ticks(pid: u32) -> Option<CpuTicks> {
    let stat = process(pid)?.stat().ok()?;
    Some(CpuTicks {
        user: stat.utime,
        system: stat.stime,
    })
}

/// Resident plus swapped-out bytes summed over the `smaps_rollup` entry
pub fn read_smaps_rollup(pid: u32) -> Option<u64> {
    let rollup = process(pid)?.smaps_rollup().ok()?;

    let mut rss = None;
    let mut swap = 0u64;
    for map in rollup.memory_map_rollup.iter() {
        let stats = &map.extension.map;
        if let Some(bytes) = stats.get("Rss") {
            *rss.get_or_insert(0u64) += bytes;
        }
        swap += stats.get("Swap").copied().unwrap_or(0);
    }
    rss.map(|rss| rss + swap)
}

/// Aggregate host CPU time since boot
pub fn read_host_ticks() -> Option<HostCpuTicks> {
    let stats = KernelStats::current().ok()?;
    Some(host_ticks(&stats.total))
}

/// Idle time is idle plus iowait; guest time is already part of user.
fn host_ticks(cpu: &CpuTime) -> HostCpuTicks {
    let idle = cpu.idle + cpu.iowait.unwrap_or(0);
    let busy = cpu.user
        + cpu.nice
        + cpu.system
        + cpu.irq.unwrap_or(0)
        + cpu.softirq.unwrap_or(0)
        + cpu.steal.unwrap_or(0);

    HostCpuTicks {
        busy,
        total: busy + idle,
    }
}

pub fn clock_ticks_per_second() -> f64 {
    match procfs::ticks_per_second() {
        0 => 100.0,
        ticks => ticks as f64,
    }
}
