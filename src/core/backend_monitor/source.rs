//! OS capabilities the backend monitor consumes.
//!
//! These traits abstract process-table access and port lookup so the detection
//! and accounting engine can run against the live host or an in-memory table.
//! Implementations for the live host are provided in the platform layer.

/// Cumulative CPU time of a single process, in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTicks {
    pub user: u64,
    pub system: u64,
}

impl CpuTicks {
    pub fn total(&self) -> u64 {
        self.user.saturating_add(self.system)
    }
}

/// Read access to the process table.
///
/// Every read is best-effort: a missing process or a denied query yields
/// `None` rather than an error.
pub trait ProcessSource: Send {
    /// Re-read the process table. Reads between two refreshes see the same state.
    ///
    /// Implementations may skip the reload when the table is recent.
    fn refresh(&mut self);

    /// Re-read the process table unconditionally
    fn force_refresh(&mut self) {
        self.refresh();
    }

    /// All process ids currently known
    fn pids(&self) -> Vec<u32>;

    fn executable_path(&self, pid: u32) -> Option<String>;

    fn parent_pid(&self, pid: u32) -> Option<u32>;

    /// Detailed footprint including accelerator/GPU allocations
    fn footprint_bytes(&self, pid: u32) -> Option<u64>;

    /// Coarse resident set size
    fn resident_bytes(&self, pid: u32) -> Option<u64>;

    fn cpu_ticks(&self, pid: u32) -> Option<CpuTicks>;

    /// Clock ticks per second for values returned by [`ProcessSource::cpu_ticks`]
    fn ticks_per_second(&self) -> f64;

    /// Raw argument vector, including argv[0]
    fn arguments(&self, pid: u32) -> Option<Vec<String>>;

    /// Liveness probe that does not depend on the last refresh
    fn is_alive(&self, pid: u32) -> bool;

    /// Number of logical cores available for scheduling
    fn active_cores(&self) -> usize;
}

/// Resolves which process listens on a TCP port.
pub trait PortResolver: Send + Sync {
    /// Pid of the listener, or `None` when nothing listens or the lookup failed
    fn listening_pid(&self, port: u16) -> Option<u32>;
}
