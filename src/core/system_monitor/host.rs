use crate::core::backend_monitor::HostCpuTicks;

use super::metrics::ThermalState;

/// Host-wide readings that are not tied to a process.
/// Implementations are provided in the platform layer.
pub trait HostSource: Send {
    fn refresh(&mut self);

    /// Cumulative busy/total ticks, when the platform exposes them
    fn cpu_ticks(&self) -> Option<HostCpuTicks>;

    /// Host CPU usage computed by the platform itself, used when raw ticks are unavailable
    fn cpu_usage_fallback(&self) -> f64;

    /// (used, total) bytes of physical memory
    fn memory(&self) -> (u64, u64);

    fn thermal_state(&self) -> ThermalState;
}
