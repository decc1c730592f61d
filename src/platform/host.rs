//! Host-wide readings backed by sysinfo and procfs.

use sysinfo::{Components, CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

use crate::core::backend_monitor::HostCpuTicks;
use crate::core::system_monitor::{HostSource, ThermalState};

/// Assumed critical temperature for sensors that do not report one
const DEFAULT_CRITICAL_CELSIUS: f32 = 100.0;

pub struct SysinfoHost {
    system: System,
    components: Components,
}

impl SysinfoHost {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());

        Self {
            system: System::new_with_specifics(refresh_kind),
            components: Components::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSource for SysinfoHost {
    fn refresh(&mut self) {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.components.refresh(true);
    }

    fn cpu_ticks(&self) -> Option<HostCpuTicks> {
        #[cfg(target_os = "linux")]
        {
            super::proc_stats::read_host_ticks()
        }
        #[cfg(not(target_os = "linux"))]
        {
            None
        }
    }

    fn cpu_usage_fallback(&self) -> f64 {
        self.system.global_cpu_usage() as f64
    }

    fn memory(&self) -> (u64, u64) {
        (self.system.used_memory(), self.system.total_memory())
    }

    fn thermal_state(&self) -> ThermalState {
        let readings: Vec<(f32, Option<f32>)> = self
            .components
            .iter()
            .filter_map(|c| c.temperature().map(|t| (t, c.critical())))
            .collect();
        thermal_from_readings(&readings)
    }
}

/// Classify the hottest sensor by its distance to its critical temperature.
pub fn thermal_from_readings(readings: &[(f32, Option<f32>)]) -> ThermalState {
    let hottest = readings
        .iter()
        .filter(|(temp, _)| temp.is_finite())
        .map(|&(temp, critical)| {
            let critical = critical
                .filter(|c| c.is_finite() && *c > 0.0)
                .unwrap_or(DEFAULT_CRITICAL_CELSIUS);
            temp / critical
        })
        .fold(0.0f32, f32::max);

    match hottest {
        r if r >= 0.95 => ThermalState::Critical,
        r if r >= 0.85 => ThermalState::Serious,
        r if r >= 0.70 => ThermalState::Fair,
        _ => ThermalState::Nominal,
    }
}
