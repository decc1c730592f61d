use std::sync::Arc;
use std::time::Duration;

use crate::core::backend_monitor::{BackendMonitor, BackendType, HostCpuSampler};
use crate::platform::gpu::get_hardware_sampler;
use crate::platform::SysinfoHost;

use super::hardware::{HardwareSample, HardwareSampler};
use super::host::HostSource;
use super::metrics::MetricsSnapshot;

/// Configuration for metrics collection
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Backend type to prefer when several are running
    pub preferred_backend: Option<BackendType>,
    /// Wait between the discarded priming read and the first real one
    pub priming_delay: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            preferred_backend: None,
            priming_delay: sysinfo::MINIMUM_CPU_UPDATE_INTERVAL,
        }
    }
}

/// Merges backend, host and hardware readings into one snapshot
pub struct MetricsCollector {
    monitor: Arc<BackendMonitor>,
    host: Box<dyn HostSource>,
    hardware: Option<Box<dyn HardwareSampler>>,
    host_cpu: HostCpuSampler,
    config: CollectorConfig,
    primed: bool,
}

impl MetricsCollector {
    pub fn new(
        monitor: Arc<BackendMonitor>,
        host: Box<dyn HostSource>,
        hardware: Option<Box<dyn HardwareSampler>>,
    ) -> Self {
        Self::with_config(monitor, host, hardware, CollectorConfig::default())
    }

    pub fn with_config(
        monitor: Arc<BackendMonitor>,
        host: Box<dyn HostSource>,
        hardware: Option<Box<dyn HardwareSampler>>,
        config: CollectorConfig,
    ) -> Self {
        Self {
            monitor,
            host,
            hardware,
            host_cpu: HostCpuSampler::new(),
            config,
            primed: false,
        }
    }

    /// Collector reading the live host. Hardware counters are optional.
    pub fn system(monitor: Arc<BackendMonitor>, config: CollectorConfig) -> Self {
        let hardware = match get_hardware_sampler() {
            Ok(sampler) => Some(sampler),
            Err(e) => {
                log::warn!("Hardware sampler not available: {}", e);
                None
            }
        };
        Self::with_config(monitor, Box::new(SysinfoHost::new()), hardware, config)
    }

    pub fn monitor(&self) -> &Arc<BackendMonitor> {
        &self.monitor
    }

    pub fn set_preferred_backend(&mut self, preferred: Option<BackendType>) {
        self.config.preferred_backend = preferred;
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Take and discard a first reading so later reads have a baseline.
    pub fn prime(&mut self) {
        if let Some(hardware) = self.hardware.as_mut() {
            let _ = hardware.sample();
        }
        self.host.refresh();
        if let Some(ticks) = self.host.cpu_ticks() {
            self.host_cpu.observe(ticks);
        }
        // Also stores the backend's CPU baseline
        let _ = self.monitor.measure_primary(self.config.preferred_backend);
        self.primed = true;

        if !self.config.priming_delay.is_zero() {
            std::thread::sleep(self.config.priming_delay);
        }
    }

    /// Collect one snapshot. Blocking; call off the foreground thread.
    ///
    /// Sources that are unavailable leave their fields empty instead of
    /// failing the whole snapshot.
    pub fn collect(&mut self) -> MetricsSnapshot {
        if !self.primed {
            self.prime();
        }

        self.host.refresh();

        let hardware = self
            .hardware
            .as_mut()
            .map(|h| h.sample())
            .filter(|s| s.is_available)
            .unwrap_or_else(HardwareSample::unavailable);

        let cpu_utilization = match self.host.cpu_ticks() {
            Some(ticks) => self.host_cpu.observe(ticks),
            None => self.host.cpu_usage_fallback(),
        };

        let (memory_used_bytes, memory_total_bytes) = self.host.memory();
        let thermal_state = self.host.thermal_state();
        let backend = self.monitor.measure_primary(self.config.preferred_backend);

        log::trace!(
            "Collected snapshot: cpu {:.1}%, backend {:?}",
            cpu_utilization,
            backend.as_ref().map(|b| b.pid)
        );

        MetricsSnapshot {
            timestamp: chrono::Utc::now(),
            gpu_utilization: hardware.gpu_utilization,
            cpu_utilization,
            memory_used_bytes,
            memory_total_bytes,
            thermal_state,
            cpu_power_watts: hardware.cpu_power_watts,
            gpu_power_watts: hardware.gpu_power_watts,
            ane_power_watts: hardware.ane_power_watts,
            dram_power_watts: hardware.dram_power_watts,
            system_power_watts: hardware.system_power_watts,
            gpu_frequency_mhz: hardware.gpu_frequency_mhz,
            backend_pid: backend.as_ref().map(|b| b.pid),
            backend_name: backend.as_ref().map(|b| b.name.clone()),
            backend_memory_bytes: backend.as_ref().map(|b| b.memory_bytes),
            backend_cpu_percent: backend.as_ref().map(|b| b.cpu_percent),
        }
    }

    /// Forget host and per-process CPU baselines
    pub fn reset_cpu_tracking(&mut self) {
        self.host_cpu.reset();
        self.monitor.reset_cpu_tracking();
    }
}
