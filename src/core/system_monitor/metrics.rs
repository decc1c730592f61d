use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One correlated reading of the backend process and host hardware
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub gpu_utilization: f64,
    /// Host-wide CPU usage, 0-100
    pub cpu_utilization: f64,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub thermal_state: ThermalState,
    pub cpu_power_watts: Option<f64>,
    pub gpu_power_watts: Option<f64>,
    pub ane_power_watts: Option<f64>,
    pub dram_power_watts: Option<f64>,
    pub system_power_watts: Option<f64>,
    pub gpu_frequency_mhz: Option<f64>,
    pub backend_pid: Option<u32>,
    pub backend_name: Option<String>,
    pub backend_memory_bytes: Option<u64>,
    /// Backend CPU usage, 0-100 per core
    pub backend_cpu_percent: Option<f64>,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            gpu_utilization: 0.0,
            cpu_utilization: 0.0,
            memory_used_bytes: 0,
            memory_total_bytes: 0,
            thermal_state: ThermalState::default(),
            cpu_power_watts: None,
            gpu_power_watts: None,
            ane_power_watts: None,
            dram_power_watts: None,
            system_power_watts: None,
            gpu_frequency_mhz: None,
            backend_pid: None,
            backend_name: None,
            backend_memory_bytes: None,
            backend_cpu_percent: None,
        }
    }
}

impl MetricsSnapshot {
    pub fn memory_percent(&self) -> f64 {
        if self.memory_total_bytes > 0 {
            self.memory_used_bytes as f64 / self.memory_total_bytes as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// Host thermal pressure, least to most severe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThermalState {
    #[default]
    Nominal,
    Fair,
    Serious,
    Critical,
}

impl ThermalState {
    /// Serious or critical pressure, where polling should back off
    pub fn is_elevated(&self) -> bool {
        *self >= ThermalState::Serious
    }
}

impl fmt::Display for ThermalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ThermalState::Nominal => "nominal",
            ThermalState::Fair => "fair",
            ThermalState::Serious => "serious",
            ThermalState::Critical => "critical",
        };
        f.write_str(label)
    }
}
