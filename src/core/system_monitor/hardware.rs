use serde::{Deserialize, Serialize};

/// Single-shot reading of accelerator and power counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareSample {
    pub gpu_utilization: f64,
    pub cpu_power_watts: Option<f64>,
    pub gpu_power_watts: Option<f64>,
    pub ane_power_watts: Option<f64>,
    pub dram_power_watts: Option<f64>,
    pub system_power_watts: Option<f64>,
    pub gpu_frequency_mhz: Option<f64>,
    pub is_available: bool,
}

impl HardwareSample {
    pub fn unavailable() -> Self {
        Self::default()
    }
}

/// Trait for hardware counter samplers
///
/// Counters are often cumulative, so the first sample after construction may
/// only establish a baseline. Implementations are provided in the platform layer.
pub trait HardwareSampler: Send {
    fn sample(&mut self) -> HardwareSample;
}

/// Sampler for hosts without accessible hardware counters
#[derive(Debug, Default)]
pub struct NullSampler;

impl HardwareSampler for NullSampler {
    fn sample(&mut self) -> HardwareSample {
        HardwareSample::unavailable()
    }
}
