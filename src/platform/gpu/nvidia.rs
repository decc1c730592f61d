use std::collections::HashMap;

#[cfg(feature = "nvml")]
use nvml_wrapper::{enum_wrappers::device::Clock, enums::device::UsedGpuMemory, Nvml};
#[cfg(feature = "nvml")]
use once_cell::sync::Lazy;

use crate::core::system_monitor::{HardwareSample, HardwareSampler};
use crate::error::{InfermonError, Result};

/// Singleton - NVML must be initialized ONCE only
#[cfg(feature = "nvml")]
static NVML: Lazy<Option<Nvml>> = Lazy::new(|| Nvml::init().ok());

/// NVIDIA hardware sampler using NVML
///
/// Utilization is averaged across devices, power is summed and the reported
/// frequency is the fastest graphics clock.
pub struct NvmlSampler {
    device_count: u32,
}

impl NvmlSampler {
    pub fn new() -> Result<Self> {
        #[cfg(feature = "nvml")]
        {
            let nvml = NVML.as_ref().ok_or_else(|| {
                InfermonError::sampler_not_available(
                    "NVML not available (NVIDIA driver not installed or incompatible)",
                )
            })?;
            let device_count = nvml.device_count().map_err(|e| {
                InfermonError::sampler_not_available(format!("Failed to count GPUs: {}", e))
            })?;
            if device_count == 0 {
                return Err(InfermonError::sampler_not_available("No NVIDIA GPU found"));
            }
            Ok(Self { device_count })
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(InfermonError::sampler_not_available(
                "NVIDIA GPU support not enabled",
            ))
        }
    }
}

impl HardwareSampler for NvmlSampler {
    fn sample(&mut self) -> HardwareSample {
        #[cfg(feature = "nvml")]
        {
            let Some(nvml) = NVML.as_ref() else {
                return HardwareSample::unavailable();
            };

            let mut utilization = Vec::new();
            let mut power_mw: Option<u64> = None;
            let mut clock_mhz: Option<u32> = None;

            for index in 0..self.device_count {
                let Ok(device) = nvml.device_by_index(index) else {
                    continue;
                };
                if let Ok(rates) = device.utilization_rates() {
                    utilization.push(rates.gpu as f64);
                }
                if let Ok(mw) = device.power_usage() {
                    *power_mw.get_or_insert(0) += mw as u64;
                }
                if let Ok(mhz) = device.clock_info(Clock::Graphics) {
                    clock_mhz = Some(clock_mhz.map_or(mhz, |c| c.max(mhz)));
                }
            }

            if utilization.is_empty() {
                return HardwareSample::unavailable();
            }

            HardwareSample {
                gpu_utilization: utilization.iter().sum::<f64>() / utilization.len() as f64,
                gpu_power_watts: power_mw.map(|mw| mw as f64 / 1000.0),
                gpu_frequency_mhz: clock_mhz.map(f64::from),
                is_available: true,
                ..Default::default()
            }
        }
        #[cfg(not(feature = "nvml"))]
        {
            let _ = self.device_count;
            HardwareSample::unavailable()
        }
    }
}

/// GPU memory held by each process across all NVIDIA devices
pub fn process_gpu_memory() -> HashMap<u32, u64> {
    #[allow(unused_mut)]
    let mut usage: HashMap<u32, u64> = HashMap::new();

    #[cfg(feature = "nvml")]
    {
        if let Some(nvml) = NVML.as_ref() {
            let count = nvml.device_count().unwrap_or(0);
            for index in 0..count {
                let Ok(device) = nvml.device_by_index(index) else {
                    continue;
                };
                let compute = device.running_compute_processes().unwrap_or_default();
                let graphics = device.running_graphics_processes().unwrap_or_default();

                // A process can appear in both lists for the same device
                let mut per_device: HashMap<u32, u64> = HashMap::new();
                for info in compute.into_iter().chain(graphics) {
                    if let UsedGpuMemory::Used(bytes) = info.used_gpu_memory {
                        let entry = per_device.entry(info.pid).or_default();
                        *entry = (*entry).max(bytes);
                    }
                }
                for (pid, bytes) in per_device {
                    *usage.entry(pid).or_default() += bytes;
                }
            }
        }
    }

    usage
}
