//! Hardware counter samplers.
//!
//! Provides accelerator utilization, power and clock readings for different
//! vendors. Supports NVIDIA (via NVML).

mod nvidia;

pub use nvidia::{process_gpu_memory, NvmlSampler};

use crate::core::system_monitor::HardwareSampler;
use crate::error::{InfermonError, Result};

/// Attempt to get an available hardware sampler
///
/// Returns error if no supported accelerator is available, e.g. inside a
/// container or VM without device access.
pub fn get_hardware_sampler() -> Result<Box<dyn HardwareSampler>> {
    if let Ok(sampler) = NvmlSampler::new() {
        return Ok(Box::new(sampler));
    }

    Err(InfermonError::sampler_not_available("No supported accelerator found"))
}
