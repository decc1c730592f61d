//! Inference backend discovery and resource accounting.
//!
//! This module finds the process serving a local inference backend, groups
//! its helper processes, and measures their memory and CPU usage.

mod cache;
mod cpu;
mod detector;
mod memory;
mod monitor;
pub mod patterns;
mod process_index;
mod source;
mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{BackendCache, Override, DEFAULT_CACHE_TTL};
pub use cpu::{CpuSampler, HostCpuSampler, HostCpuTicks};
pub use detector::{Detection, ProcessDetector};
pub use memory::{GroupingStrategy, MemoryAccountant, MemoryUsage};
pub use monitor::BackendMonitor;
pub use process_index::ProcessIndex;
pub use source::{CpuTicks, PortResolver, ProcessSource};
pub use types::{BackendSnapshot, BackendType, CandidateProcess, ProcessRecord};
