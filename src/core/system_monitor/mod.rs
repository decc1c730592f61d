//! Metrics collection and polling.
//!
//! This module merges the monitored backend's resource usage with host CPU,
//! memory, thermal and hardware counter readings, and drives periodic
//! collection into a bounded history.

mod collector;
mod hardware;
mod history;
mod host;
mod metrics;
mod runtime;

pub use collector::{CollectorConfig, MetricsCollector};
pub use hardware::{HardwareSample, HardwareSampler, NullSampler};
pub use history::{MetricsHistory, DEFAULT_HISTORY_SIZE};
pub use host::HostSource;
pub use metrics::{MetricsSnapshot, ThermalState};
pub use runtime::{MetricsPoller, PollerConfig};
