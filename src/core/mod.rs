// Core business logic module

pub mod backend_monitor;
pub mod config;
pub mod system_monitor;

// Re-export commonly used items
pub use backend_monitor::{BackendMonitor, BackendSnapshot, BackendType};
pub use config::MonitorConfig;
pub use system_monitor::{MetricsCollector, MetricsPoller, MetricsSnapshot};
