// Infermon Library - Public API

// Re-export error types
pub mod error;
pub use error::{InfermonError, Result};

// Module declarations
pub mod commands;
pub mod core;
pub mod platform;
pub mod ui;

// Re-export commonly used types
pub use core::backend_monitor::{BackendMonitor, BackendSnapshot, BackendType};
pub use core::config::MonitorConfig;
pub use core::system_monitor::{MetricsCollector, MetricsPoller, MetricsSnapshot};

// Initialize logging
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
