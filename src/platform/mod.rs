// Platform-specific code module

pub mod gpu;
pub mod host;
pub mod port_lookup;
pub mod process_source;
#[cfg(target_os = "linux")]
pub mod proc_stats;

// Re-exports for cleaner imports
pub use host::SysinfoHost;
pub use port_lookup::{LsofPortResolver, DEFAULT_PORT_LOOKUP_TIMEOUT};
pub use process_source::SysinfoProcessSource;
