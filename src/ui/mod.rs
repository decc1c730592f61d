// UI and formatting module

pub mod formatters;

// Re-export commonly used items for cleaner imports
pub use formatters::{
    format_bytes, format_snapshot_line, print_backend_row, print_backends, print_candidates,
};
