use colored::*;
use humansize::{format_size, BINARY};

use crate::core::backend_monitor::{BackendSnapshot, CandidateProcess};
use crate::core::system_monitor::{MetricsSnapshot, ThermalState};

/// Format a byte count in human-readable binary units
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, BINARY)
}

pub fn format_optional_watts(watts: Option<f64>) -> String {
    watts
        .map(|w| format!("{:.1}W", w))
        .unwrap_or_else(|| "-".to_string())
}

pub fn thermal_label(state: ThermalState) -> ColoredString {
    match state {
        ThermalState::Nominal => state.to_string().green(),
        ThermalState::Fair => state.to_string().yellow(),
        ThermalState::Serious => state.to_string().bright_red(),
        ThermalState::Critical => state.to_string().red().bold(),
    }
}

pub fn print_backends(backends: &[BackendSnapshot]) {
    if backends.is_empty() {
        println!("{}", "No inference backend detected".dimmed());
        return;
    }

    println!(
        "{:<8} {:<14} {:<20} {:>12} {:>8}",
        "PID".bold(),
        "TYPE".bold(),
        "NAME".bold(),
        "MEMORY".bold(),
        "CPU".bold()
    );
    for backend in backends {
        print_backend_row(backend);
    }
}

pub fn print_backend_row(backend: &BackendSnapshot) {
    println!(
        "{:<8} {:<14} {:<20} {:>12} {:>7.1}%",
        backend.pid,
        backend.backend_type.to_string().cyan(),
        backend.name,
        format_bytes(backend.memory_bytes),
        backend.cpu_percent
    );
}

pub fn print_candidates(candidates: &[CandidateProcess]) {
    if candidates.is_empty() {
        println!("{}", "No process above the memory threshold".dimmed());
        return;
    }

    println!("{:<8} {:>12}  {}", "PID".bold(), "MEMORY".bold(), "EXECUTABLE".bold());
    for candidate in candidates {
        println!(
            "{:<8} {:>12}  {}",
            candidate.record.pid,
            format_bytes(candidate.memory_bytes),
            candidate.record.executable_path.dimmed()
        );
    }
}

/// One-line summary of a snapshot (for the watch stream)
pub fn format_snapshot_line(snapshot: &MetricsSnapshot) -> String {
    let backend = match (&snapshot.backend_name, snapshot.backend_pid) {
        (Some(name), Some(pid)) => format!(
            "{} [{}] mem {} cpu {:.1}%",
            name,
            pid,
            format_bytes(snapshot.backend_memory_bytes.unwrap_or(0)),
            snapshot.backend_cpu_percent.unwrap_or(0.0)
        ),
        _ => "no backend".to_string(),
    };

    format!(
        "{} | host cpu {:>5.1}% mem {:>5.1}% | gpu {:>5.1}% {} | {} | {}",
        snapshot.timestamp.format("%H:%M:%S"),
        snapshot.cpu_utilization,
        snapshot.memory_percent(),
        snapshot.gpu_utilization,
        format_optional_watts(snapshot.gpu_power_watts),
        thermal_label(snapshot.thermal_state),
        backend
    )
}
