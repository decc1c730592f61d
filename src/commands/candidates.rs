//! List processes the user could pick as a custom backend.

use anyhow::Result;
use clap::ArgMatches;

use crate::core::backend_monitor::BackendMonitor;
use crate::core::config::{mib_to_bytes, MonitorConfig};
use crate::ui::print_candidates;

pub fn execute(matches: &ArgMatches, config: &MonitorConfig) -> Result<()> {
    let min_bytes = matches
        .get_one::<u64>("min-mb")
        .map(|mb| mib_to_bytes(*mb))
        .unwrap_or_else(|| config.candidate_min_memory_bytes());

    let monitor = BackendMonitor::system(config);
    let candidates = monitor.list_candidate_processes(min_bytes);

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    print_candidates(&candidates);
    Ok(())
}
