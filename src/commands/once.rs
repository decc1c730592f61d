//! Collect and print a single snapshot.

use std::sync::Arc;

use anyhow::Result;
use clap::ArgMatches;

use crate::core::backend_monitor::BackendMonitor;
use crate::core::config::MonitorConfig;
use crate::core::system_monitor::{CollectorConfig, MetricsCollector};
use crate::ui::format_snapshot_line;

pub fn execute(matches: &ArgMatches, config: &MonitorConfig) -> Result<()> {
    let monitor = Arc::new(BackendMonitor::system(config));
    let mut collector = MetricsCollector::system(monitor, CollectorConfig::default());
    let snapshot = collector.collect();

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{}", format_snapshot_line(&snapshot));
    }
    Ok(())
}
