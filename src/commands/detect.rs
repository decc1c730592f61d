//! Detect running inference backends.

use anyhow::Result;
use clap::ArgMatches;

use crate::core::backend_monitor::BackendMonitor;
use crate::core::config::MonitorConfig;
use crate::ui::print_backends;

pub fn execute(matches: &ArgMatches, config: &MonitorConfig) -> Result<()> {
    let monitor = BackendMonitor::system(config);
    let backends = monitor.detect_backends();

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&backends)?);
        return Ok(());
    }

    print_backends(&backends);
    Ok(())
}
