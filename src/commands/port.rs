//! Identify the process listening on a TCP port.

use anyhow::Result;
use clap::ArgMatches;
use colored::*;

use crate::core::backend_monitor::BackendMonitor;
use crate::core::config::MonitorConfig;
use crate::ui::print_backends;

pub fn execute(matches: &ArgMatches, config: &MonitorConfig) -> Result<()> {
    let port = *matches
        .get_one::<u16>("port")
        .ok_or_else(|| anyhow::anyhow!("Missing port"))?;

    let monitor = BackendMonitor::system(config);
    let found = monitor.find_process_on_port(port);

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }

    match found {
        Some(backend) => print_backends(std::slice::from_ref(&backend)),
        None => println!("{}", format!("Nothing is listening on port {}", port).dimmed()),
    }
    Ok(())
}
