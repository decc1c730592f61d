//! Continuous metrics collection until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;
use tokio::sync::watch;

use crate::core::backend_monitor::{BackendMonitor, BackendType};
use crate::core::config::MonitorConfig;
use crate::core::system_monitor::{CollectorConfig, MetricsCollector, MetricsPoller, PollerConfig};
use crate::ui::{format_bytes, format_snapshot_line};

pub fn execute(matches: &ArgMatches, config: &MonitorConfig) -> Result<()> {
    let mut config = config.clone();
    if let Some(interval) = matches.get_one::<u64>("interval") {
        config.poll_interval_ms = *interval;
    }
    let json_output = matches.get_flag("json");

    let monitor = Arc::new(BackendMonitor::system(&config));
    apply_target(matches, &monitor)?;

    let collector = MetricsCollector::system(
        Arc::clone(&monitor),
        CollectorConfig {
            preferred_backend: preferred_backend(matches)?,
            ..Default::default()
        },
    );
    let poller = MetricsPoller::new(collector, PollerConfig::from(&config));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .thread_name("metrics-worker")
        .build()
        .context("Failed to build metrics runtime")?;

    let (stop_tx, mut stop_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(true);
    })
    .context("Failed to install Ctrl-C handler")?;

    runtime.block_on(async {
        let mut snapshots = poller.subscribe();
        poller.start().await?;

        loop {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let latest = snapshots.borrow_and_update().clone();
                    if let Some(snapshot) = latest {
                        if json_output {
                            println!("{}", serde_json::to_string(snapshot.as_ref())?);
                        } else {
                            println!("{}", format_snapshot_line(&snapshot));
                        }
                    }
                }
                _ = stop_rx.changed() => break,
            }
        }

        poller.stop().await;
        anyhow::Ok(())
    })?;

    if !json_output {
        let history = poller.history();
        let peak = history
            .iter()
            .filter_map(|s| s.backend_memory_bytes)
            .max();
        println!(
            "\n{} {} snapshots, backend memory peak {}",
            "Stopped:".bold(),
            history.len(),
            peak.map(format_bytes).unwrap_or_else(|| "-".to_string())
        );
    }

    Ok(())
}

fn apply_target(matches: &ArgMatches, monitor: &BackendMonitor) -> Result<()> {
    if let Some(port) = matches.get_one::<u16>("port") {
        match monitor.auto_detect_by_port(*port) {
            Some(found) => log::info!("Monitoring {} (pid {}) from port {}", found.name, found.pid, port),
            None => log::warn!("Nothing is listening on port {}, falling back to detection", port),
        }
    } else if let Some(pid) = matches.get_one::<u32>("pid") {
        let name = matches
            .get_one::<String>("name")
            .cloned()
            .unwrap_or_else(|| format!("pid {}", pid));
        let single = matches.get_flag("single");
        monitor.set_custom_process_with_mode(*pid, &name, single);
    }
    Ok(())
}

fn preferred_backend(matches: &ArgMatches) -> Result<Option<BackendType>> {
    matches
        .get_one::<String>("backend")
        .map(|name| name.parse::<BackendType>().map_err(anyhow::Error::msg))
        .transpose()
}
