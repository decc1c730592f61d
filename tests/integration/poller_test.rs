use std::sync::Arc;
use std::time::Duration;

use infermon::core::backend_monitor::BackendType;
use infermon::core::system_monitor::{
    CollectorConfig, MetricsCollector, MetricsPoller, NullSampler, PollerConfig, ThermalState,
};

use super::support::{PortTable, ProcessTable, QuietHost, MB};

fn poller(table: &ProcessTable, thermal: ThermalState, capacity: usize) -> MetricsPoller {
    let monitor = Arc::new(table.monitor(PortTable::new(), Duration::from_secs(60)));
    let collector = MetricsCollector::with_config(
        monitor,
        Box::new(QuietHost { thermal }),
        Some(Box::new(NullSampler)),
        CollectorConfig {
            preferred_backend: Some(BackendType::LlamaServer),
            priming_delay: Duration::ZERO,
        },
    );
    MetricsPoller::new(
        collector,
        PollerConfig {
            interval: Duration::from_millis(5),
            history_capacity: capacity,
            thermal_backoff_factor: 2,
        },
    )
}

#[tokio::test]
async fn test_snapshot_merges_backend_and_host() {
    let table = ProcessTable::new()
        .spawn(100, "/usr/local/bin/ollama", 1, 500)
        .spawn(101, "/usr/local/bin/ollama_llama_server", 100, 1500)
        .spawn(200, "/usr/local/bin/llama-server", 1, 700);
    let poller = poller(&table, ThermalState::Nominal, 10);

    let snapshot = poller.sample_once().await.unwrap();

    assert_eq!(snapshot.backend_pid, Some(200));
    assert_eq!(snapshot.backend_name.as_deref(), Some("llama.cpp"));
    assert_eq!(snapshot.backend_memory_bytes, Some(700 * MB));
    assert_eq!(snapshot.backend_cpu_percent, Some(0.0));
    assert_eq!(snapshot.cpu_utilization, 25.0);
    assert_eq!(snapshot.memory_percent(), 25.0);
    assert_eq!(snapshot.gpu_power_watts, None);
    assert_eq!(snapshot.thermal_state, ThermalState::Nominal);
}

#[tokio::test]
async fn test_snapshot_without_backend() {
    let table = ProcessTable::new().spawn(400, "/usr/bin/bash", 1, 5);
    let poller = poller(&table, ThermalState::Fair, 10);

    let snapshot = poller.sample_once().await.unwrap();
    assert!(snapshot.backend_pid.is_none());
    assert!(snapshot.backend_memory_bytes.is_none());
    assert_eq!(snapshot.memory_total_bytes, 32 * 1024 * MB);
}

#[tokio::test]
async fn test_polling_keeps_bounded_history() {
    let table = ProcessTable::new().spawn(100, "/usr/local/bin/ollama", 1, 500);
    let poller = poller(&table, ThermalState::Serious, 4);
    let mut snapshots = poller.subscribe();

    assert!(poller.start().await.unwrap());
    for _ in 0..6 {
        snapshots.changed().await.unwrap();
    }
    poller.stop().await;

    let history = poller.history();
    assert_eq!(history.len(), 4);
    assert!(history.iter().all(|s| s.backend_pid == Some(100)));
    assert!(history.iter().all(|s| s.thermal_state == ThermalState::Serious));
    assert!(!poller.is_collecting());
}

#[tokio::test]
async fn test_backend_exit_is_reflected_in_next_snapshot() {
    let table = ProcessTable::new()
        .spawn(100, "/usr/local/bin/ollama", 1, 500)
        .spawn(200, "/usr/local/bin/llama-server", 1, 700);
    let poller = poller(&table, ThermalState::Nominal, 10);

    assert_eq!(poller.sample_once().await.unwrap().backend_pid, Some(200));

    table.exit(200);
    assert_eq!(poller.sample_once().await.unwrap().backend_pid, Some(100));
}
