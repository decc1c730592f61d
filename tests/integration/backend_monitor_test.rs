use std::collections::HashSet;
use std::time::Duration;

use infermon::core::backend_monitor::{BackendType, MemoryAccountant, ProcessIndex};

use super::support::{PortTable, ProcessTable, MB};

const LM_STUDIO: &str = "/Applications/LM Studio.app/Contents/MacOS/LM Studio";
const LM_STUDIO_HELPER: &str = "/Applications/LM Studio.app/Contents/Resources/lms-helper";

fn three_backends() -> ProcessTable {
    ProcessTable::new()
        .spawn(100, "/usr/local/bin/ollama", 1, 500)
        .spawn(200, LM_STUDIO, 1, 800)
        .spawn(300, "/usr/bin/python3", 1, 2000)
        .argv(300, &["python3", "-m", "vllm.entrypoints.openai.api_server"])
        .spawn(400, "/usr/bin/bash", 1, 5)
}

#[test]
fn test_detect_reports_each_type_once() {
    let table = three_backends()
        .spawn(101, "/opt/ollama/bin/ollama", 1, 300)
        .spawn(301, "/usr/bin/python3.11", 1, 900)
        .argv(301, &["python3.11", "-m", "vllm.entrypoints.openai.api_server"]);
    let monitor = table.monitor(PortTable::new(), Duration::from_secs(60));

    let backends = monitor.detect_backends();
    let types: HashSet<BackendType> = backends.iter().map(|b| b.backend_type).collect();

    assert_eq!(backends.len(), types.len());
    assert_eq!(
        types,
        HashSet::from([BackendType::Ollama, BackendType::LmStudio, BackendType::Vllm])
    );
}

#[test]
fn test_detect_within_ttl_returns_cached_result() {
    let table = three_backends();
    let monitor = table.monitor(PortTable::new(), Duration::from_secs(60));

    let first = monitor.detect_backends();
    let table = table.spawn(500, "/usr/local/bin/llama-server", 1, 700);
    let second = monitor.detect_backends();

    assert_eq!(first, second);
    assert!(second.iter().all(|b| b.pid != 500));
    drop(table);
}

#[test]
fn test_expired_cache_sees_new_processes() {
    let table = three_backends();
    let monitor = table.monitor(PortTable::new(), Duration::ZERO);

    assert_eq!(monitor.detect_backends().len(), 3);
    let _table = table.spawn(500, "/usr/local/bin/llama-server", 1, 700);

    let backends = monitor.detect_backends();
    assert_eq!(backends.len(), 4);
    assert!(backends.iter().any(|b| b.backend_type == BackendType::LlamaServer));
}

#[test]
fn test_exited_backend_is_not_reported() {
    let table = three_backends();
    let monitor = table.monitor(PortTable::new(), Duration::from_secs(60));

    assert_eq!(monitor.find_primary_backend(None).map(|b| b.pid), Some(100));

    table.exit(100);
    let primary = monitor.find_primary_backend(None).unwrap();
    assert_ne!(primary.pid, 100);
    assert_eq!(primary.backend_type, BackendType::LmStudio);
}

#[test]
fn test_primary_follows_priority_then_preference() {
    let table = three_backends();
    let monitor = table.monitor(PortTable::new(), Duration::from_secs(60));

    let primary = monitor.find_primary_backend(None).unwrap();
    assert_eq!(primary.backend_type, BackendType::Ollama);
    assert_eq!(primary.name, "Ollama");

    let vllm = monitor.find_primary_backend(Some(BackendType::Vllm)).unwrap();
    assert_eq!(vllm.pid, 300);
    assert_eq!(vllm.name, "vLLM");

    // Preferred type not running
    let fallback = monitor.find_primary_backend(Some(BackendType::MlxLm)).unwrap();
    assert_eq!(fallback.backend_type, BackendType::Ollama);
}

#[test]
fn test_no_backends_running() {
    let table = ProcessTable::new().spawn(400, "/usr/bin/bash", 1, 5);
    let monitor = table.monitor(PortTable::new(), Duration::from_secs(60));

    assert!(monitor.detect_backends().is_empty());
    assert!(monitor.find_primary_backend(None).is_none());
}

#[test]
fn test_custom_process_lifecycle() {
    let table = three_backends()
        .spawn(600, "/opt/bin/my-server", 1, 1200)
        .spawn(601, "/opt/bin/my-worker", 600, 300);
    let monitor = table.monitor(PortTable::new(), Duration::from_secs(60));

    monitor.set_custom_process(600, "My server");
    for _ in 0..3 {
        let primary = monitor.find_primary_backend(Some(BackendType::Vllm)).unwrap();
        assert_eq!(primary.pid, 600);
        assert_eq!(primary.name, "My server");
        assert_eq!(primary.backend_type, BackendType::Custom);
        assert_eq!(primary.memory_bytes, 1200 * MB);
    }

    monitor.clear_custom_process();
    assert!(!monitor.has_custom_process());
    assert_eq!(monitor.find_primary_backend(None).unwrap().pid, 100);
}

#[test]
fn test_custom_process_tree_mode_counts_children() {
    let table = ProcessTable::new()
        .spawn(600, "/opt/bin/my-server", 1, 1200)
        .spawn(601, "/opt/bin/my-worker", 600, 300);
    let monitor = table.monitor(PortTable::new(), Duration::from_secs(60));

    monitor.set_custom_process_with_mode(600, "My server", false);
    let primary = monitor.find_primary_backend(None).unwrap();
    assert_eq!(primary.memory_bytes, 1500 * MB);
}

#[test]
fn test_dead_custom_process_clears_override() {
    let table = three_backends().spawn(600, "/opt/bin/my-server", 1, 1200);
    let monitor = table.monitor(PortTable::new(), Duration::from_secs(60));

    monitor.set_custom_process(600, "My server");
    assert_eq!(monitor.find_primary_backend(None).unwrap().pid, 600);

    table.exit(600);
    let primary = monitor.find_primary_backend(None).unwrap();
    assert_eq!(primary.pid, 100);
    assert!(!monitor.has_custom_process());
    assert!(monitor.custom_process().is_none());
}

#[test]
fn test_port_with_no_listener() {
    let table = three_backends();
    let monitor = table.monitor(PortTable::new().listen(11434, 100), Duration::from_secs(60));

    assert!(monitor.find_process_on_port(8080).is_none());
    assert!(monitor.auto_detect_by_port(8080).is_none());
    assert!(!monitor.has_custom_process());
}

#[test]
fn test_port_identifies_known_and_unknown_listeners() {
    let table = three_backends().spawn(700, "/usr/bin/nc", 1, 2);
    let monitor = table.monitor(
        PortTable::new().listen(11434, 100).listen(9000, 700),
        Duration::from_secs(60),
    );

    let ollama = monitor.find_process_on_port(11434).unwrap();
    assert_eq!(ollama.backend_type, BackendType::Ollama);
    assert_eq!(ollama.pid, 100);

    let unknown = monitor.find_process_on_port(9000).unwrap();
    assert_eq!(unknown.backend_type, BackendType::Unknown);
    assert_eq!(unknown.name, "nc");
}

#[test]
fn test_auto_detect_by_port_follows_heaviest_bundle_process() {
    let table = ProcessTable::new()
        .spawn(10, LM_STUDIO, 1, 50)
        .spawn(11, LM_STUDIO_HELPER, 1, 20)
        .spawn(12, "/Users/me/.lmstudio/bin/llm-worker", 11, 4000);
    let monitor = table.monitor(PortTable::new().listen(1234, 10), Duration::from_secs(60));

    let found = monitor.auto_detect_by_port(1234).unwrap();
    assert_eq!(found.pid, 12);
    assert_eq!(found.backend_type, BackendType::LmStudio);
    assert_eq!(found.memory_bytes, 4000 * MB);

    let manual = monitor.custom_process().unwrap();
    assert_eq!(manual.pid, 12);
    assert!(manual.single_process_mode);
    assert_eq!(monitor.find_primary_backend(None).unwrap().pid, 12);
}

#[test]
fn test_aggregate_of_plain_tree() {
    let table = ProcessTable::new()
        .spawn(1000, "/usr/local/bin/server", 1, 500)
        .spawn(1001, "/usr/local/bin/runner", 1000, 100);
    let index = ProcessIndex::capture(&table);

    let usage = MemoryAccountant::new().aggregate(&index, &table, 1000);
    assert_eq!(usage.total_bytes, 600 * MB);
    assert_eq!(usage.process_count, 2);
}

#[test]
fn test_aggregate_counts_bundle_and_child_once() {
    let table = ProcessTable::new()
        .spawn(10, LM_STUDIO, 1, 100)
        .spawn(11, LM_STUDIO_HELPER, 10, 200)
        .spawn(12, LM_STUDIO_HELPER, 1, 300)
        .spawn(13, "/usr/bin/unrelated", 1, 999);
    let index = ProcessIndex::capture(&table);
    let accountant = MemoryAccountant::new();

    let usage = accountant.aggregate(&index, &table, 10);
    assert_eq!(usage.total_bytes, 600 * MB);
    assert_eq!(usage.process_count, 3);
    assert!(usage.total_bytes >= accountant.memory_of(&table, 10));
}

#[test]
fn test_heaviest_related_reaches_through_bundle_sibling() {
    let table = ProcessTable::new()
        .spawn(10, LM_STUDIO, 1, 50)
        .spawn(11, LM_STUDIO_HELPER, 1, 20)
        .spawn(12, "/tmp/worker", 11, 4000);
    let index = ProcessIndex::capture(&table);

    let heaviest = MemoryAccountant::new().heaviest_related(&index, &table, 10);
    assert_eq!(heaviest, Some((12, 4000 * MB)));
}

#[test]
fn test_cpu_percent_starts_at_zero_and_stays_bounded() {
    let table = ProcessTable::new().spawn(600, "/opt/bin/my-server", 1, 100);
    let monitor = table.monitor(PortTable::new(), Duration::from_secs(60));
    monitor.set_custom_process(600, "My server");

    let first = monitor.measure_primary(None).unwrap();
    assert_eq!(first.cpu_percent, 0.0);

    // 10 busy seconds in a few milliseconds saturates every core
    table.burn(600, 1000);
    std::thread::sleep(Duration::from_millis(20));
    let second = monitor.measure_primary(None).unwrap();
    assert!(second.cpu_percent > 0.0);
    assert!(second.cpu_percent <= 400.0);

    monitor.reset_cpu_tracking();
    assert_eq!(monitor.measure_primary(None).unwrap().cpu_percent, 0.0);
}

#[test]
fn test_candidates_sorted_and_filtered() {
    let own_pid = std::process::id();
    let table = three_backends()
        .spawn(own_pid, "/usr/bin/cargo-test", 1, 9000)
        .spawn(800, "", 1, 9000);
    let monitor = table.monitor(PortTable::new(), Duration::from_secs(60));

    let candidates = monitor.list_candidate_processes(100 * MB);
    let pids: Vec<u32> = candidates.iter().map(|c| c.record.pid).collect();

    assert_eq!(pids, vec![300, 200, 100]);
    assert_eq!(candidates[0].name, "python3");
    assert!(candidates.windows(2).all(|w| w[0].memory_bytes >= w[1].memory_bytes));
}

/// Runs against the live process table: a short-lived `llama-server` (a copy
/// of `sleep`) must disappear from resolution as soon as it exits, even though
/// the live source rate-limits its refreshes.
#[cfg(target_os = "linux")]
#[test]
fn test_live_backend_exit_is_seen_immediately() {
    use infermon::core::config::MonitorConfig;
    use infermon::BackendMonitor;
    use std::process::{Command, Stdio};

    let Ok(sleep) = which::which("sleep") else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let fake_server = dir.path().join("llama-server");
    std::fs::copy(&sleep, &fake_server).unwrap();

    let mut child = Command::new(&fake_server)
        .arg("30")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    std::thread::sleep(Duration::from_millis(100));
    // Multi-call binaries refuse to run under another name
    if child.try_wait().unwrap().is_some() {
        return;
    }

    let monitor = BackendMonitor::system(&MonitorConfig::default());
    let before = monitor.find_primary_backend(Some(BackendType::LlamaServer));
    if before.as_ref().map(|b| b.pid) != Some(child.id()) {
        // Another llama-server with a lower pid owns the slot on this host
        child.kill().unwrap();
        child.wait().unwrap();
        return;
    }

    child.kill().unwrap();
    child.wait().unwrap();

    let after = monitor.find_primary_backend(Some(BackendType::LlamaServer));
    assert_ne!(after.map(|b| b.pid), Some(child.id()));
    assert!(monitor.detect_backends().iter().all(|b| b.pid != child.id()));
}
