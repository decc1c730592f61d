//! Backend classification over a frozen process index.

use std::collections::HashSet;

use super::patterns::{is_interpreted_runtime, match_argv, match_path};
use super::process_index::ProcessIndex;
use super::source::ProcessSource;
use super::types::{executable_name, BackendType, ProcessRecord};

/// A classified process, before resources are measured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub pid: u32,
    pub backend_type: BackendType,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct ProcessDetector;

impl ProcessDetector {
    pub fn new() -> Self {
        Self
    }

    /// Classify every process in `index`, keeping the first process found for
    /// each backend type.
    ///
    /// Path rules run over the whole table first; interpreted runtimes that
    /// matched no path rule are then classified by their argument vector.
    pub fn scan(&self, index: &ProcessIndex, source: &dyn ProcessSource) -> Vec<Detection> {
        let mut seen: HashSet<BackendType> = HashSet::new();
        let mut detections = Vec::new();
        let mut interpreted: Vec<&ProcessRecord> = Vec::new();

        for record in index.records() {
            match match_path(&record.executable_path) {
                Some(pattern) => {
                    if seen.insert(pattern.backend) {
                        log::debug!(
                            "Detected {} at pid {} ({})",
                            pattern.name,
                            record.pid,
                            record.executable_path
                        );
                        detections.push(Detection {
                            pid: record.pid,
                            backend_type: pattern.backend,
                            name: pattern.name.to_string(),
                        });
                    }
                }
                None if is_interpreted_runtime(&record.executable_path) => {
                    interpreted.push(record);
                }
                None => {}
            }
        }

        for record in interpreted {
            let Some(args) = source.arguments(record.pid) else {
                continue;
            };
            if let Some(pattern) = match_argv(&args) {
                if seen.insert(pattern.backend) {
                    log::debug!("Detected {} at pid {} via argv", pattern.name, record.pid);
                    detections.push(Detection {
                        pid: record.pid,
                        backend_type: pattern.backend,
                        name: pattern.name.to_string(),
                    });
                }
            }
        }

        detections
    }

    /// Classify a single process, e.g. one found listening on a port.
    ///
    /// Processes that match no rule are reported as [`BackendType::Unknown`]
    /// under their executable's base name.
    pub fn classify(&self, pid: u32, source: &dyn ProcessSource) -> Option<Detection> {
        let path = source.executable_path(pid);
        let path = path.as_deref().unwrap_or_default();

        if let Some(pattern) = match_path(path) {
            return Some(Detection {
                pid,
                backend_type: pattern.backend,
                name: pattern.name.to_string(),
            });
        }

        let args = source.arguments(pid);
        if is_interpreted_runtime(path) {
            if let Some(pattern) = args.as_deref().and_then(match_argv) {
                return Some(Detection {
                    pid,
                    backend_type: pattern.backend,
                    name: pattern.name.to_string(),
                });
            }
        }

        let name = match executable_name(path) {
            "" => args
                .and_then(|a| a.into_iter().next())
                .map(|argv0| executable_name(&argv0).to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("pid {}", pid)),
            base => base.to_string(),
        };

        Some(Detection {
            pid,
            backend_type: BackendType::Unknown,
            name,
        })
    }
}
