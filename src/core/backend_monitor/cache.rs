//! TTL cache of the last backend scan, plus the manual override.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::types::{BackendSnapshot, BackendType};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

/// A caller-chosen process that outranks automatic detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    pub pid: u32,
    pub name: String,
    pub backend_type: BackendType,
    /// Measure only this process instead of its tree or bundle
    pub single_process_mode: bool,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshots: Vec<BackendSnapshot>,
    scanned_at: Instant,
}

#[derive(Debug)]
pub struct BackendCache {
    ttl: Duration,
    entry: Option<CacheEntry>,
    manual: Option<Override>,
}

impl BackendCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: None,
            manual: None,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached scan result if younger than the TTL and every cached pid passes
    /// `is_alive`. A stale or partially dead entry is discarded.
    pub fn fresh(&mut self, now: Instant, is_alive: impl Fn(u32) -> bool) -> Option<&[BackendSnapshot]> {
        let valid = match &self.entry {
            Some(entry) => {
                now.saturating_duration_since(entry.scanned_at) < self.ttl
                    && entry.snapshots.iter().all(|s| is_alive(s.pid))
            }
            None => false,
        };

        if !valid {
            if self.entry.take().is_some() {
                log::debug!("Backend cache expired or references a dead pid");
            }
            return None;
        }

        self.entry.as_ref().map(|e| e.snapshots.as_slice())
    }

    pub fn store(&mut self, snapshots: Vec<BackendSnapshot>, now: Instant) {
        self.entry = Some(CacheEntry {
            snapshots,
            scanned_at: now,
        });
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn manual(&self) -> Option<&Override> {
        self.manual.as_ref()
    }

    pub fn set_override(&mut self, manual: Override) {
        self.manual = Some(manual);
        self.invalidate();
    }

    pub fn clear_override(&mut self) -> Option<Override> {
        self.invalidate();
        self.manual.take()
    }

    pub fn has_override(&self) -> bool {
        self.manual.is_some()
    }

    /// Pick one backend: `preferred` if present, else the highest-priority type.
    pub fn select(snapshots: &[BackendSnapshot], preferred: Option<BackendType>) -> Option<BackendSnapshot> {
        if let Some(wanted) = preferred {
            if let Some(hit) = snapshots.iter().find(|s| s.backend_type == wanted) {
                return Some(hit.clone());
            }
        }

        snapshots
            .iter()
            .min_by_key(|s| s.backend_type.priority())
            .cloned()
    }
}

impl Default for BackendCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
