use std::collections::VecDeque;

use super::metrics::MetricsSnapshot;

pub const DEFAULT_HISTORY_SIZE: usize = 600;

/// Circular buffer of snapshots in chronological order
#[derive(Debug, Clone)]
pub struct MetricsHistory {
    capacity: usize,
    snapshots: VecDeque<MetricsSnapshot>,
}

impl MetricsHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            snapshots: VecDeque::with_capacity(capacity),
        }
    }

    /// Append, evicting the oldest snapshot when full
    pub fn push(&mut self, snapshot: MetricsSnapshot) {
        if self.snapshots.len() >= self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    pub fn snapshots(&self) -> Vec<MetricsSnapshot> {
        self.snapshots.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricsSnapshot> {
        self.snapshots.iter()
    }

    pub fn latest(&self) -> Option<&MetricsSnapshot> {
        self.snapshots.back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Highest backend memory seen in the retained window
    pub fn backend_memory_peak(&self) -> Option<u64> {
        self.snapshots
            .iter()
            .filter_map(|s| s.backend_memory_bytes)
            .max()
    }
}

impl Default for MetricsHistory {
    fn default() -> Self {
        Self::new()
    }
}
