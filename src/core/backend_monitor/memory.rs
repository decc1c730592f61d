//! Memory accounting for a logical backend.
//!
//! A backend is often more than one process: a GUI shell with worker helpers,
//! or a server that forks model runners. The accountant picks a grouping
//! strategy from the root process's executable path and sums every member
//! exactly once.

use std::collections::HashSet;

use super::patterns::bundle_prefix;
use super::process_index::ProcessIndex;
use super::source::ProcessSource;

/// Aggregated memory of a process group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub process_count: usize,
}

/// How the members of a backend were gathered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingStrategy {
    /// Every process under the application bundle path, plus the root's descendants
    Bundle,
    /// The root and everything reachable through parent/child links
    DescendantTree,
}

#[derive(Debug, Default)]
pub struct MemoryAccountant;

impl MemoryAccountant {
    pub fn new() -> Self {
        Self
    }

    /// Memory of one process: the accelerator-inclusive footprint when
    /// readable, else resident memory, else zero.
    pub fn memory_of(&self, source: &dyn ProcessSource, pid: u32) -> u64 {
        source
            .footprint_bytes(pid)
            .or_else(|| source.resident_bytes(pid))
            .unwrap_or(0)
    }

    pub fn strategy_for(&self, index: &ProcessIndex, source: &dyn ProcessSource, root: u32) -> GroupingStrategy {
        match root_path(index, source, root) {
            Some(path) if bundle_prefix(&path).is_some() => GroupingStrategy::Bundle,
            _ => GroupingStrategy::DescendantTree,
        }
    }

    /// Pids belonging to the backend rooted at `root`, root first.
    pub fn members(&self, index: &ProcessIndex, source: &dyn ProcessSource, root: u32) -> Vec<u32> {
        let path = root_path(index, source, root);
        let prefix = path.as_deref().and_then(bundle_prefix);

        let Some(prefix) = prefix else {
            return index.descendants(root);
        };

        let mut visited = HashSet::new();
        let mut members = Vec::new();
        index.walk_into(root, &mut visited, &mut members);
        for record in index.with_path_prefix(prefix) {
            if visited.insert(record.pid) {
                members.push(record.pid);
            }
        }
        members
    }

    /// Total memory of the backend rooted at `root`.
    ///
    /// The result is never below the root's own memory, since the root is
    /// always a member.
    pub fn aggregate(&self, index: &ProcessIndex, source: &dyn ProcessSource, root: u32) -> MemoryUsage {
        let members = self.members(index, source, root);
        let total_bytes = members
            .iter()
            .map(|&pid| self.memory_of(source, pid))
            .fold(0u64, u64::saturating_add);

        log::trace!(
            "Aggregated {} processes for pid {}: {} bytes",
            members.len(),
            root,
            total_bytes
        );

        MemoryUsage {
            total_bytes,
            process_count: members.len(),
        }
    }

    /// The heaviest process related to a bundle-style root.
    ///
    /// Considers every process under the bundle path plus everything reachable
    /// from any of them, which catches workers spawned outside the bundle.
    /// Returns `None` for roots that are not inside an application bundle.
    pub fn heaviest_related(
        &self,
        index: &ProcessIndex,
        source: &dyn ProcessSource,
        pid: u32,
    ) -> Option<(u32, u64)> {
        let path = root_path(index, source, pid)?;
        let prefix = bundle_prefix(&path)?;

        let mut visited = HashSet::new();
        let mut related = Vec::new();
        index.walk_into(pid, &mut visited, &mut related);

        let bundle_pids: Vec<u32> = index.with_path_prefix(prefix).map(|r| r.pid).collect();
        for member in bundle_pids {
            index.walk_into(member, &mut visited, &mut related);
        }

        related
            .into_iter()
            .map(|p| (p, self.memory_of(source, p)))
            // Ties keep the earlier pid in walk order
            .fold(None, |best: Option<(u32, u64)>, candidate| match best {
                Some(b) if b.1 >= candidate.1 => Some(b),
                _ => Some(candidate),
            })
    }
}

fn root_path(index: &ProcessIndex, source: &dyn ProcessSource, pid: u32) -> Option<String> {
    index
        .get(pid)
        .map(|r| r.executable_path.clone())
        .filter(|p| !p.is_empty())
        .or_else(|| source.executable_path(pid))
}
