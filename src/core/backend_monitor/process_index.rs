//! Frozen, in-memory view of the process table.
//!
//! All graph algorithms (descendant walks, bundle grouping) run against a
//! `ProcessIndex` rather than issuing live syscalls, so a single scan sees one
//! consistent process tree.

use std::collections::{HashMap, HashSet, VecDeque};

use super::source::ProcessSource;
use super::types::ProcessRecord;

#[derive(Debug, Clone, Default)]
pub struct ProcessIndex {
    records: Vec<ProcessRecord>,
    by_pid: HashMap<u32, usize>,
    children: HashMap<u32, Vec<u32>>,
}

impl ProcessIndex {
    /// Snapshot the process table exposed by `source`.
    ///
    /// Processes whose executable path cannot be resolved are kept with an
    /// empty path so they still participate in parent/child traversal.
    pub fn capture(source: &dyn ProcessSource) -> Self {
        let records = source
            .pids()
            .into_iter()
            .map(|pid| ProcessRecord {
                pid,
                executable_path: source.executable_path(pid).unwrap_or_default(),
                parent_pid: source.parent_pid(pid),
            })
            .collect();

        Self::from_records(records)
    }

    /// Build an index from already-collected records. Records are ordered by pid.
    pub fn from_records(mut records: Vec<ProcessRecord>) -> Self {
        records.sort_by_key(|r| r.pid);
        records.dedup_by_key(|r| r.pid);

        let by_pid = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.pid, i))
            .collect();

        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        for record in &records {
            if let Some(ppid) = record.parent_pid {
                // A process reporting itself as its own parent would loop the walk
                if ppid != record.pid {
                    children.entry(ppid).or_default().push(record.pid);
                }
            }
        }

        Self {
            records,
            by_pid,
            children,
        }
    }

    pub fn records(&self) -> &[ProcessRecord] {
        &self.records
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessRecord> {
        self.by_pid.get(&pid).map(|&i| &self.records[i])
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.by_pid.contains_key(&pid)
    }

    pub fn children_of(&self, pid: u32) -> &[u32] {
        self.children.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Breadth-first walk from `root`, returning `root` followed by every
    /// reachable descendant. Each pid appears exactly once.
    pub fn descendants(&self, root: u32) -> Vec<u32> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        self.walk_into(root, &mut visited, &mut order);
        order
    }

    /// Breadth-first walk that shares a visited set across several roots.
    pub(crate) fn walk_into(&self, root: u32, visited: &mut HashSet<u32>, order: &mut Vec<u32>) {
        let mut queue = VecDeque::from([root]);

        while let Some(pid) = queue.pop_front() {
            if !visited.insert(pid) {
                continue;
            }
            order.push(pid);
            queue.extend(
                self.children_of(pid)
                    .iter()
                    .copied()
                    .filter(|child| !visited.contains(child)),
            );
        }
    }

    /// Every record whose executable path starts with `prefix`
    pub fn with_path_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a ProcessRecord> {
        self.records
            .iter()
            .filter(move |r| !r.executable_path.is_empty() && r.executable_path.starts_with(prefix))
    }
}
