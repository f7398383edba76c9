//! Resource state registry: the shared bookkeeping of a rollout.
//!
//! For every kind the registry holds two maps keyed by resource name:
//! the runtime state of resources still in flight, and the latest status
//! snapshot of each resource. A runtime-state entry is inserted once when
//! tracking starts and removed exactly once when the resource resolves
//! (ready, ignored, or aborting failure). Snapshots outlive resolution so
//! the final report can still show them.
//!
//! The registry itself is not synchronized; the orchestrator keeps it
//! behind a single lock.

use std::collections::BTreeMap;

use tracing::debug;

use crate::kind::ResourceKind;
use crate::status::StatusSnapshot;

/// Runtime tracking state of one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceState {
    /// Budget exhausted under `HopeUntilEndOfDeployProcess`.
    pub is_failed: bool,
    pub last_failure_reason: String,
    pub failures_count: u32,
}

#[derive(Debug, Default)]
struct KindTable {
    states: BTreeMap<String, ResourceState>,
    statuses: BTreeMap<String, StatusSnapshot>,
}

/// Registry of every tracked resource across all kinds.
#[derive(Debug, Default)]
pub struct Registry {
    tables: [KindTable; 5],
    /// Set once the terminal verdict has been issued.
    concluded: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, kind: ResourceKind) -> &KindTable {
        &self.tables[kind as usize]
    }

    fn table_mut(&mut self, kind: ResourceKind) -> &mut KindTable {
        &mut self.tables[kind as usize]
    }

    /// Start tracking a resource with a zero-value state.
    pub fn register(&mut self, kind: ResourceKind, name: &str) {
        self.table_mut(kind)
            .states
            .insert(name.to_string(), ResourceState::default());
    }

    pub fn is_tracked(&self, kind: ResourceKind, name: &str) -> bool {
        self.table(kind).states.contains_key(name)
    }

    pub fn state(&self, kind: ResourceKind, name: &str) -> Option<&ResourceState> {
        self.table(kind).states.get(name)
    }

    pub fn state_mut(&mut self, kind: ResourceKind, name: &str) -> Option<&mut ResourceState> {
        self.table_mut(kind).states.get_mut(name)
    }

    /// Overwrite the snapshot of a tracked resource.
    ///
    /// Returns `false` and drops the snapshot when the resource is no
    /// longer tracked.
    pub fn record_status(&mut self, name: &str, snapshot: StatusSnapshot) -> bool {
        let kind = snapshot.kind();
        if !self.is_tracked(kind, name) {
            debug!(%kind, resource = %name, "dropping status of untracked resource");
            return false;
        }
        self.table_mut(kind)
            .statuses
            .insert(name.to_string(), snapshot);
        true
    }

    pub fn status(&self, kind: ResourceKind, name: &str) -> Option<&StatusSnapshot> {
        self.table(kind).statuses.get(name)
    }

    /// Known snapshots of a kind, sorted by name.
    pub fn statuses(&self, kind: ResourceKind) -> impl Iterator<Item = (&str, &StatusSnapshot)> {
        self.table(kind)
            .statuses
            .iter()
            .map(|(name, status)| (name.as_str(), status))
    }

    /// Names of resources of a kind still in flight, sorted.
    pub fn tracked_names(&self, kind: ResourceKind) -> impl Iterator<Item = &str> {
        self.table(kind).states.keys().map(String::as_str)
    }

    /// Remove the runtime state of a resource that reached a terminal outcome.
    pub fn resolve(&mut self, kind: ResourceKind, name: &str) -> Option<ResourceState> {
        self.table_mut(kind).states.remove(name)
    }

    /// Drop the snapshot of a resource so it no longer shows up in reports.
    pub fn forget_status(&mut self, kind: ResourceKind, name: &str) {
        self.table_mut(kind).statuses.remove(name);
    }

    fn states(&self) -> impl Iterator<Item = &ResourceState> {
        self.tables.iter().flat_map(|t| t.states.values())
    }

    /// True iff some tracked resource is not marked failed.
    pub fn any_non_failed_remaining(&self) -> bool {
        self.states().any(|s| !s.is_failed)
    }

    /// True iff some tracked resource is marked failed.
    pub fn any_failed_remaining(&self) -> bool {
        self.states().any(|s| s.is_failed)
    }

    /// One `<tag><name> failed: <reason>` line per failed resource, in
    /// kind order then name order.
    pub fn failure_summary(&self) -> String {
        let mut lines = Vec::new();
        for kind in ResourceKind::ALL {
            for (name, state) in &self.table(kind).states {
                if state.is_failed {
                    lines.push(format!(
                        "{kind}{name} failed: {}",
                        state.last_failure_reason
                    ));
                }
            }
        }
        lines.join("\n")
    }

    pub fn is_concluded(&self) -> bool {
        self.concluded
    }

    /// Mark the rollout as concluded. Returns `false` if it already was.
    pub(crate) fn conclude(&mut self) -> bool {
        !std::mem::replace(&mut self.concluded, true)
    }
}
