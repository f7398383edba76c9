//! Status snapshots reported by resource trackers.
//!
//! A snapshot is the latest known state of one resource. Trackers send a
//! fresh one on every observed change and the registry overwrites the
//! previous value wholesale.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::kind::ResourceKind;

/// A single status condition (`Ready`, `Available`, `Complete`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Condition {
    pub last_transition_time: String,
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    pub reason: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerStatus {
    pub name: String,
    pub ready: bool,
    pub restart_count: u32,
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodStatus {
    pub phase: String,
    pub conditions: Vec<Condition>,
    pub init_container_statuses: Vec<ContainerStatus>,
    pub container_statuses: Vec<ContainerStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentStatus {
    pub replicas: u32,
    pub updated_replicas: u32,
    pub ready_replicas: u32,
    pub available_replicas: u32,
    pub unavailable_replicas: u32,
    pub conditions: Vec<Condition>,
    /// Owned pods by name.
    pub pods: BTreeMap<String, PodStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatefulSetStatus {
    pub replicas: u32,
    pub ready_replicas: u32,
    pub current_replicas: u32,
    pub updated_replicas: u32,
    pub conditions: Vec<Condition>,
    pub pods: BTreeMap<String, PodStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSetStatus {
    pub current_number_scheduled: u32,
    pub number_ready: u32,
    pub number_available: u32,
    pub number_unavailable: u32,
    pub conditions: Vec<Condition>,
    pub pods: BTreeMap<String, PodStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobStatus {
    pub active: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub start_time: Option<String>,
    pub completion_time: Option<String>,
    pub conditions: Vec<Condition>,
    pub pods: BTreeMap<String, PodStatus>,
}

/// Latest status of one resource, one variant per workload kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusSnapshot {
    Pod(PodStatus),
    Deployment(DeploymentStatus),
    StatefulSet(StatefulSetStatus),
    DaemonSet(DaemonSetStatus),
    Job(JobStatus),
}

impl StatusSnapshot {
    pub fn kind(&self) -> ResourceKind {
        match self {
            StatusSnapshot::Pod(_) => ResourceKind::Pod,
            StatusSnapshot::Deployment(_) => ResourceKind::Deployment,
            StatusSnapshot::StatefulSet(_) => ResourceKind::StatefulSet,
            StatusSnapshot::DaemonSet(_) => ResourceKind::DaemonSet,
            StatusSnapshot::Job(_) => ResourceKind::Job,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_kind_matches_variant() {
        assert_eq!(
            StatusSnapshot::Job(JobStatus::default()).kind(),
            ResourceKind::Job
        );
        assert_eq!(
            StatusSnapshot::DaemonSet(DaemonSetStatus::default()).kind(),
            ResourceKind::DaemonSet
        );
    }

    #[test]
    fn snapshot_parses_from_toml_with_kind_tag() {
        let snapshot: StatusSnapshot = toml::from_str(
            r#"
kind = "deployment"
replicas = 3
ready_replicas = 2

[[conditions]]
type = "Available"
status = "False"
reason = "MinimumReplicasUnavailable"
"#,
        )
        .unwrap();

        match snapshot {
            StatusSnapshot::Deployment(status) => {
                assert_eq!(status.replicas, 3);
                assert_eq!(status.ready_replicas, 2);
                assert_eq!(status.conditions[0].condition_type, "Available");
                assert!(status.pods.is_empty());
            }
            other => panic!("expected deployment snapshot, got {other:?}"),
        }
    }
}
