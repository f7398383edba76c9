//! Workload kinds tracked during a rollout.

use std::fmt;

/// The kind of workload resource under observation.
///
/// Ordering is significant: reports and failure summaries list kinds in
/// declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Pod,
    Deployment,
    StatefulSet,
    DaemonSet,
    Job,
}

impl ResourceKind {
    /// Every kind, in report order.
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Pod,
        ResourceKind::Deployment,
        ResourceKind::StatefulSet,
        ResourceKind::DaemonSet,
        ResourceKind::Job,
    ];

    /// Short prefix used in reports and error messages (`po/`, `deploy/`, ...).
    pub fn tag(self) -> &'static str {
        match self {
            ResourceKind::Pod => "po/",
            ResourceKind::Deployment => "deploy/",
            ResourceKind::StatefulSet => "sts/",
            ResourceKind::DaemonSet => "ds/",
            ResourceKind::Job => "job/",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
