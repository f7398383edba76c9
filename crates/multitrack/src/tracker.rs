//! Resource tracker contract.
//!
//! A tracker watches one resource and reports back through its
//! [`TrackerFeed`]: zero or more status snapshots, then exactly one of
//! ready, failure, or an `Err` return for transport-level trouble. Every
//! feed call answers with a [`Control`]; on [`Control::Stop`] the tracker
//! must stop emitting and return promptly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::kind::ResourceKind;
use crate::multitracker::Core;
use crate::spec::MultitrackSpec;
use crate::status::StatusSnapshot;

/// Options shared by every tracker of a rollout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerOptions {
    /// Give up watching a resource after this long.
    pub timeout: Option<Duration>,
}

/// Directive returned to a tracker after each report.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Stop,
}

impl Control {
    pub fn is_stop(self) -> bool {
        self == Control::Stop
    }
}

/// Watches one resource of a given kind against a cluster client `C`.
#[async_trait]
pub trait ResourceTracker<C: Send + Sync>: Send + Sync {
    /// Track `spec` until the feed says stop or a verdict was reported.
    ///
    /// An `Err` is a fatal transport error and ends the whole rollout.
    async fn track(
        &self,
        client: &C,
        spec: &MultitrackSpec,
        opts: &TrackerOptions,
        feed: TrackerFeed,
    ) -> anyhow::Result<()>;
}

/// One tracker implementation per workload kind.
pub struct Trackers<C: Send + Sync + 'static> {
    pub pods: Arc<dyn ResourceTracker<C>>,
    pub deployments: Arc<dyn ResourceTracker<C>>,
    pub stateful_sets: Arc<dyn ResourceTracker<C>>,
    pub daemon_sets: Arc<dyn ResourceTracker<C>>,
    pub jobs: Arc<dyn ResourceTracker<C>>,
}

impl<C: Send + Sync + 'static> Trackers<C> {
    /// Use the same tracker for every kind.
    pub fn uniform(tracker: Arc<dyn ResourceTracker<C>>) -> Self {
        Self {
            pods: tracker.clone(),
            deployments: tracker.clone(),
            stateful_sets: tracker.clone(),
            daemon_sets: tracker.clone(),
            jobs: tracker,
        }
    }

    pub fn for_kind(&self, kind: ResourceKind) -> &Arc<dyn ResourceTracker<C>> {
        match kind {
            ResourceKind::Pod => &self.pods,
            ResourceKind::Deployment => &self.deployments,
            ResourceKind::StatefulSet => &self.stateful_sets,
            ResourceKind::DaemonSet => &self.daemon_sets,
            ResourceKind::Job => &self.jobs,
        }
    }
}

/// A tracker's handle back into the orchestrator.
pub struct TrackerFeed {
    kind: ResourceKind,
    spec: Arc<MultitrackSpec>,
    core: Arc<Core>,
}

impl TrackerFeed {
    pub(crate) fn new(kind: ResourceKind, spec: Arc<MultitrackSpec>, core: Arc<Core>) -> Self {
        Self { kind, spec, core }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn resource_name(&self) -> &str {
        &self.spec.resource_name
    }

    /// Report the latest status snapshot of the resource.
    pub async fn status(&self, snapshot: StatusSnapshot) -> Control {
        self.core
            .record_status(self.kind, &self.spec.resource_name, snapshot)
            .await
    }

    /// Report that the resource reached its ready condition. Always
    /// answers [`Control::Stop`].
    pub async fn ready(&self) -> Control {
        self.core
            .handle_ready(self.kind, &self.spec.resource_name)
            .await
    }

    /// Report a failure with a human-readable reason.
    pub async fn failed(&self, reason: &str) -> Control {
        self.core.handle_failure(self.kind, &self.spec, reason).await
    }
}
