//! Scripted tracker: replays recorded resource events.
//!
//! [`ReplayClient`] plays the part of the cluster client: it holds a
//! script of timed steps per resource. [`ReplayTracker`] implements the
//! tracker contract for every kind by feeding those steps to the
//! orchestrator. Used for dry runs of rollout policies and in tests.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kind::ResourceKind;
use crate::spec::MultitrackSpec;
use crate::status::StatusSnapshot;
use crate::tracker::{ResourceTracker, TrackerFeed, TrackerOptions};

/// One scripted event, fired `after_ms` after the previous step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStep {
    #[serde(default)]
    pub after_ms: u64,
    #[serde(flatten)]
    pub action: ScriptAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptAction {
    Status { status: StatusSnapshot },
    Ready,
    Failure { reason: String },
    /// The watch itself breaks (transport error).
    Fatal { message: String },
}

impl ScriptStep {
    pub fn status(after_ms: u64, status: StatusSnapshot) -> Self {
        Self {
            after_ms,
            action: ScriptAction::Status { status },
        }
    }

    pub fn ready(after_ms: u64) -> Self {
        Self {
            after_ms,
            action: ScriptAction::Ready,
        }
    }

    pub fn failure(after_ms: u64, reason: &str) -> Self {
        Self {
            after_ms,
            action: ScriptAction::Failure {
                reason: reason.to_string(),
            },
        }
    }

    pub fn fatal(after_ms: u64, message: &str) -> Self {
        Self {
            after_ms,
            action: ScriptAction::Fatal {
                message: message.to_string(),
            },
        }
    }
}

/// Client handle holding one script per resource.
#[derive(Debug, Clone, Default)]
pub struct ReplayClient {
    scripts: HashMap<(ResourceKind, String), Vec<ScriptStep>>,
}

impl ReplayClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, kind: ResourceKind, name: &str, steps: Vec<ScriptStep>) -> Self {
        self.insert(kind, name, steps);
        self
    }

    pub fn insert(&mut self, kind: ResourceKind, name: &str, steps: Vec<ScriptStep>) {
        self.scripts.insert((kind, name.to_string()), steps);
    }

    pub fn script(&self, kind: ResourceKind, name: &str) -> Option<&[ScriptStep]> {
        self.scripts
            .get(&(kind, name.to_string()))
            .map(Vec::as_slice)
    }
}

/// Tracker replaying [`ReplayClient`] scripts.
///
/// Once a script runs out without a verdict the resource is treated as
/// stuck and the tracker waits until stopped or timed out.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayTracker;

#[async_trait]
impl ResourceTracker<ReplayClient> for ReplayTracker {
    async fn track(
        &self,
        client: &ReplayClient,
        spec: &MultitrackSpec,
        opts: &TrackerOptions,
        feed: TrackerFeed,
    ) -> anyhow::Result<()> {
        let kind = feed.kind();
        let steps = client
            .script(kind, &spec.resource_name)
            .ok_or_else(|| anyhow!("no replay script for {kind}{}", spec.resource_name))?;

        let replay = replay_steps(steps, &feed);
        match opts.timeout {
            Some(limit) => tokio::time::timeout(limit, replay)
                .await
                .map_err(|_| anyhow!("timed out after {limit:?}"))?,
            None => replay.await,
        }
    }
}

async fn replay_steps(steps: &[ScriptStep], feed: &TrackerFeed) -> anyhow::Result<()> {
    for step in steps {
        if step.after_ms > 0 {
            tokio::time::sleep(Duration::from_millis(step.after_ms)).await;
        }

        let control = match &step.action {
            ScriptAction::Status { status } => {
                if status.kind() != feed.kind() {
                    bail!(
                        "script holds a {} status for {}{}",
                        status.kind(),
                        feed.kind(),
                        feed.resource_name()
                    );
                }
                feed.status(status.clone()).await
            }
            ScriptAction::Ready => feed.ready().await,
            ScriptAction::Failure { reason } => feed.failed(reason).await,
            ScriptAction::Fatal { message } => bail!("{message}"),
        };

        if control.is_stop() {
            debug!(kind = %feed.kind(), resource = %feed.resource_name(), "replay stopped");
            return Ok(());
        }
    }

    debug!(kind = %feed.kind(), resource = %feed.resource_name(), "replay script exhausted");
    std::future::pending::<()>().await;
    Ok(())
}
