//! Rollout file parser.
//!
//! A rollout file is TOML with an optional `[options]` table and one
//! array of tables per kind. Each entry is a [`MultitrackSpec`] plus an
//! optional replay `script`:
//!
//! ```toml
//! [options]
//! status_report_interval = "5s"
//! timeout = "10m"
//!
//! [[deployments]]
//! resource_name = "api"
//! namespace = "prod"
//! fail_mode = "HopeUntilEndOfDeployProcess"
//! allow_failures_count = 0
//!
//! [[deployments.script]]
//! after_ms = 1000
//! event = "ready"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MultitrackError, MultitrackResult};
use crate::kind::ResourceKind;
use crate::multitracker::{MultitrackOptions, DEFAULT_STATUS_REPORT_INTERVAL};
use crate::replay::{ReplayClient, ScriptStep};
use crate::spec::{MultitrackSpec, MultitrackSpecs};
use crate::tracker::TrackerOptions;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    /// e.g. "5s".
    pub status_report_interval: Option<String>,
    /// Per-tracker timeout, e.g. "10m".
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    #[serde(flatten)]
    pub spec: MultitrackSpec,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub script: Vec<ScriptStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutConfig {
    pub options: OptionsConfig,
    pub pods: Vec<ResourceEntry>,
    pub deployments: Vec<ResourceEntry>,
    pub stateful_sets: Vec<ResourceEntry>,
    pub daemon_sets: Vec<ResourceEntry>,
    pub jobs: Vec<ResourceEntry>,
}

impl RolloutConfig {
    pub fn from_file(path: &Path) -> MultitrackResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MultitrackError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate. Unknown fail modes, bad durations and invalid
    /// specs are rejected here, before anything is tracked.
    pub fn from_toml_str(content: &str) -> MultitrackResult<Self> {
        let config: RolloutConfig =
            toml::from_str(content).map_err(|e| MultitrackError::Config(e.to_string()))?;
        config.specs().validate()?;
        config.options()?;
        Ok(config)
    }

    pub fn entries(&self, kind: ResourceKind) -> &[ResourceEntry] {
        match kind {
            ResourceKind::Pod => &self.pods,
            ResourceKind::Deployment => &self.deployments,
            ResourceKind::StatefulSet => &self.stateful_sets,
            ResourceKind::DaemonSet => &self.daemon_sets,
            ResourceKind::Job => &self.jobs,
        }
    }

    /// The specs of every entry, as given (not normalized).
    pub fn specs(&self) -> MultitrackSpecs {
        let mut specs = MultitrackSpecs::default();
        for kind in ResourceKind::ALL {
            specs
                .for_kind_mut(kind)
                .extend(self.entries(kind).iter().map(|e| e.spec.clone()));
        }
        specs
    }

    pub fn options(&self) -> MultitrackResult<MultitrackOptions> {
        let status_report_interval = match &self.options.status_report_interval {
            Some(s) => parse_duration(s)?,
            None => DEFAULT_STATUS_REPORT_INTERVAL,
        };
        if status_report_interval.is_zero() {
            return Err(MultitrackError::Config(
                "status_report_interval must be positive".to_string(),
            ));
        }
        let timeout = self
            .options
            .timeout
            .as_deref()
            .map(parse_duration)
            .transpose()?;
        if timeout.is_some_and(|t| t.is_zero()) {
            return Err(MultitrackError::Config("timeout must be positive".to_string()));
        }

        Ok(MultitrackOptions {
            tracker: TrackerOptions { timeout },
            status_report_interval,
        })
    }

    /// A replay client holding every entry's script.
    pub fn replay_client(&self) -> ReplayClient {
        let mut client = ReplayClient::new();
        for kind in ResourceKind::ALL {
            for entry in self.entries(kind) {
                client.insert(kind, &entry.spec.resource_name, entry.script.clone());
            }
        }
        client
    }
}

/// Parse a duration string like "5s", "500ms", "2m", or bare seconds.
pub fn parse_duration(s: &str) -> MultitrackResult<Duration> {
    let s = s.trim();
    let bad = || MultitrackError::Config(format!("invalid duration {s:?}"));

    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().map(Duration::from_millis).map_err(|_| bad())
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().map(Duration::from_secs).map_err(|_| bad())
    } else if let Some(mins) = s.strip_suffix('m') {
        let mins = mins.parse::<u64>().map_err(|_| bad())?;
        mins.checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(bad)
    } else {
        s.parse::<u64>().map(Duration::from_secs).map_err(|_| bad())
    }
}
