//! Per-resource tracking specs, fail modes and the spec normalizer.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MultitrackError, MultitrackResult};
use crate::kind::ResourceKind;

/// Failures absorbed before the fail mode applies, when unset.
pub const DEFAULT_ALLOW_FAILURES_COUNT: u32 = 1;

/// What happens once a resource exhausts its allowed failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailMode {
    /// Drop the resource from tracking; it never affects the verdict.
    IgnoreAndContinueDeployProcess,
    /// Abort the whole rollout. Default.
    #[default]
    FailWholeDeployProcessImmediately,
    /// Mark the resource failed and let the others keep going. The
    /// rollout fails once nothing non-failed is left.
    HopeUntilEndOfDeployProcess,
}

impl fmt::Display for FailMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailMode::IgnoreAndContinueDeployProcess => "IgnoreAndContinueDeployProcess",
            FailMode::FailWholeDeployProcessImmediately => "FailWholeDeployProcessImmediately",
            FailMode::HopeUntilEndOfDeployProcess => "HopeUntilEndOfDeployProcess",
        };
        f.write_str(s)
    }
}

/// Until which point container logs are shown. Interpreted by log
/// streaming, carried through untouched here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeployCondition {
    ControllerIsReady,
    #[default]
    PodIsReady,
    EndOfDeploy,
}

/// Tracking configuration for a single resource.
///
/// Optional fields left as `None` are filled by [`MultitrackSpec::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultitrackSpec {
    pub resource_name: String,
    pub namespace: String,

    pub fail_mode: Option<FailMode>,
    pub allow_failures_count: Option<u32>,
    /// Owned by the per-resource tracker.
    pub failure_threshold_seconds: Option<u64>,

    pub log_watch_regex: Option<String>,
    pub log_watch_regex_by_container_name: HashMap<String, String>,
    pub show_logs_until: Option<DeployCondition>,
    pub skip_logs_for_containers: Vec<String>,
    pub show_logs_only_for_containers: Vec<String>,
}

impl MultitrackSpec {
    /// A spec with every policy field unset.
    pub fn new(resource_name: &str, namespace: &str) -> Self {
        Self {
            resource_name: resource_name.to_string(),
            namespace: namespace.to_string(),
            ..Default::default()
        }
    }

    pub fn with_fail_mode(mut self, mode: FailMode) -> Self {
        self.fail_mode = Some(mode);
        self
    }

    pub fn with_allow_failures_count(mut self, count: u32) -> Self {
        self.allow_failures_count = Some(count);
        self
    }

    /// Fill unset policy fields with their defaults. Idempotent.
    pub fn normalize(&mut self) {
        self.fail_mode.get_or_insert_with(FailMode::default);
        self.allow_failures_count.get_or_insert(DEFAULT_ALLOW_FAILURES_COUNT);
        self.failure_threshold_seconds.get_or_insert(0);
        self.show_logs_until.get_or_insert_with(DeployCondition::default);
    }

    pub fn fail_mode(&self) -> FailMode {
        self.fail_mode.unwrap_or_default()
    }

    pub fn allow_failures_count(&self) -> u32 {
        self.allow_failures_count.unwrap_or(DEFAULT_ALLOW_FAILURES_COUNT)
    }

    pub fn failure_threshold_seconds(&self) -> u64 {
        self.failure_threshold_seconds.unwrap_or(0)
    }

    pub fn show_logs_until(&self) -> DeployCondition {
        self.show_logs_until.unwrap_or_default()
    }

    fn validate(&self, kind: ResourceKind) -> MultitrackResult<()> {
        if self.resource_name.trim().is_empty() {
            return Err(MultitrackError::Config(format!(
                "{kind} spec has an empty resource name"
            )));
        }

        let patterns = self
            .log_watch_regex
            .iter()
            .chain(self.log_watch_regex_by_container_name.values());
        for pattern in patterns {
            regex::Regex::new(pattern).map_err(|e| {
                MultitrackError::Config(format!(
                    "{kind}{}: bad log watch regex {pattern:?}: {e}",
                    self.resource_name
                ))
            })?;
        }

        Ok(())
    }
}

/// Specs for every resource of a rollout, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultitrackSpecs {
    pub pods: Vec<MultitrackSpec>,
    pub deployments: Vec<MultitrackSpec>,
    pub stateful_sets: Vec<MultitrackSpec>,
    pub daemon_sets: Vec<MultitrackSpec>,
    pub jobs: Vec<MultitrackSpec>,
}

impl MultitrackSpecs {
    pub fn for_kind(&self, kind: ResourceKind) -> &[MultitrackSpec] {
        match kind {
            ResourceKind::Pod => &self.pods,
            ResourceKind::Deployment => &self.deployments,
            ResourceKind::StatefulSet => &self.stateful_sets,
            ResourceKind::DaemonSet => &self.daemon_sets,
            ResourceKind::Job => &self.jobs,
        }
    }

    pub fn for_kind_mut(&mut self, kind: ResourceKind) -> &mut Vec<MultitrackSpec> {
        match kind {
            ResourceKind::Pod => &mut self.pods,
            ResourceKind::Deployment => &mut self.deployments,
            ResourceKind::StatefulSet => &mut self.stateful_sets,
            ResourceKind::DaemonSet => &mut self.daemon_sets,
            ResourceKind::Job => &mut self.jobs,
        }
    }

    /// All specs with their kind, in report order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, &MultitrackSpec)> {
        ResourceKind::ALL
            .into_iter()
            .flat_map(move |kind| self.for_kind(kind).iter().map(move |spec| (kind, spec)))
    }

    pub fn len(&self) -> usize {
        ResourceKind::ALL
            .iter()
            .map(|kind| self.for_kind(*kind).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply defaults to every spec of every kind.
    pub fn normalize(&mut self) {
        for kind in ResourceKind::ALL {
            self.for_kind_mut(kind)
                .iter_mut()
                .for_each(MultitrackSpec::normalize);
        }
    }

    /// Reject configurations the orchestrator cannot track: empty names,
    /// a name used twice within one kind, and bad log regexes.
    pub fn validate(&self) -> MultitrackResult<()> {
        for kind in ResourceKind::ALL {
            let mut seen = HashSet::new();
            for spec in self.for_kind(kind) {
                spec.validate(kind)?;
                if !seen.insert(spec.resource_name.as_str()) {
                    return Err(MultitrackError::Config(format!(
                        "{kind}{} is listed more than once",
                        spec.resource_name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_fills_defaults() {
        let mut spec = MultitrackSpec::new("web", "default");
        spec.normalize();

        assert_eq!(
            spec.fail_mode,
            Some(FailMode::FailWholeDeployProcessImmediately)
        );
        assert_eq!(spec.allow_failures_count, Some(1));
        assert_eq!(spec.failure_threshold_seconds, Some(0));
        assert_eq!(spec.show_logs_until, Some(DeployCondition::PodIsReady));
    }

    #[test]
    fn normalize_keeps_explicit_values() {
        let mut spec = MultitrackSpec::new("web", "default")
            .with_fail_mode(FailMode::HopeUntilEndOfDeployProcess)
            .with_allow_failures_count(0);
        spec.show_logs_until = Some(DeployCondition::EndOfDeploy);
        spec.normalize();

        assert_eq!(spec.fail_mode(), FailMode::HopeUntilEndOfDeployProcess);
        assert_eq!(spec.allow_failures_count(), 0);
        assert_eq!(spec.show_logs_until(), DeployCondition::EndOfDeploy);
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut once = MultitrackSpec::new("web", "default");
        once.normalize();
        let mut twice = once.clone();
        twice.normalize();
        assert_eq!(once, twice);
    }

    #[test]
    fn accessors_agree_with_normalized_values() {
        let raw = MultitrackSpec::new("web", "default");
        let mut normalized = raw.clone();
        normalized.normalize();

        assert_eq!(raw.fail_mode(), normalized.fail_mode());
        assert_eq!(raw.allow_failures_count(), normalized.allow_failures_count());
        assert_eq!(
            raw.failure_threshold_seconds(),
            normalized.failure_threshold_seconds()
        );
        assert_eq!(raw.show_logs_until(), normalized.show_logs_until());
    }

    #[test]
    fn specs_normalize_every_kind() {
        let mut specs = MultitrackSpecs {
            pods: vec![MultitrackSpec::new("a", "ns")],
            jobs: vec![MultitrackSpec::new("b", "ns")],
            ..Default::default()
        };
        specs.normalize();
        assert!(specs.iter().all(|(_, s)| s.fail_mode.is_some()));
        assert_eq!(specs.len(), 2);
    }

    #[test]
    fn iter_walks_kinds_in_report_order() {
        let specs = MultitrackSpecs {
            jobs: vec![MultitrackSpec::new("migrate", "ns")],
            pods: vec![MultitrackSpec::new("web", "ns")],
            ..Default::default()
        };
        let kinds: Vec<_> = specs.iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, [ResourceKind::Pod, ResourceKind::Job]);
    }

    #[test]
    fn validate_rejects_duplicate_names_within_kind() {
        let specs = MultitrackSpecs {
            pods: vec![
                MultitrackSpec::new("web", "a"),
                MultitrackSpec::new("web", "b"),
            ],
            ..Default::default()
        };
        let err = specs.validate().unwrap_err();
        assert!(err.to_string().contains("po/web is listed more than once"));
    }

    #[test]
    fn validate_allows_same_name_across_kinds() {
        let specs = MultitrackSpecs {
            pods: vec![MultitrackSpec::new("web", "ns")],
            deployments: vec![MultitrackSpec::new("web", "ns")],
            ..Default::default()
        };
        assert!(specs.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_name() {
        let specs = MultitrackSpecs {
            jobs: vec![MultitrackSpec::new("  ", "ns")],
            ..Default::default()
        };
        assert!(matches!(
            specs.validate(),
            Err(MultitrackError::Config(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_log_regex() {
        let mut spec = MultitrackSpec::new("web", "ns");
        spec.log_watch_regex_by_container_name
            .insert("app".to_string(), "([unclosed".to_string());
        let specs = MultitrackSpecs {
            deployments: vec![spec],
            ..Default::default()
        };
        let err = specs.validate().unwrap_err();
        assert!(err.to_string().contains("deploy/web: bad log watch regex"));
    }

    #[test]
    fn fail_mode_display_matches_variant_name() {
        assert_eq!(
            FailMode::HopeUntilEndOfDeployProcess.to_string(),
            "HopeUntilEndOfDeployProcess"
        );
    }
}
