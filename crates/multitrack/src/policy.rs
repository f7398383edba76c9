//! Failure policy: what a failure signal does to a resource.
//!
//! Each failure bumps the resource's counter. Up to
//! `allow_failures_count` failures are absorbed; the next one applies the
//! resource's [`FailMode`].

use tracing::{debug, warn};

use crate::kind::ResourceKind;
use crate::registry::Registry;
use crate::spec::{FailMode, MultitrackSpec};

/// Outcome of evaluating one failure signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureDecision {
    /// Within budget. The tracker decides whether to keep watching.
    Absorbed { failures_count: u32 },
    /// Marked failed and kept in the registry; the rollout continues.
    Tolerated,
    /// Removed from the registry without recording the failure.
    Ignored,
    /// The whole rollout must abort with this summary.
    Abort { summary: String },
    /// The resource is no longer tracked; the signal has no effect.
    Untracked,
}

/// Apply a failure signal for `spec` to the registry.
pub fn apply_failure(
    registry: &mut Registry,
    kind: ResourceKind,
    spec: &MultitrackSpec,
    reason: &str,
) -> FailureDecision {
    let name = spec.resource_name.as_str();
    let allowed = spec.allow_failures_count();

    let Some(state) = registry.state_mut(kind, name) else {
        return FailureDecision::Untracked;
    };
    if state.is_failed {
        return FailureDecision::Untracked;
    }

    state.failures_count += 1;
    let failures_count = state.failures_count;
    if failures_count <= allowed {
        debug!(%kind, resource = %name, failures = failures_count, allowed, %reason, "failure absorbed");
        return FailureDecision::Absorbed { failures_count };
    }

    match spec.fail_mode() {
        FailMode::FailWholeDeployProcessImmediately => {
            // Record before resolving so the summary carries this reason.
            state.is_failed = true;
            state.last_failure_reason = reason.to_string();
            let summary = registry.failure_summary();
            registry.resolve(kind, name);
            warn!(%kind, resource = %name, failures = failures_count, %reason, "failure budget exhausted, aborting rollout");
            FailureDecision::Abort { summary }
        }
        FailMode::HopeUntilEndOfDeployProcess => {
            state.is_failed = true;
            state.last_failure_reason = reason.to_string();
            warn!(%kind, resource = %name, failures = failures_count, %reason, "resource failed, continuing rollout");
            FailureDecision::Tolerated
        }
        FailMode::IgnoreAndContinueDeployProcess => {
            registry.resolve(kind, name);
            registry.forget_status(kind, name);
            warn!(%kind, resource = %name, failures = failures_count, %reason, "resource failed, ignoring");
            FailureDecision::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{JobStatus, StatusSnapshot};

    fn setup(kind: ResourceKind, spec: &MultitrackSpec) -> Registry {
        let mut registry = Registry::new();
        registry.register(kind, &spec.resource_name);
        registry
    }

    #[test]
    fn counts_every_failure_and_absorbs_up_to_budget() {
        let spec = MultitrackSpec::new("web", "ns").with_allow_failures_count(3);
        let mut registry = setup(ResourceKind::Pod, &spec);

        for n in 1..=3 {
            assert_eq!(
                apply_failure(&mut registry, ResourceKind::Pod, &spec, "restart"),
                FailureDecision::Absorbed { failures_count: n }
            );
            assert_eq!(
                registry.state(ResourceKind::Pod, "web").unwrap().failures_count,
                n
            );
        }
        assert!(matches!(
            apply_failure(&mut registry, ResourceKind::Pod, &spec, "restart"),
            FailureDecision::Abort { .. }
        ));
    }

    #[test]
    fn default_mode_aborts_with_reason_of_triggering_failure() {
        let spec = MultitrackSpec::new("migrate", "ns");
        let mut registry = setup(ResourceKind::Job, &spec);

        assert_eq!(
            apply_failure(&mut registry, ResourceKind::Job, &spec, "first"),
            FailureDecision::Absorbed { failures_count: 1 }
        );
        let decision = apply_failure(&mut registry, ResourceKind::Job, &spec, "second");

        assert_eq!(
            decision,
            FailureDecision::Abort {
                summary: "job/migrate failed: second".to_string()
            }
        );
        assert!(!registry.is_tracked(ResourceKind::Job, "migrate"));
    }

    #[test]
    fn abort_summary_includes_tolerated_peers() {
        let hope = MultitrackSpec::new("api", "ns")
            .with_fail_mode(FailMode::HopeUntilEndOfDeployProcess)
            .with_allow_failures_count(0);
        let strict = MultitrackSpec::new("web", "ns").with_allow_failures_count(0);

        let mut registry = Registry::new();
        registry.register(ResourceKind::Deployment, "api");
        registry.register(ResourceKind::Pod, "web");

        apply_failure(&mut registry, ResourceKind::Deployment, &hope, "ProgressDeadlineExceeded");
        let decision = apply_failure(&mut registry, ResourceKind::Pod, &strict, "OOMKilled");

        assert_eq!(
            decision,
            FailureDecision::Abort {
                summary: "po/web failed: OOMKilled\ndeploy/api failed: ProgressDeadlineExceeded"
                    .to_string()
            }
        );
    }

    #[test]
    fn hope_marks_failed_and_keeps_entry() {
        let spec = MultitrackSpec::new("api", "ns")
            .with_fail_mode(FailMode::HopeUntilEndOfDeployProcess)
            .with_allow_failures_count(0);
        let mut registry = setup(ResourceKind::Deployment, &spec);

        assert_eq!(
            apply_failure(&mut registry, ResourceKind::Deployment, &spec, "stuck"),
            FailureDecision::Tolerated
        );
        let state = registry.state(ResourceKind::Deployment, "api").unwrap();
        assert!(state.is_failed);
        assert_eq!(state.last_failure_reason, "stuck");
        assert_eq!(state.failures_count, 1);
    }

    #[test]
    fn hope_failure_is_permanent() {
        let spec = MultitrackSpec::new("api", "ns")
            .with_fail_mode(FailMode::HopeUntilEndOfDeployProcess)
            .with_allow_failures_count(0);
        let mut registry = setup(ResourceKind::Deployment, &spec);

        apply_failure(&mut registry, ResourceKind::Deployment, &spec, "stuck");
        assert_eq!(
            apply_failure(&mut registry, ResourceKind::Deployment, &spec, "again"),
            FailureDecision::Untracked
        );
        assert_eq!(
            registry
                .state(ResourceKind::Deployment, "api")
                .unwrap()
                .last_failure_reason,
            "stuck"
        );
    }

    #[test]
    fn ignore_resolves_without_recording() {
        let spec = MultitrackSpec::new("cron", "ns")
            .with_fail_mode(FailMode::IgnoreAndContinueDeployProcess)
            .with_allow_failures_count(0);
        let mut registry = setup(ResourceKind::Job, &spec);
        registry.record_status("cron", StatusSnapshot::Job(JobStatus::default()));

        assert_eq!(
            apply_failure(&mut registry, ResourceKind::Job, &spec, "failed"),
            FailureDecision::Ignored
        );
        assert!(!registry.is_tracked(ResourceKind::Job, "cron"));
        assert!(registry.status(ResourceKind::Job, "cron").is_none());
        assert_eq!(registry.failure_summary(), "");
    }

    #[test]
    fn failure_for_resolved_resource_is_untracked() {
        let spec = MultitrackSpec::new("web", "ns");
        let mut registry = Registry::new();
        assert_eq!(
            apply_failure(&mut registry, ResourceKind::Pod, &spec, "late"),
            FailureDecision::Untracked
        );
    }
}
