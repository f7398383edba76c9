//! Termination arbiter: decides when the whole rollout is over.

use tracing::debug;

use crate::kind::ResourceKind;
use crate::registry::Registry;

/// Where the rollout stands after a registry change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Some resource is still in flight.
    Pending,
    /// Nothing is left and nothing failed.
    Succeeded,
    /// Only failed-but-tolerated resources are left.
    Failed { summary: String },
}

/// Evaluate the registry without changing it.
pub fn settle(registry: &Registry) -> Settlement {
    if registry.any_non_failed_remaining() {
        return Settlement::Pending;
    }
    if registry.any_failed_remaining() {
        Settlement::Failed {
            summary: registry.failure_summary(),
        }
    } else {
        Settlement::Succeeded
    }
}

/// Resolve a resource that reached its ready condition, then settle.
///
/// A resource already marked failed stays failed; its late ready signal
/// changes nothing.
pub fn resolve_ready(registry: &mut Registry, kind: ResourceKind, name: &str) -> Settlement {
    match registry.state(kind, name) {
        Some(state) if state.is_failed => {
            debug!(%kind, resource = %name, "ignoring ready signal of failed resource");
        }
        Some(_) => {
            registry.resolve(kind, name);
        }
        None => {
            debug!(%kind, resource = %name, "ready signal for untracked resource");
        }
    }
    settle(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark_failed(registry: &mut Registry, kind: ResourceKind, name: &str, reason: &str) {
        let state = registry.state_mut(kind, name).unwrap();
        state.is_failed = true;
        state.last_failure_reason = reason.to_string();
    }

    #[test]
    fn empty_registry_settles_as_success() {
        assert_eq!(settle(&Registry::new()), Settlement::Succeeded);
    }

    #[test]
    fn last_ready_resource_concludes_success() {
        let mut registry = Registry::new();
        registry.register(ResourceKind::Pod, "a");
        registry.register(ResourceKind::Pod, "b");

        assert_eq!(
            resolve_ready(&mut registry, ResourceKind::Pod, "a"),
            Settlement::Pending
        );
        assert_eq!(
            resolve_ready(&mut registry, ResourceKind::Pod, "b"),
            Settlement::Succeeded
        );
    }

    #[test]
    fn remaining_failed_resource_concludes_failure() {
        let mut registry = Registry::new();
        registry.register(ResourceKind::Pod, "web");
        registry.register(ResourceKind::Deployment, "api");
        mark_failed(&mut registry, ResourceKind::Deployment, "api", "crashloop");

        assert_eq!(
            resolve_ready(&mut registry, ResourceKind::Pod, "web"),
            Settlement::Failed {
                summary: "deploy/api failed: crashloop".to_string()
            }
        );
    }

    #[test]
    fn ready_of_failed_resource_keeps_it_failed() {
        let mut registry = Registry::new();
        registry.register(ResourceKind::StatefulSet, "db");
        mark_failed(&mut registry, ResourceKind::StatefulSet, "db", "stuck");

        assert!(matches!(
            resolve_ready(&mut registry, ResourceKind::StatefulSet, "db"),
            Settlement::Failed { .. }
        ));
        assert!(registry.is_tracked(ResourceKind::StatefulSet, "db"));
    }
}
