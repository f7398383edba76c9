//! Status report rendering.
//!
//! Produces the bordered text block printed periodically and once more
//! right before the rollout concludes:
//!
//! ```text
//! ┌ Status Report
//! ├ po/web-0
//! │   Phase:Running
//! │   Containers:
//! │   - app Ready:true RestartCount:0 Image:nginx:1.27
//! ├ deploy/api
//! │   Replicas:2 UpdatedReplicas:2 ReadyReplicas:1 AvailableReplicas:1 UnavailableReplicas:1
//! │   po/api-7d9f:
//! │     Phase:Pending
//! ├ job/migrate status unavailable
//! └ Status Report
//! ```

use std::collections::BTreeMap;

use crate::kind::ResourceKind;
use crate::registry::Registry;
use crate::status::{Condition, ContainerStatus, PodStatus, StatusSnapshot};

const BODY_INDENT: &str = "│   ";
const NESTED_STEP: &str = "  ";

fn push(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

/// Render every known snapshot, then every tracked resource without one.
pub fn render(registry: &Registry) -> String {
    let mut out = String::new();
    push(&mut out, "┌ Status Report");

    for kind in ResourceKind::ALL {
        for (name, snapshot) in registry.statuses(kind) {
            push(&mut out, &format!("├ {kind}{name}"));
            render_snapshot(&mut out, snapshot);
        }
    }

    for kind in ResourceKind::ALL {
        for name in registry.tracked_names(kind) {
            if registry.status(kind, name).is_none() {
                push(&mut out, &format!("├ {kind}{name} status unavailable"));
            }
        }
    }

    push(&mut out, "└ Status Report");
    out
}

fn render_snapshot(out: &mut String, snapshot: &StatusSnapshot) {
    let indent = BODY_INDENT;
    match snapshot {
        StatusSnapshot::Pod(pod) => render_pod(out, indent, pod),
        StatusSnapshot::Deployment(s) => {
            push(
                out,
                &format!(
                    "{indent}Replicas:{} UpdatedReplicas:{} ReadyReplicas:{} AvailableReplicas:{} UnavailableReplicas:{}",
                    s.replicas,
                    s.updated_replicas,
                    s.ready_replicas,
                    s.available_replicas,
                    s.unavailable_replicas
                ),
            );
            render_conditions(out, indent, &s.conditions);
            render_owned_pods(out, indent, &s.pods);
        }
        StatusSnapshot::StatefulSet(s) => {
            push(
                out,
                &format!(
                    "{indent}Replicas:{} ReadyReplicas:{} CurrentReplicas:{} UpdatedReplicas:{}",
                    s.replicas, s.ready_replicas, s.current_replicas, s.updated_replicas
                ),
            );
            render_conditions(out, indent, &s.conditions);
            render_owned_pods(out, indent, &s.pods);
        }
        StatusSnapshot::DaemonSet(s) => {
            push(
                out,
                &format!(
                    "{indent}CurrentNumberScheduled:{} NumberReady:{} NumberAvailable:{} NumberUnavailable:{}",
                    s.current_number_scheduled,
                    s.number_ready,
                    s.number_available,
                    s.number_unavailable
                ),
            );
            render_conditions(out, indent, &s.conditions);
            render_owned_pods(out, indent, &s.pods);
        }
        StatusSnapshot::Job(s) => {
            push(
                out,
                &format!(
                    "{indent}Active:{} Succeeded:{} Failed:{}",
                    s.active, s.succeeded, s.failed
                ),
            );
            push(
                out,
                &format!(
                    "{indent}StartTime:{} CompletionTime:{}",
                    s.start_time.as_deref().unwrap_or("-"),
                    s.completion_time.as_deref().unwrap_or("-")
                ),
            );
            render_conditions(out, indent, &s.conditions);
            render_owned_pods(out, indent, &s.pods);
        }
    }
}

fn render_owned_pods(out: &mut String, indent: &str, pods: &BTreeMap<String, PodStatus>) {
    let nested = format!("{indent}{NESTED_STEP}");
    for (name, pod) in pods {
        push(out, &format!("{indent}po/{name}:"));
        render_pod(out, &nested, pod);
    }
}

fn render_pod(out: &mut String, indent: &str, pod: &PodStatus) {
    if !pod.phase.is_empty() {
        push(out, &format!("{indent}Phase:{}", pod.phase));
    }
    render_conditions(out, indent, &pod.conditions);
    render_containers(out, indent, "InitContainers", &pod.init_container_statuses);
    render_containers(out, indent, "Containers", &pod.container_statuses);
}

fn render_conditions(out: &mut String, indent: &str, conditions: &[Condition]) {
    if conditions.is_empty() {
        return;
    }
    push(out, &format!("{indent}Conditions:"));
    for cond in conditions {
        let mut line = format!(
            "{indent}- {} {}:{}",
            cond.last_transition_time, cond.condition_type, cond.status
        );
        if !cond.reason.is_empty() {
            line.push(' ');
            line.push_str(&cond.reason);
        }
        if !cond.message.is_empty() {
            line.push(' ');
            line.push_str(&cond.message);
        }
        push(out, &line);
    }
}

fn render_containers(out: &mut String, indent: &str, title: &str, containers: &[ContainerStatus]) {
    if containers.is_empty() {
        return;
    }
    push(out, &format!("{indent}{title}:"));
    for c in containers {
        push(
            out,
            &format!(
                "{indent}- {} Ready:{} RestartCount:{} Image:{}",
                c.name, c.ready, c.restart_count, c.image
            ),
        );
    }
}
