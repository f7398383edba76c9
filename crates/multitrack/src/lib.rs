//! Multitrack: concurrent rollout tracking across workload kinds.
//!
//! Tracks a heterogeneous set of pods, deployments, stateful sets,
//! daemon sets and jobs during a rollout. One tracker runs per resource;
//! this crate aggregates their status, applies each resource's failure
//! policy, and decides exactly once whether the rollout succeeded.
//!
//! # Components
//!
//! - **`spec`**: Per-resource specs, fail modes, defaults and validation
//! - **`registry`**: Runtime state and latest status of every resource
//! - **`policy`**: Failure budget and fail-mode state machine
//! - **`arbiter`**: Whole-rollout termination decision
//! - **`report`**: Bordered status report rendering
//! - **`tracker`**: Contract for per-kind resource trackers
//! - **`multitracker`**: Worker pool, shared lock, top-level loop
//! - **`replay`**: Scripted tracker for dry runs
//! - **`config`**: TOML rollout files
//!
//! # Fail modes
//!
//! Every failure signal increments the resource's failure count. The
//! first `allow_failures_count` failures are absorbed; the next one
//! applies the [`FailMode`]:
//!
//! - `FailWholeDeployProcessImmediately` aborts the rollout.
//! - `HopeUntilEndOfDeployProcess` marks the resource failed; the rollout
//!   fails once nothing else is in flight.
//! - `IgnoreAndContinueDeployProcess` drops the resource from tracking.

pub mod arbiter;
pub mod config;
pub mod display;
pub mod error;
pub mod kind;
pub mod multitracker;
pub mod policy;
pub mod registry;
pub mod replay;
pub mod report;
pub mod spec;
pub mod status;
pub mod tracker;

pub use config::RolloutConfig;
pub use display::{BufferSink, ReportSink, StdoutSink};
pub use error::{MultitrackError, MultitrackResult};
pub use kind::ResourceKind;
pub use multitracker::{multitrack, Multitracker, MultitrackOptions};
pub use registry::{Registry, ResourceState};
pub use replay::{ReplayClient, ReplayTracker, ScriptAction, ScriptStep};
pub use spec::{DeployCondition, FailMode, MultitrackSpec, MultitrackSpecs};
pub use status::{
    Condition, ContainerStatus, DaemonSetStatus, DeploymentStatus, JobStatus, PodStatus,
    StatefulSetStatus, StatusSnapshot,
};
pub use tracker::{Control, ResourceTracker, TrackerFeed, TrackerOptions, Trackers};
