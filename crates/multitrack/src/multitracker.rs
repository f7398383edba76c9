//! Multitracker: runs one tracker per resource and issues the verdict.
//!
//! Every resource gets its own spawned worker running its tracker. All
//! tracker callbacks go through [`Core`], which holds the registry behind
//! a single lock and performs the failure policy and termination checks
//! under it. The first terminal outcome marks the registry concluded and
//! is sent to the top-level loop; anything after that is told to stop.
//!
//! ```text
//! multitrack()
//!   ├── validate + normalize specs, register every resource
//!   ├── worker per resource ── tracker.track(feed)
//!   │                            └── feed → Core (lock) → policy / arbiter
//!   └── select! { verdict channel, report ticker }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::arbiter::{self, Settlement};
use crate::display::{ReportSink, StdoutSink};
use crate::error::{MultitrackError, MultitrackResult};
use crate::kind::ResourceKind;
use crate::policy::{self, FailureDecision};
use crate::registry::Registry;
use crate::report;
use crate::spec::{MultitrackSpec, MultitrackSpecs};
use crate::status::StatusSnapshot;
use crate::tracker::{Control, TrackerFeed, TrackerOptions, Trackers};

/// Interval between periodic status reports, when not configured.
pub const DEFAULT_STATUS_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Options for a whole rollout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultitrackOptions {
    /// Passed to every tracker.
    pub tracker: TrackerOptions,
    pub status_report_interval: Duration,
}

impl Default for MultitrackOptions {
    fn default() -> Self {
        Self {
            tracker: TrackerOptions::default(),
            status_report_interval: DEFAULT_STATUS_REPORT_INTERVAL,
        }
    }
}

/// Terminal outcome delivered to the top-level loop.
#[derive(Debug)]
pub(crate) enum Verdict {
    Succeeded,
    Failed(String),
    Fatal(MultitrackError),
}

/// Shared state of a running rollout.
pub(crate) struct Core {
    registry: Mutex<Registry>,
    verdicts: mpsc::UnboundedSender<Verdict>,
    sink: Arc<dyn ReportSink>,
}

impl Core {
    fn new(
        registry: Registry,
        verdicts: mpsc::UnboundedSender<Verdict>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            registry: Mutex::new(registry),
            verdicts,
            sink,
        }
    }

    pub(crate) async fn record_status(
        &self,
        kind: ResourceKind,
        name: &str,
        snapshot: StatusSnapshot,
    ) -> Control {
        let mut registry = self.registry.lock().await;
        if registry.is_concluded() {
            return Control::Stop;
        }
        if snapshot.kind() != kind {
            warn!(%kind, resource = %name, snapshot_kind = %snapshot.kind(), "dropping status snapshot of mismatched kind");
            return Control::Continue;
        }

        if registry.record_status(name, snapshot) {
            debug!(%kind, resource = %name, "status recorded");
            Control::Continue
        } else {
            debug!(%kind, resource = %name, "dropping status of untracked resource");
            Control::Stop
        }
    }

    pub(crate) async fn handle_ready(&self, kind: ResourceKind, name: &str) -> Control {
        let mut registry = self.registry.lock().await;
        if registry.is_concluded() {
            return Control::Stop;
        }

        info!(%kind, resource = %name, "resource ready");
        let settlement = arbiter::resolve_ready(&mut registry, kind, name);
        self.apply_settlement(&mut registry, settlement);
        Control::Stop
    }

    pub(crate) async fn handle_failure(
        &self,
        kind: ResourceKind,
        spec: &MultitrackSpec,
        reason: &str,
    ) -> Control {
        let mut registry = self.registry.lock().await;
        if registry.is_concluded() {
            return Control::Stop;
        }

        match policy::apply_failure(&mut registry, kind, spec, reason) {
            FailureDecision::Absorbed { .. } => Control::Continue,
            FailureDecision::Tolerated | FailureDecision::Ignored => {
                let settlement = arbiter::settle(&registry);
                self.apply_settlement(&mut registry, settlement);
                Control::Stop
            }
            FailureDecision::Abort { summary } => {
                self.conclude(&mut registry, Verdict::Failed(summary));
                Control::Stop
            }
            FailureDecision::Untracked => Control::Stop,
        }
    }

    /// Called by a worker once its tracker returned.
    async fn handle_tracker_exit(
        &self,
        kind: ResourceKind,
        name: &str,
        result: anyhow::Result<()>,
    ) {
        let mut registry = self.registry.lock().await;
        if registry.is_concluded() {
            return;
        }

        let source = match result {
            Err(e) => e,
            Ok(()) => {
                let unresolved =
                    matches!(registry.state(kind, name), Some(state) if !state.is_failed);
                if !unresolved {
                    debug!(%kind, resource = %name, "tracker finished");
                    return;
                }
                anyhow::anyhow!("tracker exited before the resource reached a terminal state")
            }
        };

        error!(%kind, resource = %name, error = %source, "tracking failed");
        let err = MultitrackError::Track {
            kind,
            name: name.to_string(),
            source,
        };
        self.conclude(&mut registry, Verdict::Fatal(err));
    }

    /// Periodic report. Skipped once the final report was written.
    async fn emit_report(&self) {
        let registry = self.registry.lock().await;
        if registry.is_concluded() {
            return;
        }
        self.sink.emit(&report::render(&registry));
    }

    fn apply_settlement(&self, registry: &mut Registry, settlement: Settlement) {
        match settlement {
            Settlement::Pending => {}
            Settlement::Succeeded => self.conclude(registry, Verdict::Succeeded),
            Settlement::Failed { summary } => self.conclude(registry, Verdict::Failed(summary)),
        }
    }

    /// Issue the terminal verdict. Only the first call has any effect.
    fn conclude(&self, registry: &mut Registry, verdict: Verdict) {
        if !registry.conclude() {
            return;
        }

        if !matches!(verdict, Verdict::Fatal(_)) {
            self.sink.emit(&report::render(registry));
        }
        match &verdict {
            Verdict::Succeeded => info!("rollout succeeded"),
            Verdict::Failed(summary) => warn!(%summary, "rollout failed"),
            Verdict::Fatal(err) => error!(error = %err, "rollout aborted"),
        }

        if self.verdicts.send(verdict).is_err() {
            error!("verdict receiver dropped, rollout outcome lost");
        }
    }
}

/// Aborts all workers when the rollout loop returns.
struct Workers(Vec<JoinHandle<()>>);

impl Drop for Workers {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Rollout orchestrator.
pub struct Multitracker {
    sink: Arc<dyn ReportSink>,
}

impl Default for Multitracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Multitracker {
    /// A multitracker printing reports to stdout.
    pub fn new() -> Self {
        Self {
            sink: Arc::new(StdoutSink),
        }
    }

    /// Send reports to `sink` instead of stdout.
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Track every resource in `specs` until the rollout concludes.
    ///
    /// Returns `Ok(())` when every resource became ready (or was
    /// ignored), [`MultitrackError::RolloutFailed`] with the failure
    /// summary, or the first fatal tracker error. Workers still running
    /// when this returns are aborted.
    pub async fn run<C>(
        &self,
        client: Arc<C>,
        trackers: &Trackers<C>,
        mut specs: MultitrackSpecs,
        opts: MultitrackOptions,
    ) -> MultitrackResult<()>
    where
        C: Send + Sync + 'static,
    {
        if opts.status_report_interval.is_zero() {
            return Err(MultitrackError::Config(
                "status report interval must be positive".to_string(),
            ));
        }
        specs.validate()?;
        specs.normalize();

        if specs.is_empty() {
            info!("no resources to track");
            return Ok(());
        }

        // Register everything first so an early ready cannot see an empty registry.
        let mut registry = Registry::new();
        for (kind, spec) in specs.iter() {
            registry.register(kind, &spec.resource_name);
        }

        let (verdict_tx, mut verdict_rx) = mpsc::unbounded_channel();
        let core = Arc::new(Core::new(registry, verdict_tx, self.sink.clone()));
        let tracker_opts = Arc::new(opts.tracker.clone());

        let mut handles = Vec::with_capacity(specs.len());
        for (kind, spec) in specs.iter() {
            let spec = Arc::new(spec.clone());
            let tracker = trackers.for_kind(kind).clone();
            let feed = TrackerFeed::new(kind, spec.clone(), core.clone());
            let core = core.clone();
            let client = client.clone();
            let tracker_opts = tracker_opts.clone();

            info!(
                %kind,
                resource = %spec.resource_name,
                namespace = %spec.namespace,
                fail_mode = %spec.fail_mode(),
                allowed_failures = spec.allow_failures_count(),
                "tracking started"
            );

            handles.push(tokio::spawn(async move {
                let result = tracker
                    .track(client.as_ref(), &spec, &tracker_opts, feed)
                    .await;
                core.handle_tracker_exit(kind, &spec.resource_name, result)
                    .await;
            }));
        }
        let _workers = Workers(handles);

        let period = opts.status_report_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                biased;

                verdict = verdict_rx.recv() => {
                    return match verdict {
                        Some(Verdict::Succeeded) => Ok(()),
                        Some(Verdict::Failed(summary)) => Err(MultitrackError::RolloutFailed(summary)),
                        Some(Verdict::Fatal(err)) => Err(err),
                        None => Err(MultitrackError::VerdictChannelClosed),
                    };
                }
                _ = ticker.tick() => core.emit_report().await,
            }
        }
    }
}

/// Track every resource in `specs` with the given per-kind trackers,
/// printing status reports to stdout.
pub async fn multitrack<C>(
    client: Arc<C>,
    trackers: &Trackers<C>,
    specs: MultitrackSpecs,
    opts: MultitrackOptions,
) -> MultitrackResult<()>
where
    C: Send + Sync + 'static,
{
    Multitracker::new().run(client, trackers, specs, opts).await
}
