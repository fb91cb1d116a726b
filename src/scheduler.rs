//! Debounced regeneration scheduling
//!
//! [`RegenerationScheduler`] turns the host's notification stream into regeneration
//! runs. Relevant notifications re-arm a trailing-edge [`DebounceTimer`]; when the
//! timer fires the [`RunTarget`] is invoked with the most recent schema snapshot.
//! At most one run is in flight at a time, and timer fires that land while a run
//! is executing coalesce into a single follow-up run.

use crate::error::TypegenError;
use crate::event::{EventSource, EVENT_CONTRACT_VERSION};
use crate::reporter::Reporter;
use crate::schema::SchemaSnapshot;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, trace};

/// Default quiescence window
pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

/// What happens when a run reports a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Report a warning and keep watching
    Warn,
    /// Report a fatal error and stop
    Fail,
}

impl FailurePolicy {
    pub fn from_fail_on_error(fail_on_error: bool) -> Self {
        if fail_on_error {
            FailurePolicy::Fail
        } else {
            FailurePolicy::Warn
        }
    }
}

/// A failed artifact within one run
#[derive(Debug)]
pub struct ArtifactFailure {
    pub key: String,
    pub error: TypegenError,
}

/// Outcome of one regeneration run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Keys whose artifacts were rewritten
    pub updated: Vec<String>,
    pub failures: Vec<ArtifactFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The work performed on every trigger
#[async_trait]
pub trait RunTarget: Send + Sync {
    async fn run(&self, schema: SchemaSnapshot) -> RunReport;
}

/// Trailing-edge timer. Every `arm` cancels the pending sleep and starts a new
/// one; `fired` resolves once per expiry of the latest arm.
pub struct DebounceTimer {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
    fire_tx: UnboundedSender<u64>,
    fire_rx: UnboundedReceiver<u64>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        let (fire_tx, fire_rx) = unbounded_channel();
        Self {
            delay,
            generation: 0,
            pending: None,
            fire_tx,
            fire_rx,
        }
    }

    /// Cancel any pending expiry and schedule a new one `delay` from now
    pub fn arm(&mut self) {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let delay = self.delay;
        let fire_tx = self.fire_tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fire_tx.send(generation);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Resolve when the current arm expires. Signals from cancelled arms are
    /// discarded. Cancel safe.
    pub async fn fired(&mut self) {
        loop {
            match self.fire_rx.recv().await {
                Some(generation) if generation == self.generation && self.pending.is_some() => {
                    self.pending = None;
                    return;
                }
                Some(stale) => trace!(generation = stale, "Discarding stale timer signal"),
                None => std::future::pending::<()>().await,
            }
        }
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Drives regeneration runs from a host event source
pub struct RegenerationScheduler {
    target: Arc<dyn RunTarget>,
    reporter: Arc<dyn Reporter>,
    delay: Duration,
    policy: FailurePolicy,
}

impl RegenerationScheduler {
    pub fn new(
        target: Arc<dyn RunTarget>,
        reporter: Arc<dyn Reporter>,
        delay: Duration,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            target,
            reporter,
            delay,
            policy,
        }
    }

    /// Run until the event source closes (`Ok`) or a failure under
    /// [`FailurePolicy::Fail`] stops the scheduler (`Fatal`).
    ///
    /// One run starts immediately against the source's current schema.
    pub async fn run(&self, source: &dyn EventSource) -> Result<(), TypegenError> {
        if source.contract_version() != EVENT_CONTRACT_VERSION {
            return Err(TypegenError::Config(format!(
                "event source implements contract version {}, expected {}",
                source.contract_version(),
                EVENT_CONTRACT_VERSION
            )));
        }

        let mut notifications = source.subscribe();
        let mut timer = DebounceTimer::new(self.delay);
        let mut latest = source.current_schema();
        let mut in_flight = Some(self.spawn_run(latest.clone()));
        let mut rerun = false;
        let mut closed = false;

        info!(delay_ms = self.delay.as_millis() as u64, policy = ?self.policy, "Regeneration scheduler started");

        loop {
            tokio::select! {
                notification = notifications.recv(), if !closed => match notification {
                    Some(notification) if notification.action.triggers_regeneration() => {
                        debug!(action = %notification.action, "Relevant notification, re-arming timer");
                        latest = notification.schema;
                        timer.arm();
                    }
                    Some(notification) => {
                        trace!(action = %notification.action, "Ignoring notification");
                    }
                    None => {
                        debug!("Event source closed");
                        closed = true;
                        timer.cancel();
                        if in_flight.is_none() {
                            return Ok(());
                        }
                    }
                },
                _ = timer.fired() => {
                    if in_flight.is_some() {
                        trace!("Run in flight, queueing follow-up");
                        rerun = true;
                    } else {
                        in_flight = Some(self.spawn_run(latest.clone()));
                    }
                },
                joined = join_run(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    let report = joined.map_err(|e| {
                        TypegenError::Fatal(format!("regeneration task failed: {}", e))
                    })?;
                    if let Err(err) = self.apply_report(report) {
                        timer.cancel();
                        return Err(err);
                    }
                    if rerun {
                        rerun = false;
                        in_flight = Some(self.spawn_run(latest.clone()));
                    } else if closed {
                        return Ok(());
                    }
                },
            }
        }
    }

    /// Run the target once against `schema` without debouncing and route the
    /// report through the failure policy. Returns the updated keys.
    pub async fn run_once(&self, schema: SchemaSnapshot) -> Result<Vec<String>, TypegenError> {
        let report = self.target.run(schema).await;
        let updated = report.updated.clone();
        self.apply_report(report)?;
        Ok(updated)
    }

    fn spawn_run(&self, schema: SchemaSnapshot) -> JoinHandle<RunReport> {
        let target = Arc::clone(&self.target);
        debug!(schema = schema.source(), "Starting regeneration run");
        tokio::spawn(async move { target.run(schema).await })
    }

    fn apply_report(&self, report: RunReport) -> Result<(), TypegenError> {
        for key in &report.updated {
            self.reporter
                .info(&format!("definition for {} has been updated.", key));
        }

        for failure in report.failures {
            let message = format!(
                "failed to generate types for {}: {}",
                failure.key, failure.error
            );
            match self.policy {
                FailurePolicy::Warn => self.reporter.warn(&message),
                FailurePolicy::Fail => {
                    self.reporter.panic(&message);
                    return Err(TypegenError::Fatal(message));
                }
            }
        }

        Ok(())
    }
}

async fn join_run(run: &mut Option<JoinHandle<RunReport>>) -> Result<RunReport, JoinError> {
    match run.as_mut() {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
