//! Continuous workflow scheduling.

use async_trait::async_trait;
use futures::FutureExt;
use mockable::Clock;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::PrAutomationService;
use crate::automation::{
    domain::AutomationResult,
    ports::{ContentGenerator, SourceControlClient, TrackingStore},
};

/// Default pause between successful cycles.
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(3600);

/// Pause after a failed cycle.
pub const DEFAULT_FAILURE_BACKOFF: Duration = Duration::from_secs(60);

/// One unit of scheduled work.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowCycle: Send + Sync {
    /// Runs one cycle and reports its outcome.
    async fn run_cycle(&self) -> AutomationResult;
}

#[async_trait]
impl<S, G, T, C> WorkflowCycle for PrAutomationService<S, G, T, C>
where
    S: SourceControlClient,
    G: ContentGenerator,
    T: TrackingStore,
    C: Clock + Send + Sync,
{
    async fn run_cycle(&self) -> AutomationResult {
        self.run_single_workflow().await
    }
}

#[async_trait]
impl<W> WorkflowCycle for Arc<W>
where
    W: WorkflowCycle + ?Sized,
{
    async fn run_cycle(&self) -> AutomationResult {
        self.as_ref().run_cycle().await
    }
}

/// Timing for [`ContinuousWorkflow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Pause after a successful cycle.
    pub interval: Duration,
    /// Pause after a failed cycle.
    pub failure_backoff: Duration,
}

impl SchedulerConfig {
    /// Creates a config with the given interval and the default backoff.
    #[must_use]
    pub const fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            failure_backoff: DEFAULT_FAILURE_BACKOFF,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::with_interval(DEFAULT_CYCLE_INTERVAL)
    }
}

/// Counts reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    /// Cycles run.
    pub cycles: u64,
    /// Cycles that reported failure.
    pub failed_cycles: u64,
}

/// Repeats a [`WorkflowCycle`] until cancelled.
///
/// Cancellation is observed before each cycle and during the pause between
/// cycles; a running cycle is always allowed to finish. A cycle that panics
/// counts as failed and the loop carries on after the failure backoff.
#[derive(Debug)]
pub struct ContinuousWorkflow<W>
where
    W: WorkflowCycle,
{
    cycle: W,
    config: SchedulerConfig,
}

impl<W> ContinuousWorkflow<W>
where
    W: WorkflowCycle,
{
    /// Creates a scheduler for `cycle`.
    #[must_use]
    pub const fn new(cycle: W, config: SchedulerConfig) -> Self {
        Self { cycle, config }
    }

    /// Runs cycles until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> SchedulerSummary {
        info!(
            interval_secs = self.config.interval.as_secs(),
            backoff_secs = self.config.failure_backoff.as_secs(),
            "continuous workflow started"
        );
        let mut summary = SchedulerSummary::default();

        while !shutdown.is_cancelled() {
            let outcome = AssertUnwindSafe(self.cycle.run_cycle())
                .catch_unwind()
                .await;
            summary.cycles = summary.cycles.saturating_add(1);

            let pause = match outcome {
                Ok(result) if result.success => {
                    info!(run = %result.run_id, cycle = summary.cycles, "workflow cycle completed");
                    self.config.interval
                }
                Ok(result) => {
                    summary.failed_cycles = summary.failed_cycles.saturating_add(1);
                    error!(
                        run = %result.run_id,
                        cycle = summary.cycles,
                        message = %result.message,
                        "workflow cycle failed; backing off"
                    );
                    self.config.failure_backoff
                }
                Err(payload) => {
                    summary.failed_cycles = summary.failed_cycles.saturating_add(1);
                    error!(
                        cycle = summary.cycles,
                        panic = panic_message(payload.as_ref()),
                        "workflow cycle panicked; backing off"
                    );
                    self.config.failure_backoff
                }
            };

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(pause) => {}
            }
        }

        info!(
            cycles = summary.cycles,
            failed_cycles = summary.failed_cycles,
            "continuous workflow stopped"
        );
        summary
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
