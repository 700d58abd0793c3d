//! Blocking waits on a cohort of submitted jobs.
//!
//! [`CohortMonitor`] is the primary API: it polls the queue until every job
//! has either left it or been found in an error state, then cancels the
//! stuck ones in a single batch.
//!
//! [`barrier`] keeps the older start/finish wait, which only looks at
//! whether jobs are running.
//!
//! # Cycle
//!
//! 1. Fetch one queue listing (shared by every job in the cycle)
//! 2. Apply it to each active job in cohort order
//! 3. Move absent jobs to `finished`, error jobs to `stuck`
//! 4. Sleep `poll_interval`, repeat until nothing is active

pub mod barrier;
pub mod cohort;
mod poller;

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::cluster::{JobCanceller, QueueSource};
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::scheduler::{JobHandle, JobId};

pub use barrier::{wait_for_cohort, BarrierReport, BarrierStart};
pub use cohort::{Cohort, CohortCounts, CycleChanges};
use poller::Poller;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorOutcome {
    /// Every job left the active set
    Completed,
    /// Shutdown was requested before the active set emptied
    Interrupted,
}

/// What happened to the jobs left in an error state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    /// No job was stuck
    NotNeeded,
    /// Stuck jobs exist but cancellation is turned off, or the run was interrupted
    Skipped,
    /// One cancel request was sent for every stuck job
    Issued,
    /// The cancel request failed; the jobs are still stuck in the queue
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorReport {
    pub outcome: MonitorOutcome,
    pub cycles: u32,
    pub finished: Vec<JobId>,
    pub stuck: Vec<JobId>,
    /// Jobs still being tracked when the run ended; empty unless interrupted
    pub active: Vec<JobId>,
    pub cancellation: CancelOutcome,
}

impl MonitorReport {
    fn from_cohort(
        cohort: &Cohort,
        outcome: MonitorOutcome,
        cycles: u32,
        cancellation: CancelOutcome,
    ) -> Self {
        Self {
            outcome,
            cycles,
            finished: cohort.finished().to_vec(),
            stuck: cohort.stuck_ids(),
            active: cohort.active_ids(),
            cancellation,
        }
    }

    /// Completed with no job left in an error state.
    pub fn is_clean(&self) -> bool {
        self.outcome == MonitorOutcome::Completed && self.stuck.is_empty()
    }
}

/// Drives a cohort of jobs until none is active any more.
pub struct CohortMonitor {
    source: Arc<dyn QueueSource>,
    canceller: Arc<dyn JobCanceller>,
    config: MonitorConfig,
}

impl CohortMonitor {
    pub fn new(
        source: Arc<dyn QueueSource>,
        canceller: Arc<dyn JobCanceller>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            source,
            canceller,
            config,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Monitor `jobs` until each has left the queue or is stuck in error.
    ///
    /// An empty or duplicated job list is rejected before the queue is
    /// queried. When `shutdown` fires the current split is returned as an
    /// [`MonitorOutcome::Interrupted`] report and nothing is cancelled.
    pub async fn run(
        &self,
        jobs: Vec<JobHandle>,
        shutdown: &CancellationToken,
    ) -> Result<MonitorReport> {
        let mut cohort = match Cohort::new(jobs) {
            Ok(cohort) => cohort,
            Err(e) => {
                tracing::error!(error = %e, "Refusing to monitor");
                return Err(e);
            }
        };

        let (outcome, cycles) = self.drive(&mut cohort, shutdown).await?;
        let cancellation = match outcome {
            MonitorOutcome::Completed => self.settle_stuck(&cohort).await,
            MonitorOutcome::Interrupted => {
                tracing::warn!(
                    active = cohort.active().len(),
                    stuck = cohort.stuck().len(),
                    "Monitoring interrupted"
                );
                if cohort.stuck().is_empty() {
                    CancelOutcome::NotNeeded
                } else {
                    CancelOutcome::Skipped
                }
            }
        };

        Ok(MonitorReport::from_cohort(
            &cohort,
            outcome,
            cycles,
            cancellation,
        ))
    }

    /// Run poll cycles against an existing cohort.
    ///
    /// The cohort is only mutated between awaits, so whatever ends this call
    /// (completion, shutdown, a poll error, or the future being dropped)
    /// leaves it in a consistent split. Returns the outcome and the number
    /// of completed cycles.
    pub async fn drive(
        &self,
        cohort: &mut Cohort,
        shutdown: &CancellationToken,
    ) -> Result<(MonitorOutcome, u32)> {
        let interval = self.config.poll_interval();
        let mut poller = Poller::new(
            self.source.as_ref(),
            shutdown,
            self.config.max_poll_failures,
        );
        let mut last_counts = cohort.counts();

        tracing::info!(
            jobs = last_counts.active,
            interval_ms = self.config.poll_interval_ms,
            "Monitoring jobs for completion"
        );

        while !cohort.is_done() {
            let Some(snapshot) = poller.next_snapshot(interval).await? else {
                return Ok((MonitorOutcome::Interrupted, poller.polls()));
            };

            cohort.apply_snapshot(&snapshot);
            let counts = cohort.counts();
            if counts != last_counts {
                tracing::info!(
                    cycle = poller.polls(),
                    active = counts.active,
                    stuck = counts.stuck,
                    finished = counts.finished,
                    "Jobs remaining in queue"
                );
                last_counts = counts;
            } else {
                tracing::debug!(cycle = poller.polls(), active = counts.active, "No change");
            }

            if cohort.is_done() {
                break;
            }
            if !poller.wait(interval).await {
                return Ok((MonitorOutcome::Interrupted, poller.polls()));
            }
        }

        tracing::info!(cycles = poller.polls(), "No jobs remaining in the job queue");
        Ok((MonitorOutcome::Completed, poller.polls()))
    }

    /// Report stuck jobs and, if configured, cancel them in one request.
    async fn settle_stuck(&self, cohort: &Cohort) -> CancelOutcome {
        let stuck = cohort.stuck_ids();
        if stuck.is_empty() {
            return CancelOutcome::NotNeeded;
        }

        let ids: Vec<&str> = stuck.iter().map(JobId::as_str).collect();
        tracing::error!(count = stuck.len(), jobs = ?ids, "Jobs were left in error state");

        if !self.config.cancel_stuck {
            return CancelOutcome::Skipped;
        }

        tracing::debug!(count = stuck.len(), "Cancelling jobs left in error state");
        match self.canceller.cancel(&stuck).await {
            Ok(()) => {
                tracing::info!(count = stuck.len(), "Cancel request sent for stuck jobs");
                CancelOutcome::Issued
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to cancel stuck jobs");
                CancelOutcome::Failed(e.to_string())
            }
        }
    }
}
