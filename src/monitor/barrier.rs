//! Start/finish barrier over a set of jobs.
//!
//! Waits until every job is running, then until none is. Unlike
//! [`CohortMonitor`](super::CohortMonitor) it has no notion of stuck jobs: a
//! job sitting in `Eqw` keeps phase 1 waiting until it leaves the queue.

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::cluster::QueueSource;
use crate::config::MonitorConfig;
use crate::error::{GridError, Result};
use crate::monitor::poller::Poller;
use crate::monitor::MonitorOutcome;
use crate::scheduler::{JobHandle, JobId};

/// How phase 1 ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierStart {
    /// Every job was seen running in the same listing
    AllRunning,
    /// Every job left the queue before all of them were running together
    AllAbsent,
}

#[derive(Debug, Clone, Serialize)]
pub struct BarrierReport {
    pub outcome: MonitorOutcome,
    /// `None` when interrupted during phase 1
    pub start: Option<BarrierStart>,
    pub polls: u32,
    /// Jobs still listed but not running at the end
    pub lingering: Vec<JobId>,
}

fn all_running(jobs: &[JobHandle]) -> bool {
    jobs.iter()
        .all(|job| job.observation().is_some_and(|o| o.is_running()))
}

fn any_running(jobs: &[JobHandle]) -> bool {
    jobs.iter()
        .any(|job| job.observation().is_some_and(|o| o.is_running()))
}

fn all_absent(jobs: &[JobHandle]) -> bool {
    jobs.iter()
        .all(|job| job.observation().is_some_and(|o| !o.is_present()))
}

fn apply(jobs: &mut [JobHandle], snapshot: &str) {
    for job in jobs.iter_mut() {
        job.apply_snapshot(snapshot);
    }
}

/// Block until all `jobs` have started and then finished.
///
/// Phase 1 polls every `start_poll_interval` until all jobs are running, or
/// until all have left the queue. Phase 2 runs only if they all started and
/// polls every `poll_interval` until none is running.
pub async fn wait_for_cohort(
    source: &dyn QueueSource,
    jobs: &mut [JobHandle],
    config: &MonitorConfig,
    shutdown: &CancellationToken,
) -> Result<BarrierReport> {
    if jobs.is_empty() {
        tracing::error!("No jobs are present in queue for task");
        return Err(GridError::EmptyCohort);
    }

    let mut poller = Poller::new(source, shutdown, config.max_poll_failures);
    let start_interval = config.start_poll_interval();
    let finish_interval = config.poll_interval();

    tracing::debug!(jobs = jobs.len(), "Waiting for all jobs to start running");
    let start = loop {
        let Some(snapshot) = poller.next_snapshot(start_interval).await? else {
            return Ok(interrupted(jobs, None, poller.polls()));
        };
        apply(jobs, &snapshot);

        if all_running(jobs) {
            tracing::debug!(polls = poller.polls(), "All jobs are running");
            break BarrierStart::AllRunning;
        }
        if all_absent(jobs) {
            tracing::warn!("All jobs exited while waiting for jobs to start");
            break BarrierStart::AllAbsent;
        }
        if !poller.wait(start_interval).await {
            return Ok(interrupted(jobs, None, poller.polls()));
        }
    };

    if start == BarrierStart::AllRunning {
        tracing::debug!("Waiting for all jobs to finish");
        while any_running(jobs) {
            if !poller.wait(finish_interval).await {
                return Ok(interrupted(jobs, Some(start), poller.polls()));
            }
            let Some(snapshot) = poller.next_snapshot(finish_interval).await? else {
                return Ok(interrupted(jobs, Some(start), poller.polls()));
            };
            apply(jobs, &snapshot);
        }
    }

    let lingering = lingering(jobs);
    if lingering.is_empty() {
        tracing::debug!("No jobs remaining in the job queue");
    } else {
        tracing::warn!(
            count = lingering.len(),
            "Some jobs are remaining in the job queue but are not running"
        );
    }

    Ok(BarrierReport {
        outcome: MonitorOutcome::Completed,
        start: Some(start),
        polls: poller.polls(),
        lingering,
    })
}

fn lingering(jobs: &[JobHandle]) -> Vec<JobId> {
    jobs.iter()
        .filter(|job| {
            job.observation()
                .is_some_and(|o| o.is_present() && !o.is_running())
        })
        .map(|job| job.id().clone())
        .collect()
}

fn interrupted(jobs: &[JobHandle], start: Option<BarrierStart>, polls: u32) -> BarrierReport {
    tracing::warn!(polls, "Barrier wait interrupted");
    BarrierReport {
        outcome: MonitorOutcome::Interrupted,
        start,
        polls,
        lingering: lingering(jobs),
    }
}
