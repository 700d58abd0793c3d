use std::collections::HashSet;

use serde::Serialize;

use crate::error::{GridError, Result};
use crate::scheduler::{JobHandle, JobId};

/// Sizes of the three partitions of a cohort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CohortCounts {
    pub active: usize,
    pub stuck: usize,
    pub finished: usize,
}

impl CohortCounts {
    pub fn total(&self) -> usize {
        self.active + self.stuck + self.finished
    }
}

/// Jobs that moved out of the active set during one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleChanges {
    pub finished: Vec<JobId>,
    pub stuck: Vec<JobId>,
}

impl CycleChanges {
    pub fn is_empty(&self) -> bool {
        self.finished.is_empty() && self.stuck.is_empty()
    }
}

/// The jobs a single monitoring run is responsible for.
///
/// Jobs only ever leave `active`, either to `finished` (no longer listed)
/// or to `stuck` (error state). Neither move is undone, so at every point
/// `active + stuck + finished` equals the size the cohort started with.
#[derive(Debug)]
pub struct Cohort {
    active: Vec<JobHandle>,
    stuck: Vec<JobHandle>,
    finished: Vec<JobId>,
    original_size: usize,
}

impl Cohort {
    /// Reject empty job lists and repeated ids before anything is polled.
    pub fn new(jobs: Vec<JobHandle>) -> Result<Self> {
        if jobs.is_empty() {
            return Err(GridError::EmptyCohort);
        }
        let mut seen = HashSet::with_capacity(jobs.len());
        for job in &jobs {
            if !seen.insert(job.id()) {
                return Err(GridError::DuplicateJob(job.id().clone()));
            }
        }
        let original_size = jobs.len();
        Ok(Self {
            active: jobs,
            stuck: Vec::new(),
            finished: Vec::new(),
            original_size,
        })
    }

    pub fn active(&self) -> &[JobHandle] {
        &self.active
    }

    pub fn stuck(&self) -> &[JobHandle] {
        &self.stuck
    }

    pub fn finished(&self) -> &[JobId] {
        &self.finished
    }

    pub fn original_size(&self) -> usize {
        self.original_size
    }

    pub fn is_done(&self) -> bool {
        self.active.is_empty()
    }

    pub fn counts(&self) -> CohortCounts {
        CohortCounts {
            active: self.active.len(),
            stuck: self.stuck.len(),
            finished: self.finished.len(),
        }
    }

    pub fn active_ids(&self) -> Vec<JobId> {
        self.active.iter().map(|job| job.id().clone()).collect()
    }

    pub fn stuck_ids(&self) -> Vec<JobId> {
        self.stuck.iter().map(|job| job.id().clone()).collect()
    }

    /// Evaluate every active job once against `snapshot`, in cohort order.
    ///
    /// A job no longer listed is finished, and that takes precedence over
    /// its error classification. A job in an error state moves to `stuck`.
    /// Everything else stays active. The new partitions are built from a
    /// full pass, so removing one job never causes another to be skipped.
    pub fn apply_snapshot(&mut self, snapshot: &str) -> CycleChanges {
        let mut changes = CycleChanges::default();
        let mut still_active = Vec::with_capacity(self.active.len());

        for mut job in std::mem::take(&mut self.active) {
            let observation = job.apply_snapshot(snapshot).clone();
            if !observation.is_present() {
                tracing::info!(job_id = %job.id(), "Job left the queue");
                changes.finished.push(job.id().clone());
                self.finished.push(job.id().clone());
            } else if observation.is_error() {
                tracing::warn!(
                    job_id = %job.id(),
                    status = observation.status.as_deref().unwrap_or("-"),
                    "Job is in error state, removing it from monitoring"
                );
                changes.stuck.push(job.id().clone());
                self.stuck.push(job);
            } else {
                still_active.push(job);
            }
        }

        self.active = still_active;
        debug_assert_eq!(self.counts().total(), self.original_size);
        changes
    }
}
