use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cluster::QueueSource;
use crate::error::Result;
use crate::scheduler::parser;
use crate::scheduler::state::{classify, LifecycleState};

/// Identifier assigned by the scheduler at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// What one queue snapshot said about a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobObservation {
    /// Raw state column, `None` when the job is not listed or the entry is malformed
    pub status: Option<String>,
    pub state: LifecycleState,
    pub present: bool,
    pub observed_at: DateTime<Utc>,
}

impl JobObservation {
    /// Derive an observation for `id` from a queue listing.
    pub fn from_snapshot(id: &JobId, snapshot: &str) -> Self {
        let entry = parser::find_entry(snapshot, id.as_str());
        let status = entry.and_then(parser::status_field);
        Self {
            status: status.map(str::to_string),
            state: classify(status),
            present: entry.is_some(),
            observed_at: Utc::now(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    pub fn is_error(&self) -> bool {
        self.state == LifecycleState::Error
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Compare everything except the observation time.
    pub fn same_state(&self, other: &JobObservation) -> bool {
        self.status == other.status && self.state == other.state && self.present == other.present
    }
}

/// Tracks one submitted job.
///
/// The handle holds no predicates of its own until it has been refreshed at
/// least once; [`JobHandle::observation`] is `None` before that. Refreshing
/// is always explicit: either against a snapshot the caller already fetched
/// ([`JobHandle::apply_snapshot`]) or by querying a [`QueueSource`].
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: JobId,
    name: Option<String>,
    observation: Option<JobObservation>,
}

impl JobHandle {
    pub fn new(id: impl Into<JobId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            observation: None,
        }
    }

    pub fn with_name(id: impl Into<JobId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            observation: None,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Last observation, if the handle has been refreshed.
    pub fn observation(&self) -> Option<&JobObservation> {
        self.observation.as_ref()
    }

    /// Re-derive the job's state from an already fetched listing.
    pub fn apply_snapshot(&mut self, snapshot: &str) -> &JobObservation {
        let next = JobObservation::from_snapshot(&self.id, snapshot);
        if let Some(previous) = &self.observation {
            if !previous.same_state(&next) {
                tracing::debug!(
                    job_id = %self.id,
                    from = %previous.state,
                    to = %next.state,
                    present = next.present,
                    "Job state changed"
                );
            }
        }
        self.observation.insert(next)
    }

    /// Query the scheduler and re-derive the job's state.
    ///
    /// A job missing from the listing is a normal outcome. Only a failing
    /// queue source is an error, and it leaves the previous observation
    /// untouched.
    pub async fn refresh<S>(&mut self, source: &S) -> Result<&JobObservation>
    where
        S: QueueSource + ?Sized,
    {
        let snapshot = source.snapshot().await?;
        Ok(self.apply_snapshot(&snapshot))
    }

    /// Fresh query: is the job running right now?
    pub async fn is_running<S>(&mut self, source: &S) -> Result<bool>
    where
        S: QueueSource + ?Sized,
    {
        Ok(self.refresh(source).await?.is_running())
    }

    /// Fresh query: is the job stuck in an error state right now?
    pub async fn is_error<S>(&mut self, source: &S) -> Result<bool>
    where
        S: QueueSource + ?Sized,
    {
        Ok(self.refresh(source).await?.is_error())
    }

    /// Fresh query: is the job still listed by the scheduler?
    pub async fn is_present<S>(&mut self, source: &S) -> Result<bool>
    where
        S: QueueSource + ?Sized,
    {
        Ok(self.refresh(source).await?.is_present())
    }
}
