//! Collaborators that talk to the cluster scheduler.
//!
//! The monitor only depends on the traits defined here:
//!
//! - [`QueueSource`]: the full queue listing as raw text
//! - [`JobCanceller`]: one batched cancel request
//! - [`JobSubmitter`]: submit a prepared request and get the job id back
//!
//! [`SgeCluster`] implements all three on top of `qstat`, `qdel` and `qsub`.

pub mod sge;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::scheduler::{JobHandle, JobId};

pub use sge::{parse_submit_output, SgeCluster};

#[async_trait]
pub trait QueueSource: Send + Sync {
    /// Current queue listing. An empty queue is `Ok` with empty or header-only text.
    async fn snapshot(&self) -> Result<String>;
}

#[async_trait]
pub trait JobCanceller: Send + Sync {
    /// Ask the scheduler to remove every job in `ids`, in a single request.
    async fn cancel(&self, ids: &[JobId]) -> Result<()>;
}

#[async_trait]
pub trait JobSubmitter: Send + Sync {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmittedJob>;
}

/// An already formatted submission: extra scheduler arguments plus the job
/// script fed on stdin.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub args: Vec<String>,
    pub script: String,
}

impl SubmitRequest {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            args: Vec::new(),
            script: script.into(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedJob {
    pub id: JobId,
    pub name: String,
}

impl SubmittedJob {
    /// Seed a handle for monitoring.
    pub fn into_handle(self) -> JobHandle {
        JobHandle::with_name(self.id, self.name)
    }
}
