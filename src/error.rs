use thiserror::Error;

use crate::scheduler::JobId;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Failed to launch {program}: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {code:?}: {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Queue listing unavailable after {attempts} consecutive attempts: {source}")]
    PollFailed {
        attempts: u32,
        #[source]
        source: Box<GridError>,
    },

    #[error("No jobs to monitor")]
    EmptyCohort,

    #[error("Job {0} appears more than once in the cohort")]
    DuplicateJob(JobId),

    #[error("Unrecognized submit output: {0:?}")]
    SubmitOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GridError>;
