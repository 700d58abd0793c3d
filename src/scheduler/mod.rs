//! Interpretation of Grid Engine queue listings.
//!
//! - [`parser`]: finds a job's entry line and its raw state token
//! - [`state`]: maps the token to a [`LifecycleState`]
//! - [`job`]: [`JobHandle`], one job id plus its latest observation

pub mod job;
pub mod parser;
pub mod state;

pub use job::{JobHandle, JobId, JobObservation};
pub use state::{classify, LifecycleState};
