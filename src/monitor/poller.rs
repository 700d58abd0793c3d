use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cluster::QueueSource;
use crate::error::{GridError, Result};

/// Fetches queue listings on behalf of a monitoring loop, honouring the
/// shutdown token and the consecutive-failure limit.
pub(crate) struct Poller<'a> {
    source: &'a dyn QueueSource,
    shutdown: &'a CancellationToken,
    max_failures: u32,
    polls: u32,
}

impl<'a> Poller<'a> {
    pub(crate) fn new(
        source: &'a dyn QueueSource,
        shutdown: &'a CancellationToken,
        max_failures: u32,
    ) -> Self {
        Self {
            source,
            shutdown,
            max_failures: max_failures.max(1),
            polls: 0,
        }
    }

    /// Number of successful listings so far.
    pub(crate) fn polls(&self) -> u32 {
        self.polls
    }

    /// Sleep for `delay`. Returns `false` if shutdown was requested first.
    pub(crate) async fn wait(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Fetch the next listing.
    ///
    /// `Ok(None)` means shutdown was requested. A failed listing is retried
    /// after `retry_delay` until `max_failures` consecutive attempts have
    /// failed, at which point the last error is returned.
    pub(crate) async fn next_snapshot(&mut self, retry_delay: Duration) -> Result<Option<String>> {
        let mut failures = 0u32;
        loop {
            let result = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(None),
                result = self.source.snapshot() => result,
            };

            match result {
                Ok(snapshot) => {
                    self.polls += 1;
                    return Ok(Some(snapshot));
                }
                Err(e) => {
                    failures += 1;
                    if failures >= self.max_failures {
                        tracing::error!(attempts = failures, error = %e, "Queue listing unavailable");
                        return Err(GridError::PollFailed {
                            attempts: failures,
                            source: Box::new(e),
                        });
                    }
                    tracing::warn!(
                        attempts = failures,
                        max_attempts = self.max_failures,
                        error = %e,
                        "Queue listing failed, keeping all jobs active"
                    );
                    if !self.wait(retry_delay).await {
                        return Ok(None);
                    }
                }
            }
        }
    }
}
