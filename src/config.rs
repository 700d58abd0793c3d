use std::time::Duration;

/// A scheduler command: program plus fixed leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Commands used to reach a Grid Engine cluster.
///
/// All three must be available on the host running the monitor.
#[derive(Debug, Clone)]
pub struct SgeConfig {
    /// Queue listing
    pub qstat: CommandConfig,
    /// Batched cancellation; job ids are appended as arguments
    pub qdel: CommandConfig,
    /// Submission; the job script is written to stdin
    pub qsub: CommandConfig,
    /// Pause after a successful submit so the job shows up in the next listing
    pub submit_settle_ms: Option<u64>,
}

impl Default for SgeConfig {
    fn default() -> Self {
        Self {
            qstat: CommandConfig::new("qstat"),
            qdel: CommandConfig::new("qdel"),
            qsub: CommandConfig::new("qsub"),
            submit_settle_ms: None,
        }
    }
}

impl SgeConfig {
    pub fn submit_settle(&self) -> Option<Duration> {
        self.submit_settle_ms.map(Duration::from_millis)
    }
}

/// Polling behaviour of the cohort monitor and the start/finish barrier.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Delay between poll cycles
    pub poll_interval_ms: u64,
    /// Delay between polls while the barrier waits for jobs to start
    pub start_poll_interval_ms: u64,
    /// Cancel jobs left in an error state once monitoring ends
    pub cancel_stuck: bool,
    /// Consecutive failed queue listings tolerated before giving up.
    /// `1` fails on the first error.
    pub max_poll_failures: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            start_poll_interval_ms: 1_000,
            cancel_stuck: true,
            max_poll_failures: 1,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn start_poll_interval(&self) -> Duration {
        Duration::from_millis(self.start_poll_interval_ms)
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self.start_poll_interval_ms = self.start_poll_interval_ms.min(ms);
        self
    }

    pub fn with_cancel_stuck(mut self, cancel_stuck: bool) -> Self {
        self.cancel_stuck = cancel_stuck;
        self
    }

    pub fn with_max_poll_failures(mut self, max: u32) -> Self {
        self.max_poll_failures = max.max(1);
        self
    }
}
