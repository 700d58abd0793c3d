use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use gridwatch::cluster::{JobSubmitter, QueueSource, SgeCluster, SubmitRequest};
use gridwatch::config::{CommandConfig, MonitorConfig, SgeConfig};
use gridwatch::monitor::{
    wait_for_cohort, BarrierReport, CancelOutcome, CohortMonitor, MonitorOutcome, MonitorReport,
};
use gridwatch::scheduler::{JobHandle, JobId, JobObservation};
use gridwatch::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "gridwatch")]
#[command(version)]
#[command(about = "Submit Grid Engine jobs and wait for them to leave the queue")]
#[command(propagate_version = true)]
struct Args {
    #[command(flatten)]
    scheduler: SchedulerArgs,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "table")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Show the current state of one or more jobs
    Status {
        /// Job IDs as printed by qsub
        #[arg(required = true)]
        job_ids: Vec<String>,
    },

    /// Wait for jobs to leave the queue, cancelling any stuck in error state
    Watch {
        /// Job IDs as printed by qsub
        #[arg(required = true)]
        job_ids: Vec<String>,

        #[command(flatten)]
        monitor: MonitorArgs,
    },

    /// Submit a job script with qsub
    Submit {
        /// Job script, fed to qsub on stdin
        #[arg(long)]
        script: PathBuf,

        /// Wait for the submitted job to finish
        #[arg(long)]
        wait: bool,

        /// Pause after submitting so the job shows up in the queue listing
        #[arg(long, env = "GRIDWATCH_SETTLE_MS")]
        settle_ms: Option<u64>,

        #[command(flatten)]
        monitor: MonitorArgs,

        /// Extra arguments passed to qsub, e.g. `-- -N align -j y`
        #[arg(last = true)]
        qsub_args: Vec<String>,
    },
}

// =============================================================================
// Shared Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct SchedulerArgs {
    /// Queue listing command
    #[arg(long, global = true, env = "GRIDWATCH_QSTAT", default_value = "qstat")]
    qstat: String,

    /// Cancel command
    #[arg(long, global = true, env = "GRIDWATCH_QDEL", default_value = "qdel")]
    qdel: String,

    /// Submit command
    #[arg(long, global = true, env = "GRIDWATCH_QSUB", default_value = "qsub")]
    qsub: String,
}

#[derive(Parser, Debug)]
struct MonitorArgs {
    /// Delay between queue polls in milliseconds
    #[arg(long, default_value = "5000")]
    interval_ms: u64,

    /// Leave jobs stuck in error state in the queue
    #[arg(long)]
    no_cancel: bool,

    /// Consecutive failed queue listings tolerated before giving up
    #[arg(long, default_value = "1")]
    max_poll_failures: u32,

    /// Wait for all jobs to start, then for all to stop running
    #[arg(long)]
    barrier: bool,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

impl SchedulerArgs {
    fn to_config(&self) -> SgeConfig {
        SgeConfig {
            qstat: CommandConfig::new(&self.qstat),
            qdel: CommandConfig::new(&self.qdel),
            qsub: CommandConfig::new(&self.qsub),
            submit_settle_ms: None,
        }
    }
}

impl MonitorArgs {
    fn to_config(&self) -> MonitorConfig {
        MonitorConfig::default()
            .with_poll_interval_ms(self.interval_ms)
            .with_cancel_stuck(!self.no_cancel)
            .with_max_poll_failures(self.max_poll_failures)
    }
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct JobStatusOutput {
    job_id: JobId,
    #[serde(flatten)]
    observation: JobObservation,
}

#[derive(Serialize)]
struct SubmitOutput {
    job_id: JobId,
    name: String,
}

// =============================================================================
// Command Handlers
// =============================================================================

async fn handle_status(
    cluster: &SgeCluster,
    job_ids: Vec<String>,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = cluster.snapshot().await?;
    let rows: Vec<JobStatusOutput> = job_ids
        .into_iter()
        .map(|id| {
            let mut handle = JobHandle::new(id);
            let observation = handle.apply_snapshot(&snapshot).clone();
            JobStatusOutput {
                job_id: handle.id().clone(),
                observation,
            }
        })
        .collect();

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => {
            println!("{:<12} {:<8} {:<10} PRESENT", "JOB ID", "STATUS", "STATE");
            println!("{}", "-".repeat(40));
            for row in &rows {
                println!(
                    "{:<12} {:<8} {:<10} {}",
                    row.job_id,
                    row.observation.status.as_deref().unwrap_or("-"),
                    row.observation.state,
                    if row.observation.present { "yes" } else { "no" }
                );
            }
        }
    }
    Ok(())
}

/// Returns the process exit code.
async fn handle_watch(
    cluster: Arc<SgeCluster>,
    jobs: Vec<JobHandle>,
    args: &MonitorArgs,
    output_format: &OutputFormat,
) -> Result<i32, Box<dyn std::error::Error>> {
    let shutdown = install_shutdown_handler()?;
    let config = args.to_config();

    if args.barrier {
        let mut jobs = jobs;
        let report = wait_for_cohort(cluster.as_ref(), &mut jobs, &config, &shutdown).await?;
        print_barrier_report(&report, output_format)?;
        return Ok(match report.outcome {
            MonitorOutcome::Completed => 0,
            MonitorOutcome::Interrupted => 130,
        });
    }

    let monitor = CohortMonitor::new(cluster.clone(), cluster, config);
    let report = monitor.run(jobs, &shutdown).await?;
    print_monitor_report(&report, output_format)?;

    Ok(match report.outcome {
        MonitorOutcome::Interrupted => 130,
        MonitorOutcome::Completed if report.stuck.is_empty() => 0,
        MonitorOutcome::Completed => 1,
    })
}

async fn handle_submit(
    cluster: Arc<SgeCluster>,
    script: PathBuf,
    qsub_args: Vec<String>,
    wait: bool,
    monitor: &MonitorArgs,
    output_format: &OutputFormat,
) -> Result<i32, Box<dyn std::error::Error>> {
    let request = SubmitRequest {
        args: qsub_args,
        script: tokio::fs::read_to_string(&script).await?,
    };
    let job = cluster.submit(&request).await?;

    match output_format {
        OutputFormat::Json => {
            let output = SubmitOutput {
                job_id: job.id.clone(),
                name: job.name.clone(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            println!("Job submitted successfully!");
            println!("Job ID:   {}", job.id);
            println!("Job Name: {}", job.name);
        }
    }

    if !wait {
        return Ok(0);
    }
    handle_watch(cluster, vec![job.into_handle()], monitor, output_format).await
}

fn join_ids(ids: &[JobId]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter()
        .map(JobId::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_monitor_report(
    report: &MonitorReport,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => {
            println!("Monitor Report");
            println!("{}", "=".repeat(40));
            println!("Outcome:  {:?}", report.outcome);
            println!("Cycles:   {}", report.cycles);
            println!("Finished: {}", join_ids(&report.finished));
            println!("Stuck:    {}", join_ids(&report.stuck));
            if !report.active.is_empty() {
                println!("Active:   {}", join_ids(&report.active));
            }
            let cancellation = match &report.cancellation {
                CancelOutcome::NotNeeded => "not needed".to_string(),
                CancelOutcome::Skipped => "skipped".to_string(),
                CancelOutcome::Issued => "cancel request sent".to_string(),
                CancelOutcome::Failed(e) => format!("failed: {}", e),
            };
            println!("Cancel:   {}", cancellation);
        }
    }
    Ok(())
}

fn print_barrier_report(
    report: &BarrierReport,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => {
            println!("Barrier Report");
            println!("{}", "=".repeat(40));
            println!("Outcome:   {:?}", report.outcome);
            match report.start {
                Some(start) => println!("Start:     {:?}", start),
                None => println!("Start:     -"),
            }
            println!("Polls:     {}", report.polls);
            println!("Lingering: {}", join_ids(&report.lingering));
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = args.scheduler.to_config();
    if let Commands::Submit { settle_ms, .. } = &args.command {
        config.submit_settle_ms = *settle_ms;
    }
    let cluster = Arc::new(SgeCluster::new(config));

    let code = match args.command {
        Commands::Status { job_ids } => {
            handle_status(&cluster, job_ids, &args.output).await?;
            0
        }
        Commands::Watch { job_ids, monitor } => {
            let jobs = job_ids.into_iter().map(JobHandle::new).collect();
            handle_watch(cluster, jobs, &monitor, &args.output).await?
        }
        Commands::Submit {
            script,
            wait,
            monitor,
            qsub_args,
            ..
        } => handle_submit(cluster, script, qsub_args, wait, &monitor, &args.output).await?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
