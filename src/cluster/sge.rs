use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::cluster::{JobCanceller, JobSubmitter, QueueSource, SubmitRequest, SubmittedJob};
use crate::config::{CommandConfig, SgeConfig};
use crate::error::{GridError, Result};
use crate::scheduler::JobId;

/// Grid Engine command-line client.
///
/// Every call is a blocking external process; nothing is cached between
/// calls.
#[derive(Debug, Clone, Default)]
pub struct SgeCluster {
    config: SgeConfig,
}

impl SgeCluster {
    pub fn new(config: SgeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SgeConfig {
        &self.config
    }

    fn command(spec: &CommandConfig) -> Command {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn check_output(
        program: &str,
        result: std::result::Result<Output, std::io::Error>,
    ) -> Result<String> {
        let output = result.map_err(|source| GridError::CommandSpawn {
            program: program.to_string(),
            source,
        })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(
                program,
                exit_code = ?output.status.code(),
                stderr = %stderr,
                "Scheduler command failed"
            );
            Err(GridError::CommandFailed {
                program: program.to_string(),
                code: output.status.code(),
                stderr,
            })
        }
    }
}

#[async_trait]
impl QueueSource for SgeCluster {
    async fn snapshot(&self) -> Result<String> {
        let spec = &self.config.qstat;
        let result = Self::command(spec).stdin(Stdio::null()).output().await;
        let stdout = Self::check_output(&spec.program, result)?;
        tracing::trace!(bytes = stdout.len(), "Fetched queue listing");
        Ok(stdout)
    }
}

#[async_trait]
impl JobCanceller for SgeCluster {
    async fn cancel(&self, ids: &[JobId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let spec = &self.config.qdel;
        let result = Self::command(spec)
            .args(ids.iter().map(JobId::as_str))
            .stdin(Stdio::null())
            .output()
            .await;
        let stdout = Self::check_output(&spec.program, result)?;
        tracing::debug!(output = %stdout.trim(), "Cancel request sent");
        Ok(())
    }
}

#[async_trait]
impl JobSubmitter for SgeCluster {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmittedJob> {
        let spec = &self.config.qsub;
        let mut child = Self::command(spec)
            .args(&request.args)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|source| GridError::CommandSpawn {
                program: spec.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // qsub can exit before reading stdin; its exit status is reported below
            match write_script(&mut stdin, &request.script).await {
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    tracing::debug!(program = %spec.program, "Submit command closed stdin early");
                }
                result => result?,
            }
        }

        let stdout = Self::check_output(&spec.program, child.wait_with_output().await)?;
        let job = parse_submit_output(&stdout)?;
        tracing::info!(job_id = %job.id, name = %job.name, "Job submitted");

        if let Some(settle) = self.config.submit_settle() {
            tokio::time::sleep(settle).await;
        }
        Ok(job)
    }
}

async fn write_script(stdin: &mut tokio::process::ChildStdin, script: &str) -> std::io::Result<()> {
    stdin.write_all(script.as_bytes()).await?;
    stdin.shutdown().await
}

/// Parse the confirmation printed by `qsub`.
///
/// `Your job 1245023 ("python") has been submitted` yields id `1245023` and
/// name `python`. For array jobs (`Your job-array 1245024.1-10:1 ...`) the
/// task range is dropped, since `qstat` lists the array under the base id.
pub fn parse_submit_output(stdout: &str) -> Result<SubmittedJob> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("Your job"))
        .ok_or_else(|| GridError::SubmitOutput(stdout.trim().to_string()))?;

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(GridError::SubmitOutput(line.to_string()));
    }

    let id = match fields[1] {
        "job" => fields[2],
        "job-array" => fields[2].split('.').next().unwrap_or(fields[2]),
        _ => return Err(GridError::SubmitOutput(line.to_string())),
    };
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(GridError::SubmitOutput(line.to_string()));
    }

    let raw_name = fields[3];
    let name = raw_name.strip_prefix("(\"").unwrap_or(raw_name);
    let name = name.strip_suffix("\")").unwrap_or(name);

    Ok(SubmittedJob {
        id: JobId::from(id),
        name: name.to_string(),
    })
}
