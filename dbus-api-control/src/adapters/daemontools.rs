use crate::domain::ServiceStatus;
use crate::ports::{ControlError, ServiceControl, SignalKind};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `program` with a hard deadline. The child is killed when the
/// deadline passes.
pub async fn run_command(
    program: &str,
    args: &[&str],
    limit: Duration,
) -> Result<CommandOutput, ControlError> {
    let label = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    debug!(command = %label, "running");

    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output();
    let output = match tokio::time::timeout(limit, output).await {
        Ok(result) => result.map_err(|source| ControlError::Io {
            context: format!("failed to spawn '{label}'"),
            source,
        })?,
        Err(_) => {
            return Err(ControlError::Timeout {
                command: label,
                seconds: limit.as_secs(),
            })
        }
    };

    Ok(CommandOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Supervises a daemontools service directory with `svc`/`svstat` and keeps
/// its install directory current with `git`.
#[derive(Debug, Clone)]
pub struct DaemontoolsControl {
    service_dir: PathBuf,
    command_timeout: Duration,
    pull_timeout: Duration,
    svc: String,
    svstat: String,
    git: String,
}

impl DaemontoolsControl {
    pub fn new(service_dir: PathBuf, command_timeout: Duration, pull_timeout: Duration) -> Self {
        Self {
            service_dir,
            command_timeout,
            pull_timeout,
            svc: "svc".to_string(),
            svstat: "svstat".to_string(),
            git: "git".to_string(),
        }
    }

    /// Replaces the tool binaries, for hosts where they are not on `PATH`.
    pub fn with_programs(
        mut self,
        svc: impl Into<String>,
        svstat: impl Into<String>,
        git: impl Into<String>,
    ) -> Self {
        self.svc = svc.into();
        self.svstat = svstat.into();
        self.git = git.into();
        self
    }

    fn service_dir(&self) -> String {
        self.service_dir.display().to_string()
    }
}

#[async_trait]
impl ServiceControl for DaemontoolsControl {
    async fn status(&self) -> Result<ServiceStatus, ControlError> {
        let dir = self.service_dir();
        let output = run_command(&self.svstat, &[&dir], self.command_timeout).await?;
        if output.success {
            Ok(ServiceStatus::parse(&output.stdout))
        } else {
            Ok(ServiceStatus::unavailable(output.stderr))
        }
    }

    async fn signal(&self, kind: SignalKind) -> Result<(), ControlError> {
        let dir = self.service_dir();
        let output = run_command(&self.svc, &[kind.flag(), &dir], self.command_timeout).await?;
        if output.success {
            Ok(())
        } else {
            Err(ControlError::Command {
                command: format!("{} {}", self.svc, kind.flag()),
                stderr: output.stderr,
            })
        }
    }

    async fn is_git_repo(&self, dir: &Path) -> bool {
        tokio::fs::metadata(dir.join(".git")).await.is_ok()
    }

    async fn pull(&self, dir: &Path) -> Result<String, ControlError> {
        let dir = dir.display().to_string();
        let output = run_command(&self.git, &["-C", &dir, "pull"], self.pull_timeout).await?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(ControlError::Command {
                command: format!("{} pull", self.git),
                stderr: output.stderr,
            })
        }
    }
}
