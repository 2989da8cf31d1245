use crate::domain::ServiceStatus;
use crate::ports::{ControlError, ServiceControl, SignalKind};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Pauses between supervisor commands and the status read that follows.
#[derive(Debug, Clone, Copy)]
pub struct ControlTimings {
    pub settle: Duration,
    pub restart_wait: Duration,
}

impl Default for ControlTimings {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(1),
            restart_wait: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpgradeReport {
    pub git_output: String,
    pub status: ServiceStatus,
}

pub struct ControlService {
    control: Arc<dyn ServiceControl>,
    install_dir: PathBuf,
    timings: ControlTimings,
}

impl ControlService {
    pub fn new(control: Arc<dyn ServiceControl>, install_dir: PathBuf, timings: ControlTimings) -> Self {
        Self {
            control,
            install_dir,
            timings,
        }
    }

    pub async fn status(&self) -> Result<ServiceStatus, ControlError> {
        self.control.status().await
    }

    pub async fn start(&self, confirm: bool) -> Result<ServiceStatus, ControlError> {
        require(confirm, "Start")?;
        info!("msg" = "starting managed service");
        self.control.signal(SignalKind::Up).await?;
        sleep(self.timings.settle).await;
        self.control.status().await
    }

    pub async fn stop(&self, confirm: bool) -> Result<ServiceStatus, ControlError> {
        require(confirm, "Stop")?;
        info!("msg" = "stopping managed service");
        self.control.signal(SignalKind::Down).await?;
        sleep(self.timings.settle).await;
        self.control.status().await
    }

    pub async fn restart(&self, confirm: bool) -> Result<ServiceStatus, ControlError> {
        require(confirm, "Restart")?;
        info!("msg" = "restarting managed service");
        self.kill_then_up().await
    }

    /// Pulls the install checkout and restarts on success. A failed pull is
    /// returned as-is and leaves the service untouched.
    pub async fn upgrade(&self, confirm: bool) -> Result<UpgradeReport, ControlError> {
        require(confirm, "Upgrade")?;
        if !self.control.is_git_repo(&self.install_dir).await {
            warn!(dir = %self.install_dir.display(), "upgrade refused, no git checkout");
            return Err(ControlError::NotGitRepository);
        }
        info!(dir = %self.install_dir.display(), "msg" = "pulling update");
        let git_output = self.control.pull(&self.install_dir).await?;
        let status = self.kill_then_up().await?;
        Ok(UpgradeReport { git_output, status })
    }

    // The managed process does not reliably exit on SIGTERM.
    async fn kill_then_up(&self) -> Result<ServiceStatus, ControlError> {
        if let Err(err) = self.control.signal(SignalKind::Kill).await {
            warn!(%err, "kill signal failed, bringing service up anyway");
        }
        sleep(self.timings.settle).await;
        self.control.signal(SignalKind::Up).await?;
        sleep(self.timings.restart_wait).await;
        self.control.status().await
    }
}

fn require(confirm: bool, action: &'static str) -> Result<(), ControlError> {
    if confirm {
        Ok(())
    } else {
        Err(ControlError::ConfirmationRequired { action })
    }
}
