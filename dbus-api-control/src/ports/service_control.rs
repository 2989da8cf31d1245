use crate::domain::ServiceStatus;
use async_trait::async_trait;
use std::path::Path;

/// Commands understood by the service supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Up,
    Down,
    Kill,
}

impl SignalKind {
    /// `svc` flag for this command.
    pub fn flag(self) -> &'static str {
        match self {
            SignalKind::Up => "-u",
            SignalKind::Down => "-d",
            SignalKind::Kill => "-k",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ControlError {
    #[error("{action} requires {{\"confirm\": true}}")]
    ConfirmationRequired { action: &'static str },
    #[error("Not a git repository - manual upgrade required")]
    NotGitRepository,
    #[error("{command} failed: {stderr}")]
    Command { command: String, stderr: String },
    #[error("{command} timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// OS-level process supervision for the managed service.
#[async_trait]
pub trait ServiceControl: Send + Sync {
    async fn status(&self) -> Result<ServiceStatus, ControlError>;

    async fn signal(&self, kind: SignalKind) -> Result<(), ControlError>;

    async fn is_git_repo(&self, dir: &Path) -> bool;

    /// Updates the checkout in `dir`; returns the tool's stdout.
    async fn pull(&self, dir: &Path) -> Result<String, ControlError>;
}
