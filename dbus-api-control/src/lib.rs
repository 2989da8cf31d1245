pub mod adapters;
mod api;
pub mod app;
pub mod domain;
pub mod ports;

pub use api::{DEFAULT_LOG_LINES, MAX_LOG_LINES, VERSION};

use adapters::{DaemontoolsControl, LogFile};
use anyhow::{Context, Result as AnyResult};
use api::AppState;
use app::{ControlService, ControlTimings};
use chrono::Utc;
use ports::ServiceControl;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tracing::info;

pub const DEFAULT_SERVICE_NAME: &str = "dbus-api-server";

#[derive(Debug, Clone)]
pub struct Settings {
    pub listen: SocketAddr,
    pub service_name: String,
    pub service_dir: PathBuf,
    pub log_path: PathBuf,
    pub install_dir: PathBuf,
    pub command_timeout: Duration,
    pub pull_timeout: Duration,
    pub timings: ControlTimings,
}

impl Settings {
    /// Paths follow the Venus OS daemontools layout for `name`.
    pub fn for_service(name: &str) -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8089)),
            service_name: name.to_string(),
            service_dir: PathBuf::from(format!("/service/{name}")),
            log_path: PathBuf::from(format!("/var/log/{name}/current")),
            install_dir: PathBuf::from("/data/dbus-api"),
            command_timeout: Duration::from_secs(10),
            pull_timeout: Duration::from_secs(60),
            timings: ControlTimings::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::for_service(DEFAULT_SERVICE_NAME)
    }
}

pub async fn run(settings: Settings) -> AnyResult<()> {
    let control = Arc::new(DaemontoolsControl::new(
        settings.service_dir.clone(),
        settings.command_timeout,
        settings.pull_timeout,
    ));
    run_with(settings, control, shutdown_signal()).await
}

/// Serves the control API against `control` until `shutdown` resolves.
pub async fn run_with<S>(
    settings: Settings,
    control: Arc<dyn ServiceControl>,
    shutdown: S,
) -> AnyResult<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let service = ControlService::new(control, settings.install_dir.clone(), settings.timings);
    let state = AppState {
        service: Arc::new(service),
        logs: Arc::new(LogFile::new(settings.log_path.clone())),
        service_name: settings.service_name.clone(),
        service_dir: settings.service_dir.display().to_string(),
        started_at: Utc::now(),
    };

    let listener = TcpListener::bind(settings.listen)
        .await
        .with_context(|| format!("binding {}", settings.listen))?;
    info!(
        "listening" = %settings.listen,
        "managed" = %settings.service_dir.display(),
        "install_dir" = %settings.install_dir.display(),
        "msg" = "dbus-api-control started"
    );

    axum::serve(listener, api::router(state).into_make_service())
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("msg" = "shutdown signal received");
        })
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(_) => {
                let _ = ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c().await;
    }
}
