pub mod adapters;
mod api;
pub mod app;
pub mod domain;
pub mod ports;

pub use adapters::{InMemoryBus, InMemoryConnector};
pub use api::VERSION;
pub use app::{LifecycleCommand, LifecycleHandle, SupervisorState};

use adapters::{FileConfigStore, ImageTypeFile, ZbusConnector};
use anyhow::{Context, Result as AnyResult};
use api::AppState;
use app::{Supervisor, WriteGate, WriteGateConfig};
use ports::BusConnector;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::ctrl_c;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Settings {
    pub listen: SocketAddr,
    /// Explicit D-Bus address; the system bus when `None`.
    pub bus_address: Option<String>,
    pub config_path: PathBuf,
    pub image_type_path: PathBuf,
    pub switch_name: String,
    /// How long a restart or stop waits for open connections to finish.
    pub drain_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8088)),
            bus_address: None,
            config_path: PathBuf::from("/data/dbus-api/config.json"),
            image_type_path: PathBuf::from("/etc/venus/image-type"),
            switch_name: app::write_gate::DEFAULT_SWITCH_NAME.to_string(),
            drain_timeout: app::supervisor::DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

pub async fn run(settings: Settings) -> AnyResult<()> {
    let connector = Arc::new(ZbusConnector::new(settings.bus_address.clone()));
    run_with(settings, connector, shutdown_signal()).await
}

/// Runs the gateway on a caller-supplied bus until a stop request arrives
/// or `shutdown` resolves.
pub async fn run_with<S>(
    settings: Settings,
    connector: Arc<dyn BusConnector>,
    shutdown: S,
) -> AnyResult<()>
where
    S: Future<Output = ()>,
{
    let listener = std::net::TcpListener::bind(settings.listen)
        .with_context(|| format!("binding {}", settings.listen))?;
    let supervisor =
        Supervisor::new(listener, connector)?.with_drain_timeout(settings.drain_timeout);
    let addr = supervisor.local_addr()?;

    let gate = Arc::new(WriteGate::new(
        WriteGateConfig {
            switch_name: settings.switch_name.clone(),
            ..WriteGateConfig::default()
        },
        Arc::new(ImageTypeFile::new(settings.image_type_path.clone())),
    ));
    let config = Arc::new(FileConfigStore::new(settings.config_path.clone()));

    info!("listening" = %addr, "config" = %settings.config_path.display(), "msg" = "dbus-api-server started");

    supervisor
        .run(
            move |cycle| {
                api::router(AppState::new(
                    cycle.bus,
                    gate.clone(),
                    config.clone(),
                    cycle.lifecycle,
                    cycle.started_at,
                ))
            },
            shutdown,
        )
        .await
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
