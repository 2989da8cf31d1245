//! In-place restart loop around the HTTP listener.
//!
//! The socket is bound once and handed to a fresh axum server on every
//! cycle, so a restart never releases the port. Each cycle also opens a new
//! bus connection; the previous one is dropped together with its router.
//!
//! Draining is bounded: connections still open when the drain deadline
//! passes are abandoned and the loop moves on.

use super::bus_client::BusClient;
use crate::ports::BusConnector;
use anyhow::{anyhow, Context, Result as AnyResult};
use axum::Router;
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Serialize;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorState {
    Starting,
    Serving,
    Stopping,
    Restarting,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SupervisorState::Starting => "starting",
            SupervisorState::Serving => "serving",
            SupervisorState::Stopping => "stopping",
            SupervisorState::Restarting => "restarting",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    Restart,
    Stop,
}

/// The only way request handlers can influence the supervisor: enqueue a
/// command and observe the current state.
#[derive(Clone)]
pub struct LifecycleHandle {
    commands: mpsc::UnboundedSender<LifecycleCommand>,
    state: watch::Receiver<SupervisorState>,
}

impl LifecycleHandle {
    pub fn dispatch(&self, command: LifecycleCommand) {
        if self.commands.send(command).is_err() {
            warn!(?command, "supervisor gone, lifecycle command dropped");
        }
    }

    pub fn request_restart(&self) {
        self.dispatch(LifecycleCommand::Restart);
    }

    pub fn request_stop(&self) {
        self.dispatch(LifecycleCommand::Stop);
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Handle wired to a bare channel instead of a running supervisor.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<LifecycleCommand>) {
        let (commands, rx) = mpsc::unbounded_channel();
        let (_, state) = watch::channel(SupervisorState::Serving);
        (Self { commands, state }, rx)
    }
}

/// Everything a single serving cycle is built from.
pub struct Cycle {
    pub bus: BusClient,
    pub started_at: DateTime<Utc>,
    pub lifecycle: LifecycleHandle,
}

pub const DEFAULT_DRAIN_TIMEOUT: StdDuration = StdDuration::from_secs(3);

pub struct Supervisor {
    listener: std::net::TcpListener,
    connector: Arc<dyn BusConnector>,
    drain_timeout: StdDuration,
    commands_tx: mpsc::UnboundedSender<LifecycleCommand>,
    commands_rx: mpsc::UnboundedReceiver<LifecycleCommand>,
    state_tx: watch::Sender<SupervisorState>,
}

impl Supervisor {
    pub fn new(
        listener: std::net::TcpListener,
        connector: Arc<dyn BusConnector>,
    ) -> AnyResult<Self> {
        listener
            .set_nonblocking(true)
            .context("switching listener to non-blocking mode")?;
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(SupervisorState::Starting);
        Ok(Self {
            listener,
            connector,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            commands_tx,
            commands_rx,
            state_tx,
        })
    }

    /// Upper bound on waiting for open connections after a restart or stop.
    pub fn with_drain_timeout(mut self, drain_timeout: StdDuration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handle(&self) -> LifecycleHandle {
        LifecycleHandle {
            commands: self.commands_tx.clone(),
            state: self.state_tx.subscribe(),
        }
    }

    /// Serves until a stop command arrives or `shutdown` resolves. `build`
    /// turns each cycle into the router that serves it.
    pub async fn run<F, S>(mut self, build: F, shutdown: S) -> AnyResult<()>
    where
        F: Fn(Cycle) -> Router,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut generation = 0u64;
        let mut last_start: Option<DateTime<Utc>> = None;

        loop {
            generation += 1;
            self.transition(SupervisorState::Starting);

            let port = self
                .connector
                .connect()
                .await
                .map_err(|err| anyhow!(err))
                .context("connecting to the system bus")?;
            let started_at = next_start(last_start);
            last_start = Some(started_at);

            let router = build(Cycle {
                bus: BusClient::new(port),
                started_at,
                lifecycle: self.handle(),
            });
            let listener = TcpListener::from_std(
                self.listener
                    .try_clone()
                    .context("duplicating listening socket")?,
            )?;

            let (stop_tx, stop_rx) = oneshot::channel::<()>();
            let server = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(async move {
                    let _ = stop_rx.await;
                })
                .into_future();
            tokio::pin!(server);

            self.transition(SupervisorState::Serving);
            info!("generation" = generation, "started_at" = %started_at, "msg" = "gateway serving");

            let mut server_finished = false;
            let mut server_result: Option<std::io::Result<()>> = None;

            let restart = tokio::select! {
                res = &mut server => {
                    server_finished = true;
                    server_result = Some(res);
                    false
                }
                command = self.commands_rx.recv() => {
                    matches!(command, Some(LifecycleCommand::Restart))
                }
                _ = &mut shutdown => {
                    info!("msg" = "shutdown signal received");
                    false
                }
            };

            if server_finished {
                self.transition(SupervisorState::Stopping);
                if let Some(result) = server_result {
                    result.context("gateway listener failed")?;
                }
                break;
            }

            self.transition(if restart {
                SupervisorState::Restarting
            } else {
                SupervisorState::Stopping
            });
            let _ = stop_tx.send(());
            match tokio::time::timeout(self.drain_timeout, &mut server).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(%err, "gateway listener terminated with error"),
                Err(_) => warn!(
                    "generation" = generation,
                    "drain_timeout_ms" = self.drain_timeout.as_millis() as u64,
                    "msg" = "connections still open after drain timeout, abandoning them"
                ),
            }

            if !restart {
                break;
            }
        }

        info!("msg" = "gateway stopped");
        Ok(())
    }

    fn transition(&self, state: SupervisorState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            info!("from" = %previous, "to" = %state, "msg" = "supervisor transition");
        }
    }
}

/// Start timestamps are reported with microsecond precision and must grow
/// strictly across cycles.
fn next_start(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let tick = Duration::microseconds(1);
    let now = Utc::now();
    let now = now.duration_trunc(tick).unwrap_or(now);
    match previous {
        Some(previous) if now <= previous => previous + tick,
        _ => now,
    }
}
