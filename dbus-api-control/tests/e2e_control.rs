// End-to-end tests for the control plane with a recording service controller.

use async_trait::async_trait;
use dbus_api_control::app::ControlTimings;
use dbus_api_control::domain::ServiceStatus;
use dbus_api_control::ports::{ControlError, ServiceControl, SignalKind};
use dbus_api_control::{run_with, Settings};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;

#[derive(Default)]
struct RecordingControl {
    signals: Mutex<Vec<SignalKind>>,
    pulls: Mutex<usize>,
}

#[async_trait]
impl ServiceControl for RecordingControl {
    async fn status(&self) -> Result<ServiceStatus, ControlError> {
        let running = self.signals.lock().unwrap().last() != Some(&SignalKind::Down);
        Ok(if running {
            ServiceStatus::parse("/service/dbus-api-server: up (pid 900) 3 seconds")
        } else {
            ServiceStatus::parse("/service/dbus-api-server: down 1 seconds, normally up")
        })
    }

    async fn signal(&self, kind: SignalKind) -> Result<(), ControlError> {
        self.signals.lock().unwrap().push(kind);
        Ok(())
    }

    async fn is_git_repo(&self, dir: &Path) -> bool {
        dir.join(".git").exists()
    }

    async fn pull(&self, _dir: &Path) -> Result<String, ControlError> {
        *self.pulls.lock().unwrap() += 1;
        Ok("Already up to date.".to_string())
    }
}

struct ControlPlane {
    port: u16,
    control: Arc<RecordingControl>,
    temp: TempDir,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl ControlPlane {
    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }
}

async fn start_control_plane() -> ControlPlane {
    let temp = TempDir::new().unwrap();
    let port = find_free_port().await;
    let control = Arc::new(RecordingControl::default());

    let mut settings = Settings::default();
    settings.listen = ([127, 0, 0, 1], port).into();
    settings.install_dir = temp.path().join("install");
    settings.log_path = temp.path().join("current");
    settings.timings = ControlTimings {
        settle: Duration::from_millis(10),
        restart_wait: Duration::from_millis(10),
    };
    std::fs::create_dir_all(&settings.install_dir).unwrap();

    let handle = tokio::spawn(run_with(
        settings,
        control.clone(),
        std::future::pending(),
    ));
    wait_for_port(port).await;

    ControlPlane {
        port,
        control,
        temp,
        handle,
    }
}

#[tokio::test]
async fn e2e_upgrade_refused_without_checkout() {
    let plane = start_control_plane().await;
    let client = reqwest::Client::new();

    let response = client
        .post(plane.url("/upgrade"))
        .json(&json!({"confirm": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("manual upgrade required"));
    assert!(plane.control.signals.lock().unwrap().is_empty());
    assert_eq!(*plane.control.pulls.lock().unwrap(), 0);

    plane.handle.abort();
}

#[tokio::test]
async fn e2e_upgrade_with_checkout_restarts() {
    let plane = start_control_plane().await;
    std::fs::create_dir(plane.temp.path().join("install").join(".git")).unwrap();
    let client = reqwest::Client::new();

    let response = client
        .post(plane.url("/upgrade"))
        .json(&json!({"confirm": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["git_output"], "Already up to date.");
    assert_eq!(body["pid"], 900);
    assert_eq!(
        *plane.control.signals.lock().unwrap(),
        vec![SignalKind::Kill, SignalKind::Up]
    );

    plane.handle.abort();
}

#[tokio::test]
async fn e2e_stop_then_status() {
    let plane = start_control_plane().await;
    let client = reqwest::Client::new();

    let response = client
        .post(plane.url("/stop"))
        .json(&json!({"confirm": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["running"], false);

    let body: Value = client
        .get(plane.url("/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["running"], false);
    assert!(body["uptime_seconds"].is_null());
    assert_eq!(body["service"], "dbus-api-server");

    plane.handle.abort();
}

#[tokio::test]
async fn e2e_health_and_missing_logs() {
    let plane = start_control_plane().await;
    let client = reqwest::Client::new();

    let body: Value = client
        .get(plane.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["service"], "dbus-api-control");
    assert_eq!(body["status"], "healthy");

    let body: Value = client
        .get(plane.url("/logs?lines=5"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["lines_requested"], 5);
    assert_eq!(body["logs"], json!([]));

    plane.handle.abort();
}

async fn find_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

async fn wait_for_port(port: u16) {
    let mut attempts = 0;
    loop {
        match TcpStream::connect(("127.0.0.1", port)).await {
            Ok(stream) => {
                drop(stream);
                break;
            }
            Err(_) if attempts < 50 => {
                attempts += 1;
                sleep(Duration::from_millis(50)).await;
            }
            Err(err) => {
                panic!("control plane did not start listening on port {}: {}", port, err);
            }
        }
    }
}
