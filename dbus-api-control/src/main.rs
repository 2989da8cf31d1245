use clap::Parser;
use dbus_api_control::{run, Settings, DEFAULT_SERVICE_NAME};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Control plane for the dbus-api-server service", long_about = None)]
struct Cli {
    #[arg(long, default_value = "0.0.0.0", help = "Host to bind to")]
    host: IpAddr,

    #[arg(long, default_value_t = 8089, help = "Port to listen on")]
    port: u16,

    #[arg(long, default_value = DEFAULT_SERVICE_NAME, help = "daemontools service to manage")]
    service_name: String,

    #[arg(
        long,
        value_name = "PATH",
        help = "Service directory (defaults to /service/<name>)"
    )]
    service_dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        help = "multilog file to tail (defaults to /var/log/<name>/current)"
    )]
    log_path: Option<PathBuf>,

    #[arg(
        long,
        default_value = "/data/dbus-api",
        help = "Install directory updated by /upgrade"
    )]
    install_dir: PathBuf,

    #[arg(long, default_value_t = 10, help = "Timeout for svc/svstat in seconds")]
    command_timeout_secs: u64,

    #[arg(long, default_value_t = 60, help = "Timeout for git pull in seconds")]
    pull_timeout_secs: u64,
}

impl Cli {
    fn into_settings(self) -> Settings {
        let defaults = Settings::for_service(&self.service_name);
        Settings {
            listen: SocketAddr::new(self.host, self.port),
            service_dir: self.service_dir.unwrap_or(defaults.service_dir),
            log_path: self.log_path.unwrap_or(defaults.log_path),
            install_dir: self.install_dir,
            command_timeout: Duration::from_secs(self.command_timeout_secs),
            pull_timeout: Duration::from_secs(self.pull_timeout_secs),
            service_name: self.service_name,
            timings: defaults.timings,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    run(cli.into_settings()).await
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn cli_defaults_follow_service_name() {
        let settings = Cli::try_parse_from(["dbus-api-control"])
            .expect("default parse")
            .into_settings();
        assert_eq!(settings.listen.port(), 8089);
        assert_eq!(settings.service_dir, PathBuf::from("/service/dbus-api-server"));
        assert_eq!(
            settings.log_path,
            PathBuf::from("/var/log/dbus-api-server/current")
        );
        assert_eq!(settings.command_timeout, Duration::from_secs(10));
        assert_eq!(settings.pull_timeout, Duration::from_secs(60));
    }

    #[test]
    fn cli_derives_paths_from_custom_name() {
        let settings = Cli::try_parse_from([
            "dbus-api-control",
            "--service-name",
            "other-api",
            "--log-path",
            "/tmp/current",
        ])
        .expect("custom name parse")
        .into_settings();
        assert_eq!(settings.service_dir, PathBuf::from("/service/other-api"));
        assert_eq!(settings.log_path, PathBuf::from("/tmp/current"));
    }

    #[test]
    fn cli_rejects_invalid_timeout() {
        let result = Cli::try_parse_from([
            "dbus-api-control",
            "--pull-timeout-secs",
            "soon",
        ]);
        assert!(result.is_err());
    }
}
