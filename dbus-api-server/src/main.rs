use clap::Parser;
use dbus_api_server::{run, Settings};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "HTTP/JSON gateway for Venus OS D-Bus values", long_about = None)]
struct Cli {
    #[arg(long, default_value = "0.0.0.0", help = "Host to bind to")]
    host: IpAddr,

    #[arg(long, default_value_t = 8088, help = "Port to listen on")]
    port: u16,

    #[arg(
        long,
        value_name = "ADDRESS",
        help = "D-Bus address to connect to instead of the system bus"
    )]
    bus_address: Option<String>,

    #[arg(
        long,
        default_value = "/data/dbus-api/config.json",
        help = "File backing GET/POST /config"
    )]
    config_path: PathBuf,

    #[arg(
        long,
        default_value = "/etc/venus/image-type",
        help = "File naming the installed firmware image variant"
    )]
    image_type_path: PathBuf,

    #[arg(
        long,
        default_value = "AI Write Enable",
        help = "Name of the virtual switch that enables writes"
    )]
    switch_name: String,

    #[arg(
        long,
        default_value_t = 3,
        help = "Seconds a restart or stop waits for open connections"
    )]
    drain_timeout_secs: u64,
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

    let settings = Settings {
        listen: SocketAddr::new(cli.host, cli.port),
        bus_address: cli.bus_address,
        config_path: cli.config_path,
        image_type_path: cli.image_type_path,
        switch_name: cli.switch_name,
        drain_timeout: Duration::from_secs(cli.drain_timeout_secs),
    };

    run(settings).await
}
