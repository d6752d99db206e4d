//! courierd - the Courier chat relay daemon

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use courier_cli::{cli::Cli, config::AppConfig};
use courier_core::SystemTimeSource;
use courier_relay::RelayService;
use courier_ws::WsServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli(&cli);

    let (service, relay) = RelayService::new(config.relay.clone(), SystemTimeSource);
    let relay_task = tokio::spawn(service.run());

    let listener = TcpListener::bind(&config.ws.bind_addr).await?;
    info!("courierd listening on {}", config.ws.bind_addr);
    let server = WsServer::new(relay);

    tokio::select! {
        result = server.run(listener) => {
            if let Err(err) = result {
                error!("WebSocket listener failed: {err}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down on ctrl-c");
        }
    }

    relay_task.abort();
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();
}
