//! Entrypoint.

use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use clap::Parser;
use config::Opts;
use dotenvy::dotenv;
use monitor::Scheduler;
use notifier::ConsoleNotifier;
use runtime::{health, shutdown::ShutdownSignal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::filter::EnvFilter;

/// Capacity of the channel between the monitors and the notifier.
const EVENT_BUFFER: usize = 256;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    if let Ok(custom_env_file) = std::env::var("ENV_FILE") {
        dotenvy::from_filename(custom_env_file)?;
    } else {
        // Try the default .env file, and ignore if it doesn't exist.
        dotenv().ok();
    }

    let opts = Opts::parse();
    let config = opts.load_config()?;

    // stdout carries notifications only, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.settings.log_level.to_lowercase())),
        )
        .init();

    if !opts.config.exists() {
        warn!(path = %opts.config.display(), "Config file not found, using defaults");
    }
    info!(
        providers = config.providers.len(),
        output = ?opts.output,
        "Status tracker starting"
    );

    let shutdown = ShutdownSignal::new()?;

    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let console = ConsoleNotifier::new(opts.output);
    let dispatcher = tokio::spawn(async move { notifier::dispatch(events_rx, &console).await });

    let scheduler = Scheduler::new(config.settings.clone(), events_tx)?;
    let handle = scheduler.start(config.providers);

    let server_stop = CancellationToken::new();
    let server = if opts.health.disable_health_server {
        None
    } else {
        let board = handle.statuses().clone();
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, opts.health.port));
        let stop = server_stop.clone().cancelled_owned();
        Some(tokio::spawn(async move {
            if let Err(e) = health::serve(addr, Arc::new(move || board.response()), stop).await {
                error!(error = %e, "Health server failed");
            }
        }))
    };

    shutdown.await;

    handle.stop().await;
    // the scheduler holds the last sender; dropping it lets the notifier drain and exit
    drop(scheduler);
    server_stop.cancel();
    if let Some(server) = server {
        server.await?;
    }
    let delivered = dispatcher.await?;

    info!(delivered, "Status tracker stopped");
    Ok(())
}
