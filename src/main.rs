//! Steam Big Picture plugin for Stream Deck
//!
//! Started by the Stream Deck application with the WebSocket port and the
//! registration parameters on the command line.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use steam_bigpicture::config::PluginConfig;
use steam_bigpicture::drivers::{ActionDriver, ConsoleDriver, StateProber, SteamDriver};
use steam_bigpicture::launch::LaunchArgs;
use steam_bigpicture::paths::PluginPaths;
use steam_bigpicture::plugin::PluginActor;
use steam_bigpicture::protocol::Registration;
use steam_bigpicture::sync::SyncLoop;
use steam_bigpicture::transport;
use steam_bigpicture::ApplicationState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let paths = PluginPaths::detect();
    let parsed = LaunchArgs::parse_launch(std::env::args());

    let level = match &parsed {
        Ok(args) => args.log_level.clone(),
        Err(_) => std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
    };
    let log_guard = init_logging(&level, &paths.log_file)?;

    info!("Steam Big Picture plugin starting");
    info!("Log file: {}", paths.log_file.display());

    let args = match parsed {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            error!("Missing or invalid launch parameters: {}", e);
            eprintln!("{}", e);
            drop(log_guard);
            std::process::exit(1);
        }
    };

    info!(
        port = args.port,
        uuid = %args.plugin_uuid,
        register_event = %args.register_event,
        "Launch parameters parsed"
    );
    if let Some(version) = args.application_version() {
        info!("Stream Deck application version {}", version);
    }

    let config = PluginConfig::load_or_default(&paths.config).await;

    let (prober, driver): (Arc<dyn StateProber>, Arc<dyn ActionDriver>) =
        if args.simulate || !cfg!(windows) {
            info!("Using simulated console driver");
            let driver = Arc::new(ConsoleDriver::new("console", ApplicationState::Off));
            (driver.clone(), driver)
        } else {
            let driver = Arc::new(SteamDriver::new(config.steam));
            (driver.clone(), driver)
        };
    info!("Driver '{}' ready", driver.name());

    let (outbound, outbound_rx) = transport::outbound_channel();
    let plugin = PluginActor::spawn(Arc::clone(&prober), driver, Arc::new(outbound));

    let ws = transport::connect(args.port).await?;
    let sync = SyncLoop::new(prober, plugin.clone());
    let registration = Registration {
        event: args.register_event,
        uuid: args.plugin_uuid,
    };

    tokio::select! {
        result = transport::run_session(ws, registration, outbound_rx, plugin.clone(), sync) => {
            if let Err(e) = result {
                error!("Stream Deck session failed: {:#}", e);
            }
        }
        _ = shutdown_signal() => {}
    }

    plugin.shutdown();
    info!("Steam Big Picture plugin shutdown complete");
    Ok(())
}

/// Log to stderr and to a fresh `plugin.log` next to the executable
fn init_logging(level: &str, log_file: &Path) -> Result<WorkerGuard> {
    let dir = log_file.parent().unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .context("Log file path has no file name")?;

    // Start every run with an empty log
    if let Err(e) = std::fs::File::create(log_file) {
        eprintln!("Failed to initialize log {}: {}", log_file.display(), e);
    }

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(false),
        )
        .init();

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
