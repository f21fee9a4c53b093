//! Keel - cookie session server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use keel_server::{Server, StaticCredentials};
use keel_session::ProviderRegistry;

mod config;

use config::FileConfig;

// ─────────────────────────────────────────────────────────────────────────────
// CLI Definition
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, env = "KEEL_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(short, long, env = "KEEL_BIND")]
    bind: Option<SocketAddr>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Directory for rotating JSON logs
    #[arg(long, env = "KEEL_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console output, plus a rotating JSON file when a log dir is given
    let filter = if cli.verbose {
        "keel=debug,keel_server=debug,keel_session=debug,tower_http=debug,info"
    } else {
        "keel=info,keel_server=info,keel_session=info,warn"
    };

    let (file_layer, _guard) = match &cli.log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "keel.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "keel=trace,keel_server=trace,keel_session=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
                ),
        )
        .with(file_layer)
        .init();

    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let credentials = StaticCredentials::from(file.users.clone());
    if credentials.is_empty() {
        tracing::warn!("No users configured; every login will be rejected");
    }

    let config = file.server_config(cli.bind);
    tracing::info!(
        provider = %config.session.provider,
        cookie = %config.session.cookie_name,
        max_idle_secs = config.session.max_idle_secs,
        gc_interval_secs = config.session.gc_interval_secs,
        "Session manager configured"
    );

    let server = Server::new(
        &ProviderRegistry::with_defaults(),
        config,
        Arc::new(credentials),
    )
    .context("failed to create session manager")?;

    server.run().await?;
    Ok(())
}
