use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use sitewatch_service::config::Config;
use sitewatch_service::orchestrator::{Orchestrator, shutdown_signal};

/// Headless uptime monitor: sweeps every registered target on a fixed interval
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file path (defaults to $XDG_CONFIG_HOME/sitewatch/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_tracing();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    println!("{config}");

    let orchestrator = Orchestrator::new(config).await?;
    let cancel = CancellationToken::new();
    let scheduler = orchestrator.start(cancel.clone());

    shutdown_signal().await;
    info!("Shutting down");
    cancel.cancel();
    scheduler.await?;

    Ok(())
}
