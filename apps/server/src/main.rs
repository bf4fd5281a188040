#![warn(clippy::all, clippy::pedantic)]

use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::PathBuf;

use actix_web::{App, HttpServer, web};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod error;
mod routes;
mod state;

use error::AppError;
use logger::init_tracing;
use sitewatch_service::config::{Config, Server};
use sitewatch_service::orchestrator::{Orchestrator, shutdown_signal};
use state::AppState;

/// Uptime monitor with an HTTP trigger for owner refreshes
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file path (defaults to $XDG_CONFIG_HOME/sitewatch/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_tracing();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    println!("{config}");

    let addr = bind_address(&config.server)?;
    let orchestrator = Orchestrator::new(config).await?;

    let cancel = CancellationToken::new();
    let scheduler = orchestrator.start(cancel.clone());
    let state = web::Data::new(AppState::new(orchestrator.scheduler().clone(), cancel.clone()));

    let result = run_server(addr, state).await;

    cancel.cancel();
    if let Err(e) = scheduler.await {
        tracing::error!("Scheduler task failed: {}", e);
    }
    result
}

/// Works for IPv4 and bare IPv6 binds alike
fn bind_address(server: &Server) -> Result<SocketAddr, AddrParseError> {
    Ok((server.bind.trim().parse::<IpAddr>()?, server.port).into())
}

async fn run_server(addr: SocketAddr, state: web::Data<AppState>) -> Result<(), AppError> {
    let server = HttpServer::new(move || App::new().app_data(state.clone()).configure(routes::routes))
        .disable_signals()
        .bind(addr)?
        .run();
    let handle = server.handle();
    info!("Listening on {}", addr);

    tokio::spawn(async move {
        shutdown_signal().await;
        handle.stop(true).await;
    });

    server.await?;
    Ok(())
}
