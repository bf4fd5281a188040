/// Orchestrator module - wires the engine to its collaborators
///
/// Builds the pooled store, the HTTP checker, the Telegram notifier and the
/// scheduler from a [`Config`], and hands out the pieces the binaries need.
use anyhow::{Result, anyhow};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::database::{DatabaseImpl, initialize_database};
use crate::monitoring::{HttpChecker, MonitoringScheduler, SchedulerSettings, Sweeper};
use crate::notifier::{TelegramClient, TelegramNotifier};
use crate::pool::{LibsqlPool, open_pool};

/// Main orchestrator for the sitewatch service
pub struct Orchestrator {
    config: Arc<Config>,
    database: Arc<DatabaseImpl>,
    scheduler: Arc<MonitoringScheduler>,
}

impl Orchestrator {
    /// Open the configured database and build every component on top of it
    pub async fn new(config: Config) -> Result<Self> {
        let pool = open_pool(&config.database.path, config.database.max_connections).await?;
        Self::with_pool(config, pool).await
    }

    pub async fn with_pool(config: Config, pool: LibsqlPool) -> Result<Self> {
        {
            let conn = pool.get().await.map_err(|e| anyhow!("database pool checkout failed: {e}"))?;
            initialize_database(&conn).await?;
        }
        info!("Database ready at {}", config.database.path.display());

        let database = Arc::new(DatabaseImpl::new_from_pool(pool));
        let checker = Arc::new(HttpChecker::new(config.client_timeout())?);

        let client = TelegramClient::new(
            config.notifications.telegram_token.clone(),
            &config.notifications.api_base,
            config.notify_timeout(),
        )?;
        if !client.is_configured() {
            warn!("Telegram token not set, status changes will only be logged");
        }
        let notifier = Arc::new(TelegramNotifier::new(database.clone(), database.clone(), client));

        let sweeper = Arc::new(Sweeper::new(database.clone(), checker, notifier, config.notify_timeout()));
        let scheduler = Arc::new(MonitoringScheduler::new(sweeper, SchedulerSettings::from(&config)));

        Ok(Self { config: Arc::new(config), database, scheduler })
    }

    /// Spawn the periodic sweep loop under `cancel`
    pub fn start(&self, cancel: CancellationToken) -> JoinHandle<()> {
        self.scheduler.start(cancel)
    }

    pub fn scheduler(&self) -> &Arc<MonitoringScheduler> {
        &self.scheduler
    }

    pub fn database(&self) -> &Arc<DatabaseImpl> {
        &self.database
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
