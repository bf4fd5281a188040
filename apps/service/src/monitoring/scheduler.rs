use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use super::executor::BoundedExecutor;
use super::sweep::{Baseline, Sweeper};
use super::types::{RefreshSummary, SweepSummary};
use crate::config::Config;
use crate::database::TargetStore;

/// Timing and concurrency knobs for the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub interval: Duration,
    pub workers: usize,
    pub probe_timeout: Duration,
    pub refresh_concurrency: usize,
    pub refresh_timeout: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SchedulerSettings {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.sweep_interval(),
            workers: config.scheduler.workers,
            probe_timeout: config.target_timeout(),
            refresh_concurrency: config.refresh.max_concurrency,
            refresh_timeout: config.refresh_timeout(),
        }
    }
}

/// Monitoring scheduler - drives periodic sweeps and owner refreshes
///
/// Periodic sweeps run on a fixed worker pool and are started without
/// waiting for the previous one, so a slow sweep can overlap the next.
/// Owner refreshes use the permit shape and re-read each target's stored
/// status before probing it.
pub struct MonitoringScheduler {
    store: Arc<dyn TargetStore>,
    sweeper: Arc<Sweeper>,
    settings: SchedulerSettings,
    sweep_executor: BoundedExecutor,
    refresh_executor: BoundedExecutor,
    sweeps_started: AtomicU64,
}

impl MonitoringScheduler {
    pub fn new(sweeper: Arc<Sweeper>, settings: SchedulerSettings) -> Self {
        Self {
            store: Arc::clone(sweeper.store()),
            sweeper,
            settings,
            sweep_executor: BoundedExecutor::worker_pool(settings.workers),
            refresh_executor: BoundedExecutor::permits(settings.refresh_concurrency),
            sweeps_started: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Number of sweeps begun since startup, including overlapping ones
    pub fn sweeps_started(&self) -> u64 {
        self.sweeps_started.load(Ordering::SeqCst)
    }

    /// Spawn the periodic loop; it ends once `cancel` fires
    pub fn start(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move { scheduler.run(cancel).await })
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            "Scheduler started: sweep every {:?} with {} workers",
            self.settings.interval, self.settings.workers
        );

        // First tick completes immediately
        let mut timer = interval(self.settings.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Scheduler stopping: cancellation requested");
                    break;
                }
                _ = timer.tick() => {
                    let scheduler = Arc::clone(&self);
                    let sweep_cancel = cancel.child_token();
                    tokio::spawn(async move {
                        scheduler.sweep_all(&sweep_cancel).await;
                    });
                }
            }
        }
    }

    /// One pass over every registered target
    ///
    /// A listing failure skips the pass and returns an empty summary.
    pub async fn sweep_all(&self, cancel: &CancellationToken) -> SweepSummary {
        let sweep = self.sweeps_started.fetch_add(1, Ordering::SeqCst) + 1;

        let targets = match self.store.list_all().await {
            Ok(targets) => targets,
            Err(e) => {
                error!("Sweep {} skipped: failed to list targets: {:#}", sweep, e);
                return SweepSummary::default();
            }
        };

        let total = targets.len();
        info!("Sweep {} started: {} targets", sweep, total);

        let sweeper = Arc::clone(&self.sweeper);
        let probe_timeout = self.settings.probe_timeout;
        let reports = self
            .sweep_executor
            .run(targets, cancel, move |target| {
                let sweeper = Arc::clone(&sweeper);
                async move { sweeper.process(target, probe_timeout, Baseline::Listed).await }
            })
            .await;

        let summary = SweepSummary::from_reports(total, &reports);
        if reports.len() < total {
            info!("Sweep {} cancelled after {} of {} targets", sweep, reports.len(), total);
        }
        info!(
            "Sweep {} finished: {} up, {} down, {} write failures, {} transitions",
            sweep, summary.up, summary.down, summary.write_failures, summary.transitions
        );
        summary
    }

    /// Probe one owner's targets now
    ///
    /// `updated` counts targets whose fresh status was stored.
    pub async fn refresh_owner(&self, owner_id: Uuid, cancel: &CancellationToken) -> Result<RefreshSummary> {
        let targets = self.store.list_by_owner(owner_id).await?;
        if targets.is_empty() {
            return Ok(RefreshSummary::default());
        }

        let total = targets.len();
        info!("Refreshing {} targets for owner {}", total, owner_id);

        let sweeper = Arc::clone(&self.sweeper);
        let probe_timeout = self.settings.refresh_timeout;
        let reports = self
            .refresh_executor
            .run(targets, cancel, move |target| {
                let sweeper = Arc::clone(&sweeper);
                async move { sweeper.process(target, probe_timeout, Baseline::Reread).await }
            })
            .await;

        let updated = reports.iter().filter(|report| report.written).count();
        info!("Refresh for owner {} finished: {}/{} updated", owner_id, updated, total);

        Ok(RefreshSummary { total, updated })
    }
}
