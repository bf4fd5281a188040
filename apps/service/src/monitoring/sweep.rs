use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::checker::Checker;
use super::error::ProbeError;
use super::transition::TransitionDetector;
use super::types::{ProbeOutcome, StatusTransition, SweepSummary, Target, TargetStatus};
use crate::database::TargetStore;
use crate::notifier::{NotificationDispatcher, dispatch_detached};

/// Where the pre-probe status of a target comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {
    /// The status in the listing the sweep started from
    Listed,
    /// A fresh read of the stored target just before probing
    Reread,
}

/// What happened to one target during a sweep
#[derive(Debug, Clone)]
pub struct TargetReport {
    pub target_id: Uuid,
    pub status: TargetStatus,
    /// Whether the fresh status reached the store
    pub written: bool,
    pub transition: Option<StatusTransition>,
}

impl SweepSummary {
    pub fn from_reports(total: usize, reports: &[TargetReport]) -> Self {
        let mut summary = SweepSummary { total, ..Default::default() };
        for report in reports {
            match report.status {
                TargetStatus::Up => summary.up += 1,
                _ => summary.down += 1,
            }
            if !report.written {
                summary.write_failures += 1;
            }
            if report.transition.is_some() {
                summary.transitions += 1;
            }
        }
        summary
    }
}

/// Probe, record, compare, notify: the per-target pipeline shared by
/// periodic and on-demand sweeps
pub struct Sweeper {
    store: Arc<dyn TargetStore>,
    checker: Arc<dyn Checker>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    detector: TransitionDetector,
    notify_timeout: Duration,
}

impl Sweeper {
    pub fn new(
        store: Arc<dyn TargetStore>,
        checker: Arc<dyn Checker>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        notify_timeout: Duration,
    ) -> Self {
        Self { store, checker, dispatcher, detector: TransitionDetector, notify_timeout }
    }

    pub fn store(&self) -> &Arc<dyn TargetStore> {
        &self.store
    }

    pub async fn process(&self, target: Target, probe_timeout: Duration, baseline: Baseline) -> TargetReport {
        let old_status = match baseline {
            Baseline::Listed => Some(target.status),
            Baseline::Reread => match self.store.read_one(target.id).await {
                Ok(Some(current)) => Some(current.status),
                Ok(None) => {
                    debug!("Target {} disappeared before probing", target.id);
                    None
                }
                Err(e) => {
                    warn!("Failed to read status of target {}: {:#}", target.id, e);
                    None
                }
            },
        };

        let outcome = self.probe(&target.url, probe_timeout).await;
        match &outcome.error {
            None => info!(
                "Target {} ({}) is UP: {:?} in {}ms",
                target.id,
                target.url,
                outcome.status_code,
                outcome.latency_ms()
            ),
            Some(e) => warn!(
                "Target {} ({}) is DOWN after {}ms: {}",
                target.id,
                target.url,
                outcome.latency_ms(),
                e
            ),
        }

        if let Err(e) = self.store.write_status(target.id, outcome.status).await {
            error!("Failed to record status {} for target {}: {:#}", outcome.status, target.id, e);
            return TargetReport { target_id: target.id, status: outcome.status, written: false, transition: None };
        }

        let transition = old_status.and_then(|old| self.detector.compare(target.id, old, outcome.status));
        if let Some(transition) = &transition {
            info!("Status change for {} ({}): {} -> {}", target.id, target.url, transition.old_status, transition.new_status);
            dispatch_detached(Arc::clone(&self.dispatcher), transition.clone(), self.notify_timeout);
        }

        TargetReport { target_id: target.id, status: outcome.status, written: true, transition }
    }

    /// Outer deadline in case a checker ignores the one it was given
    async fn probe(&self, url: &str, probe_timeout: Duration) -> ProbeOutcome {
        let start = Instant::now();
        match tokio::time::timeout(probe_timeout, self.checker.check(url, probe_timeout)).await {
            Ok(outcome) => outcome,
            Err(_) => ProbeOutcome::down(start.elapsed(), ProbeError::Timeout(probe_timeout)),
        }
    }
}
