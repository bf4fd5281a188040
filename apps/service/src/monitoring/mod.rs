/// Monitoring engine - probes targets and reports status changes
///
/// This module is responsible for:
/// - Probing a single URL with a bounded timeout
/// - Running batches of probes with capped parallelism
/// - Periodic and on-demand sweeps over the target store
/// - Turning status changes into notifications
pub mod checker;
pub mod error;
pub mod executor;
pub mod scheduler;
pub mod sweep;
pub mod transition;
pub mod types;

pub use checker::{Checker, HttpChecker};
pub use error::ProbeError;
pub use executor::{BoundedExecutor, Concurrency};
pub use scheduler::{MonitoringScheduler, SchedulerSettings};
pub use sweep::{Baseline, Sweeper, TargetReport};
pub use transition::TransitionDetector;
pub use types::{ProbeOutcome, RefreshSummary, StatusTransition, SweepSummary, Target, TargetStatus};
