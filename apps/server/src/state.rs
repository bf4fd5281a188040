use std::sync::Arc;

use sitewatch_service::monitoring::MonitoringScheduler;
use tokio_util::sync::CancellationToken;

/// Shared by every worker through `web::Data`
pub struct AppState {
    pub scheduler: Arc<MonitoringScheduler>,
    /// Refreshes stop starting new probes once the process shuts down
    pub cancel: CancellationToken,
}

impl AppState {
    pub fn new(scheduler: Arc<MonitoringScheduler>, cancel: CancellationToken) -> Self {
        Self { scheduler, cancel }
    }
}
