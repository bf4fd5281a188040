/// Status-change notifications
///
/// The engine only knows [`NotificationDispatcher`]; delivery runs on its own
/// task through [`dispatch_detached`] so a slow channel never holds up probing.
pub mod telegram;

pub use telegram::{TelegramClient, TelegramNotifier};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::monitoring::types::StatusTransition;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("recipient lookup failed: {0:#}")]
    Lookup(#[from] anyhow::Error),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("delivery endpoint returned status {0}")]
    Status(u16),
    #[error("delivery endpoint rejected the message")]
    Rejected,
}

/// Delivers a status change to whoever owns the target
///
/// Implementations resolve the owner themselves and return `Ok(())` without
/// sending anything when the owner has no channel configured.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, transition: &StatusTransition) -> Result<(), DispatchError>;
}

/// Send `transition` on a background task bounded by `timeout`
///
/// Failures are logged and dropped; nothing is retried.
pub fn dispatch_detached(
    dispatcher: Arc<dyn NotificationDispatcher>,
    transition: StatusTransition,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, dispatcher.notify(&transition)).await {
            Ok(Ok(())) => debug!("Notification dispatched for {}", transition),
            Ok(Err(e)) => warn!("Failed to send notification for {}: {}", transition, e),
            Err(_) => warn!("Notification for {} timed out after {:?}", transition, timeout),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::TargetStatus;
    use crate::testing::RecordingDispatcher;
    use chrono::Utc;
    use std::time::Instant;
    use uuid::Uuid;

    fn transition() -> StatusTransition {
        StatusTransition {
            target_id: Uuid::new_v4(),
            old_status: TargetStatus::Up,
            new_status: TargetStatus::Down,
            observed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_detached_delivers() {
        let dispatcher = RecordingDispatcher::new();
        let sent = transition();

        dispatch_detached(dispatcher.clone(), sent.clone(), Duration::from_secs(1)).await.unwrap();

        assert_eq!(dispatcher.transitions(), vec![sent]);
    }

    #[tokio::test]
    async fn test_dispatch_detached_gives_up_after_timeout() {
        let dispatcher = RecordingDispatcher::hanging();

        let started = Instant::now();
        dispatch_detached(dispatcher.clone(), transition(), Duration::from_millis(50)).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(dispatcher.transitions().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_detached_swallows_errors() {
        let dispatcher = RecordingDispatcher::failing();
        let handle = dispatch_detached(dispatcher.clone(), transition(), Duration::from_secs(1));
        assert!(handle.await.is_ok());
        assert_eq!(dispatcher.transitions().len(), 1);
    }
}
