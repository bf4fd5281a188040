use chrono::Utc;
use uuid::Uuid;

use super::types::{StatusTransition, TargetStatus};

/// Decides whether a fresh probe result is a change worth announcing
///
/// Stateless: it knows nothing about other sweeps, so two sweeps that both saw
/// the same old status will both get a transition back.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionDetector;

impl TransitionDetector {
    pub fn compare(
        &self,
        target_id: Uuid,
        old_status: TargetStatus,
        new_status: TargetStatus,
    ) -> Option<StatusTransition> {
        (old_status != new_status).then(|| StatusTransition {
            target_id,
            old_status,
            new_status,
            observed_at: Utc::now(),
        })
    }
}
