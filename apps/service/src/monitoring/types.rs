use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use super::error::ProbeError;

/// Recorded reachability of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetStatus {
    Up,
    Down,
    /// No probe has completed yet
    Unknown,
}

impl TargetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Up => "UP",
            TargetStatus::Down => "DOWN",
            TargetStatus::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UP" => Ok(TargetStatus::Up),
            "DOWN" => Ok(TargetStatus::Down),
            "UNKNOWN" => Ok(TargetStatus::Unknown),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognised target status '{0}'")]
pub struct UnknownStatus(pub String);

/// A monitored URL and its latest known status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: Uuid,
    pub url: String,
    pub owner_id: Uuid,
    pub status: TargetStatus,
    pub last_checked: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Target {
    /// Create a never-probed target
    pub fn new(url: impl Into<String>, owner_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            owner_id,
            status: TargetStatus::Unknown,
            last_checked: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: TargetStatus) -> Self {
        self.status = status;
        self
    }
}

/// Result of a single probe attempt
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    /// Always `Up` or `Down`
    pub status: TargetStatus,
    pub latency: Duration,
    /// Status code of the final response, if one arrived
    pub status_code: Option<u16>,
    pub error: Option<ProbeError>,
}

impl ProbeOutcome {
    pub fn up(latency: Duration, status_code: u16) -> Self {
        Self { status: TargetStatus::Up, latency, status_code: Some(status_code), error: None }
    }

    pub fn down(latency: Duration, error: ProbeError) -> Self {
        let status_code = match &error {
            ProbeError::UnexpectedStatus(code) => Some(*code),
            _ => None,
        };
        Self { status: TargetStatus::Down, latency, status_code, error: Some(error) }
    }

    pub fn is_up(&self) -> bool {
        self.status == TargetStatus::Up
    }

    pub fn latency_ms(&self) -> u64 {
        u64::try_from(self.latency.as_millis()).unwrap_or(u64::MAX)
    }
}

/// A change between two recorded statuses of the same target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub target_id: Uuid,
    pub old_status: TargetStatus,
    pub new_status: TargetStatus,
    pub observed_at: DateTime<Utc>,
}

impl std::fmt::Display for StatusTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} -> {}", self.target_id, self.old_status, self.new_status)
    }
}

/// Counters for one full-fleet sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub total: usize,
    pub up: usize,
    pub down: usize,
    pub write_failures: usize,
    pub transitions: usize,
}

/// Answer to an on-demand refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub total: usize,
    pub updated: usize,
}
