use std::time::Duration;

use thiserror::Error;

/// Why a probe classified its target as down
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected status code {0}")]
    UnexpectedStatus(u16),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ProbeError {
    /// Map a reqwest failure onto the probe taxonomy
    pub fn from_request(error: &reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            ProbeError::Timeout(timeout)
        } else if error.is_builder() {
            ProbeError::InvalidUrl(error.to_string())
        } else {
            ProbeError::Transport(error.to_string())
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::Timeout(_))
    }
}
