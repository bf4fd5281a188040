use anyhow::Result;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

use super::error::ProbeError;
use super::types::{ProbeOutcome, TargetStatus};
use crate::validation::validate_http_endpoint;

/// Liveness probe for a single target URL
///
/// Implementations never fail: every problem is folded into a `Down` outcome
/// carrying a [`ProbeError`].
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    /// Probe `url`, giving up after `timeout`
    async fn check(&self, url: &str, timeout: Duration) -> ProbeOutcome;
}

/// Classify the status code of a completed response
pub fn classify_status(code: u16) -> TargetStatus {
    if (200..400).contains(&code) { TargetStatus::Up } else { TargetStatus::Down }
}

/// HEAD-request checker
pub struct HttpChecker {
    client: reqwest::Client,
    client_timeout: Duration,
}

impl HttpChecker {
    /// `client_timeout` caps every request regardless of the per-call timeout
    pub fn new(client_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(client_timeout)
            .user_agent(concat!("sitewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, client_timeout })
    }

    /// Wrap an existing client; `client_timeout` should be the one it was built with
    pub fn with_client(client: reqwest::Client, client_timeout: Duration) -> Self {
        Self { client, client_timeout }
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn check(&self, url: &str, deadline: Duration) -> ProbeOutcome {
        let start = Instant::now();

        let parsed = match validate_http_endpoint(url) {
            Ok(parsed) => parsed,
            Err(e) => return ProbeOutcome::down(start.elapsed(), ProbeError::InvalidUrl(e.to_string())),
        };

        let outcome = match timeout(deadline, self.client.head(parsed).send()).await {
            Err(_) => ProbeOutcome::down(start.elapsed(), ProbeError::Timeout(deadline)),
            Ok(Err(e)) => {
                let bound = self.client_timeout.min(deadline);
                ProbeOutcome::down(start.elapsed(), ProbeError::from_request(&e, bound))
            }
            Ok(Ok(response)) => {
                let latency = start.elapsed();
                let code = response.status().as_u16();
                match classify_status(code) {
                    TargetStatus::Up => ProbeOutcome::up(latency, code),
                    _ => ProbeOutcome::down(latency, ProbeError::UnexpectedStatus(code)),
                }
            }
        };

        debug!(
            "HEAD {} -> {} ({:?}, {}ms)",
            url,
            outcome.status,
            outcome.status_code,
            outcome.latency_ms()
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{HttpResponder, local_http_client, refused_url};

    fn checker(client_timeout: Duration) -> HttpChecker {
        HttpChecker::with_client(local_http_client(client_timeout), client_timeout)
    }

    #[test]
    fn test_classify_status_boundaries() {
        assert_eq!(classify_status(199), TargetStatus::Down);
        assert_eq!(classify_status(200), TargetStatus::Up);
        assert_eq!(classify_status(204), TargetStatus::Up);
        assert_eq!(classify_status(301), TargetStatus::Up);
        assert_eq!(classify_status(399), TargetStatus::Up);
        assert_eq!(classify_status(400), TargetStatus::Down);
        assert_eq!(classify_status(404), TargetStatus::Down);
        assert_eq!(classify_status(503), TargetStatus::Down);
    }

    #[tokio::test]
    async fn test_http_check_up_codes() {
        let probe = checker(Duration::from_secs(5));

        for code in [200u16, 204, 399] {
            let server = HttpResponder::status(code).await;
            let outcome = probe.check(&server.url(), Duration::from_secs(5)).await;
            assert_eq!(outcome.status, TargetStatus::Up, "code {code}");
            assert_eq!(outcome.status_code, Some(code));
            assert!(outcome.error.is_none());
        }
    }

    #[tokio::test]
    async fn test_http_check_down_codes() {
        let probe = checker(Duration::from_secs(5));

        for code in [400u16, 404, 500, 503] {
            let server = HttpResponder::status(code).await;
            let outcome = probe.check(&server.url(), Duration::from_secs(5)).await;
            assert_eq!(outcome.status, TargetStatus::Down, "code {code}");
            assert_eq!(outcome.error, Some(ProbeError::UnexpectedStatus(code)));
        }
    }

    #[tokio::test]
    async fn test_http_check_sends_head() {
        let probe = checker(Duration::from_secs(5));
        let server = HttpResponder::status(200).await;

        probe.check(&server.url(), Duration::from_secs(5)).await;

        let request_lines = server.request_lines();
        assert_eq!(request_lines.len(), 1);
        assert!(request_lines[0].starts_with("HEAD / "), "{}", request_lines[0]);
    }

    #[tokio::test]
    async fn test_http_check_timeout_resolves_down_promptly() {
        let probe = checker(Duration::from_secs(30));
        let server = HttpResponder::silent().await;
        let deadline = Duration::from_millis(200);

        let started = Instant::now();
        let outcome = probe.check(&server.url(), deadline).await;

        assert_eq!(outcome.status, TargetStatus::Down);
        assert!(outcome.error.as_ref().is_some_and(ProbeError::is_timeout));
        assert!(started.elapsed() < deadline + Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_http_check_client_timeout_wins_when_shorter() {
        let probe = checker(Duration::from_millis(150));
        let server = HttpResponder::silent().await;

        let started = Instant::now();
        let outcome = probe.check(&server.url(), Duration::from_secs(10)).await;

        assert_eq!(outcome.status, TargetStatus::Down);
        assert!(outcome.error.as_ref().is_some_and(ProbeError::is_timeout));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_http_check_connection_refused() {
        let probe = checker(Duration::from_secs(5));
        let url = refused_url().await;

        let outcome = probe.check(&url, Duration::from_secs(5)).await;

        assert_eq!(outcome.status, TargetStatus::Down);
        assert!(matches!(outcome.error, Some(ProbeError::Transport(_))));
    }

    #[tokio::test]
    async fn test_http_check_invalid_url() {
        let probe = checker(Duration::from_secs(5));

        for url in ["", "example.com", "ftp://example.com/file"] {
            let outcome = probe.check(url, Duration::from_secs(5)).await;
            assert_eq!(outcome.status, TargetStatus::Down);
            assert!(matches!(outcome.error, Some(ProbeError::InvalidUrl(_))), "{url}");
        }
    }
}
