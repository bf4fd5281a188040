use thiserror::Error;
use url::Url;

/// Longest sweep interval accepted from configuration
pub const MAX_INTERVAL_SECONDS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("target cannot be empty")]
    Empty,
    #[error("URL must include scheme (http:// or https://)")]
    MissingScheme,
    #[error("invalid scheme '{0}', must be http or https")]
    UnsupportedScheme(String),
    #[error("URL must have a valid host")]
    MissingHost,
    #[error("invalid URL: {0}")]
    Malformed(String),
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
    #[error("{field} too long (max {max} seconds)")]
    TooLong { field: &'static str, max: u64 },
}

/// Validate an HTTP/HTTPS target URL and return it parsed
pub fn validate_http_endpoint(target: &str) -> Result<Url, ValidationError> {
    if target.trim().is_empty() {
        return Err(ValidationError::Empty);
    }

    match Url::parse(target) {
        Ok(url) => {
            let scheme = url.scheme();
            if scheme != "http" && scheme != "https" {
                return Err(ValidationError::UnsupportedScheme(scheme.to_string()));
            }

            if url.host_str().is_none_or(str::is_empty) {
                return Err(ValidationError::MissingHost);
            }

            Ok(url)
        }
        Err(e) => {
            // Bare hostnames are the common mistake
            if !target.contains("://") {
                Err(ValidationError::MissingScheme)
            } else {
                Err(ValidationError::Malformed(e.to_string()))
            }
        }
    }
}

/// Validate a sweep interval in seconds
pub fn validate_interval(field: &'static str, interval: u64) -> Result<(), ValidationError> {
    if interval == 0 {
        return Err(ValidationError::Zero { field });
    }

    if interval > MAX_INTERVAL_SECONDS {
        return Err(ValidationError::TooLong { field, max: MAX_INTERVAL_SECONDS });
    }

    Ok(())
}

/// Validate a concurrency limit or timeout that must be non-zero
pub fn validate_positive(field: &'static str, value: u64) -> Result<(), ValidationError> {
    if value == 0 { Err(ValidationError::Zero { field }) } else { Ok(()) }
}
