use std::io::Error as IoError;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use sitewatch_service::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Address parsing error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Engine startup failed: {0:#}")]
    Engine(#[from] anyhow::Error),
}

/// Errors returned to HTTP clients as `{"error": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid owner id")]
    InvalidOwnerId,
    #[error("Failed to get targets")]
    Listing(#[source] anyhow::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidOwnerId => StatusCode::BAD_REQUEST,
            ApiError::Listing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Listing(e) = self {
            tracing::error!("Refresh failed: {:#}", e);
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
