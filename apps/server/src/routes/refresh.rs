use actix_web::{HttpResponse, post, web};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

macros_utils::routes! {
    route refresh_route,
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    message: &'static str,
    total: usize,
    updated: usize,
}

/// Probe every target of one owner now and report how many were stored
#[post("/owners/{owner_id}/refresh")]
pub async fn refresh_route(
    state: web::Data<AppState>,
    owner_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let owner_id = Uuid::parse_str(&owner_id).map_err(|_| ApiError::InvalidOwnerId)?;

    let summary = state
        .scheduler
        .refresh_owner(owner_id, &state.cancel)
        .await
        .map_err(ApiError::Listing)?;

    let message = if summary.total == 0 { "No targets to refresh" } else { "Targets refreshed successfully" };

    Ok(HttpResponse::Ok().json(RefreshResponse { message, total: summary.total, updated: summary.updated }))
}
