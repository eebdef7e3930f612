//! Shared-secret header check for the feature routes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-admin-lab-key";

/// Reject requests whose `x-admin-lab-key` does not match the configured key.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>, request: Request, next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if provided != state.api_key {
        tracing::debug!(path = %request.uri().path(), "rejected request with bad api key");
        return Err(ApiError::unauthorized());
    }

    Ok(next.run(request).await)
}
