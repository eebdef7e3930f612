//! Structured errors for the memberscan HTTP API.
//!
//! Every error body is `{ "error": "<reason>" }`, except a build that could
//! not finish in time, which answers 202 `{ "status": "building_cache" }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use memberscan_core::Error;
use serde::Serialize;

/// Error body returned for a guild that does not exist or the bot cannot see.
pub const GUILD_NOT_FOUND: &str = "guild_not_found_or_no_access";

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, reason: impl Into<String>) -> Self {
        Self { status, body: ErrorBody::Error { error: reason.into() } }
    }

    /// Same contract as a busy key: retry later.
    pub fn building() -> Self {
        Self { status: StatusCode::ACCEPTED, body: ErrorBody::Status { status: "building_cache" } }
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, reason)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn guild_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, GUILD_NOT_FOUND)
    }

    pub fn bad_gateway(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, reason)
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, reason)
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ErrorBody {
    Error { error: String },
    Status { status: &'static str },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidKey(reason) => ApiError::bad_request(reason),
            Error::EntityNotFound(_) => ApiError::guild_not_found(),
            Error::BuildTimeout(_) => ApiError::building(),
            Error::UpstreamRateLimited(msg) => {
                tracing::warn!(error = %msg, "upstream rate limited");
                ApiError::unavailable("upstream_rate_limited")
            }
            Error::UpstreamAuth(msg) => {
                tracing::error!(error = %msg, "upstream rejected credentials");
                ApiError::bad_gateway("upstream_error")
            }
            Error::Upstream(msg) => {
                tracing::error!(error = %msg, "upstream failure");
                ApiError::bad_gateway("upstream_error")
            }
        }
    }
}
