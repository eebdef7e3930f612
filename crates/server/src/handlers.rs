//! Request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use memberscan_core::{QueryParams, SnapshotOutcome};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::state::AppState;

/// Body returned while a snapshot is being built, with the key flattened in.
#[derive(Serialize)]
struct Building<'a, K> {
    status: &'static str,
    #[serde(flatten)]
    key: &'a K,
}

/// Map a snapshot outcome onto the HTTP contract.
fn snapshot_response<K: Serialize, P: Serialize>(outcome: SnapshotOutcome<K, P>) -> Result<Response, ApiError> {
    match outcome {
        SnapshotOutcome::Hit(payload) => Ok(Json(&*payload).into_response()),
        SnapshotOutcome::Building(key) => {
            Ok((StatusCode::ACCEPTED, Json(Building { status: "building_cache", key: &key })).into_response())
        }
        SnapshotOutcome::NotFound(_) => Err(ApiError::guild_not_found()),
        SnapshotOutcome::InvalidKey(reason) => Err(ApiError::bad_request(reason)),
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// `GET /role-members?guild_id=..&role_id=..`
pub async fn role_members(
    State(state): State<Arc<AppState>>, Query(params): Query<QueryParams>,
) -> Result<Response, ApiError> {
    snapshot_response(state.role_members.request(&params).await?)
}

/// `GET /boosters?guild_id=..`
pub async fn boosters(
    State(state): State<Arc<AppState>>, Query(params): Query<QueryParams>,
) -> Result<Response, ApiError> {
    snapshot_response(state.boosters.request(&params).await?)
}
