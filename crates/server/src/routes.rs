//! API route configuration.

use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::handlers;
use crate::state::AppState;

/// Creates the API router. Feature routes sit behind the api key check; `/health` does not.
pub fn create_router(state: Arc<AppState>) -> Router {
    let features = Router::new()
        .route("/role-members", get(handlers::role_members))
        .route("/boosters", get(handlers::boosters))
        .route_layer(middleware::from_fn_with_state(Arc::clone(&state), auth::require_api_key));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(features)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
