//! memberscan server entry point.
//!
//! Boots the HTTP API in front of the Discord member snapshots.
//! Logs are JSON on stderr, filtered by `RUST_LOG`.

use std::sync::Arc;

use anyhow::Result;
use memberscan_client::DiscordClient;
use memberscan_core::{AppConfig, MemberSource};
use tracing_subscriber::EnvFilter;

mod auth;
mod error;
mod handlers;
mod routes;
mod state;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let api_key = config.require_api_key()?.to_string();

    let client = DiscordClient::from_app_config(&config)?;
    let bot = client.current_user().await?;
    tracing::info!(bot_id = bot.id, username = %bot.username, "authenticated with Discord");

    let source: Arc<dyn MemberSource> = Arc::new(client);
    let state = Arc::new(state::AppState::new(&config, api_key, source));
    let app = routes::create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "memberscan API listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutting down");
}
