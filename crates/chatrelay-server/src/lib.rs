//! chatrelay server library logic.

pub mod api;
pub mod config;
pub mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use chatrelay_pipeline::{
    ChatIngestor, CommandHandler, FeedError, HttpChatFeed, LifecycleController,
    PlaybackScheduler, TenantRegistry,
};
use chatrelay_store::MessageStore;
use chatrelay_voice::{build_renderer, CommandPlayerGateway, VoiceError};
use config::Config;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Tenant command execution.
    pub handler: CommandHandler,
    /// Bearer token required on command routes.
    pub token: Option<String>,
}

/// Failure wiring the pipeline from configuration.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build speech renderer: {0}")]
    Renderer(#[from] VoiceError),
    #[error("failed to build chat feed client: {0}")]
    Feed(#[from] FeedError),
}

/// Maximum request body size (64 KiB). Command bodies are tiny.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Builds the command handler and its collaborators from configuration.
///
/// # Errors
///
/// Returns `StartupError` if the renderer or feed client cannot be built.
pub fn build_handler(config: &Config) -> Result<CommandHandler, StartupError> {
    let renderer = build_renderer(&config.voice)?;
    let gateway = Arc::new(CommandPlayerGateway::from_config(&config.voice));
    let feed = Arc::new(HttpChatFeed::new(
        &config.feed.base_url,
        config.feed.connect_timeout(),
    )?);
    let registry = Arc::new(TenantRegistry::new(MessageStore::new(
        &config.pipeline.data_dir,
    )));

    Ok(CommandHandler::new(
        registry,
        LifecycleController::new(config.pipeline.settle_delay()),
        ChatIngestor::new(feed),
        PlaybackScheduler::new(renderer, &config.pipeline),
        gateway,
    ))
}

/// Liveness handler.
async fn liveness() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let command_routes = Router::new()
        .route("/tenants/{tenantId}/join", post(api::join_handler))
        .route("/tenants/{tenantId}/stop", post(api::stop_handler))
        .layer(axum::middleware::from_fn(middleware::auth_middleware));

    Router::new()
        .route("/", get(liveness))
        .merge(command_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(Extension(Arc::new(state)))
}
