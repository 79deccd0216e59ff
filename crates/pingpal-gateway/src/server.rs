//! HTTP server setup and shared state.

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

use pingpal_core::config::GatewayConfig;
use pingpal_core::error::{PingPalError, Result};
use pingpal_store::EngagementStore;

use crate::routes;

/// Shared state for all route handlers.
pub struct AppState {
    pub store: Arc<EngagementStore>,
    pub start_time: std::time::Instant,
}

/// Build the router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health_check))
        .route("/activity/touch", post(routes::touch))
        .route("/activity/enabled", post(routes::set_enabled))
        .route("/state/{user_id}", get(routes::user_state))
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(config: &GatewayConfig, store: Arc<EngagementStore>) -> Result<()> {
    let state = Arc::new(AppState { store, start_time: std::time::Instant::now() });
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PingPalError::Gateway(format!("bind {addr}: {e}")))?;
    tracing::info!("gateway listening on http://{addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| PingPalError::Gateway(format!("server error: {e}")))
}
