//! API route handlers for the gateway.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::server::AppState;

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "pingpal-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct TouchRequest {
    pub user_id: String,
}

/// Record an inbound message from the user. The chat service calls this
/// on every user turn; it is what resets every idle clock.
pub async fn touch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TouchRequest>,
) -> std::result::Result<Json<serde_json::Value>, (StatusCode, String)> {
    state
        .store
        .touch(&req.user_id, chrono::Utc::now())
        .map_err(internal)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct EnabledRequest {
    pub user_id: String,
    pub enabled: bool,
}

/// Flip the per-user opt-out switch for unsolicited pushes.
pub async fn set_enabled(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EnabledRequest>,
) -> std::result::Result<Json<serde_json::Value>, (StatusCode, String)> {
    state
        .store
        .set_enabled(&req.user_id, req.enabled)
        .map_err(internal)?;
    tracing::info!(user = %req.user_id, enabled = req.enabled, "push opt-out toggled");
    Ok(Json(serde_json::json!({ "ok": true, "enabled": req.enabled })))
}

/// Inspect one user: activity row plus every gate row that exists.
pub async fn user_state(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> std::result::Result<Json<serde_json::Value>, (StatusCode, String)> {
    let activity = state.store.activity(&user_id).map_err(internal)?;
    if activity.is_none() {
        return Err((StatusCode::NOT_FOUND, format!("unknown user: {user_id}")));
    }

    let mut gates = serde_json::Map::new();
    for key in ["shared", "nudge", "articles", "weather", "digest", "market"] {
        if let Some(row) = state.store.gate_state(&user_id, key).map_err(internal)? {
            gates.insert(key.to_string(), serde_json::to_value(row).map_err(internal)?);
        }
    }

    Ok(Json(serde_json::json!({
        "activity": activity,
        "gates": gates,
    })))
}

fn internal(e: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pingpal_store::EngagementStore;

    fn test_state() -> State<Arc<AppState>> {
        State(Arc::new(AppState {
            store: Arc::new(EngagementStore::open_in_memory().unwrap()),
            start_time: std::time::Instant::now(),
        }))
    }

    #[tokio::test]
    async fn test_health_check() {
        let result = health_check(test_state()).await;
        let json = result.0;
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
    }

    #[tokio::test]
    async fn test_touch_then_state() {
        let state = test_state();
        let resp = touch(
            State(state.0.clone()),
            Json(TouchRequest { user_id: "u1".into() }),
        )
        .await
        .unwrap();
        assert_eq!(resp.0["ok"], true);

        let resp = user_state(State(state.0.clone()), Path("u1".into())).await.unwrap();
        assert_eq!(resp.0["activity"]["user_id"], "u1");
        assert_eq!(resp.0["activity"]["enabled"], true);
    }

    #[tokio::test]
    async fn test_unknown_user_is_404() {
        let result = user_state(test_state(), Path("nobody".into())).await;
        assert_eq!(result.unwrap_err().0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_set_enabled_roundtrip() {
        let state = test_state();
        set_enabled(
            State(state.0.clone()),
            Json(EnabledRequest { user_id: "u1".into(), enabled: false }),
        )
        .await
        .unwrap();

        let resp = user_state(State(state.0.clone()), Path("u1".into())).await.unwrap();
        assert_eq!(resp.0["activity"]["enabled"], false);
    }
}
