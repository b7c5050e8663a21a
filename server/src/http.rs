use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::get;
use axum::{Json, Router};
use std::path::Path;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::hub::HubCommand;
use crate::ws::{ws_handler, AppState};

/// Relay endpoint plus the two views and their static assets.
pub fn router(app_state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::temporary("/game") }))
        .route_service(
            "/game",
            ServeFile::new(static_dir.join("game").join("index.html")),
        )
        .route_service(
            "/controller",
            ServeFile::new(static_dir.join("controller").join("index.html")),
        )
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

async fn health(
    State(app_state): State<AppState>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let (tx, rx) = oneshot::channel();
    app_state
        .hub_tx
        .send(HubCommand::Stats { response: tx })
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    let stats = rx.await.map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "rooms": stats.rooms,
        "connections": stats.connections,
    })))
}
