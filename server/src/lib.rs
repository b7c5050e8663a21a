//! Ice Age Shooter pairing and relay server.
//!
//! A game display creates a room and gets a 4-digit code; a phone controller
//! joins with that code and streams orientation and shots to the game.

pub mod config;
pub mod error;
pub mod http;
pub mod hub;
pub mod lifecycle;
pub mod registry;
pub mod relay;
pub mod router;
pub mod state;
pub mod ws;

use axum::Router;
use config::ServerConfig;
use hub::{run_hub, HubCommand};
use tokio::sync::mpsc;
use ws::AppState;

const HUB_CHANNEL_CAPACITY: usize = 1024;

/// Spawn the hub task and build the HTTP/WebSocket app around it.
/// Must be called inside a tokio runtime.
pub fn build_app(config: ServerConfig) -> Router {
    let (hub_tx, hub_rx) = mpsc::channel::<HubCommand>(HUB_CHANNEL_CAPACITY);
    let app_state = AppState::new(hub_tx, &config);
    let static_dir = config.static_dir.clone();

    tokio::spawn(run_hub(hub_rx, config));

    http::router(app_state, &static_dir)
}
