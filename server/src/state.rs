use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::lifecycle::{self, Teardown};
use crate::registry::{ConnectionId, RoomRegistry};
use crate::relay::{ClientLink, RelayChannel};
use crate::router::SessionRouter;
use iceage_shared::protocol::{GyroData, ServerMsg};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Counters reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub rooms: usize,
    pub connections: usize,
}

/// Central pairing state owned by the hub task.
pub struct HubState {
    pub router: SessionRouter,
    pub relay: RelayChannel,
    max_room_age: Duration,
    notify_on_expiry: bool,
    next_connection_id: ConnectionId,
}

impl HubState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            router: SessionRouter::new(RoomRegistry::new(config.rng_seed)),
            relay: RelayChannel::new(),
            max_room_age: config.max_room_age,
            notify_on_expiry: config.notify_on_expiry,
            next_connection_id: 1,
        }
    }

    /// Register a socket and return its id.
    pub fn connect(&mut self, link: ClientLink) -> ConnectionId {
        let id = self.next_connection_id;
        self.next_connection_id += 1;
        self.relay.attach(id, link);
        id
    }

    pub fn create_room(
        &mut self,
        conn: ConnectionId,
        now: Instant,
    ) -> Result<String, SessionError> {
        let result = self.router.bind_host(conn, now);
        match &result {
            Ok(code) => tracing::info!(%code, conn, "Room created"),
            Err(e) => tracing::info!(conn, "Create room refused: {}", e),
        }
        result
    }

    pub fn join_room(&mut self, conn: ConnectionId, code: &str) -> Result<(), SessionError> {
        match self.router.bind_peer(conn, code) {
            Ok(host) => {
                self.relay.notify(host, ServerMsg::ControllerConnected);
                tracing::info!(%code, conn, "Controller joined room");
                Ok(())
            }
            Err(e) => {
                tracing::info!(%code, conn, "Join refused: {}", e);
                Err(e)
            }
        }
    }

    pub fn gyro(&self, conn: ConnectionId, data: GyroData) {
        self.relay.relay_orientation(&self.router, conn, data);
    }

    pub fn shoot(&self, conn: ConnectionId) {
        self.relay.relay_action(&self.router, conn);
    }

    pub fn disconnect(&mut self, conn: ConnectionId) -> Teardown {
        let teardown = lifecycle::handle_disconnect(&mut self.router, &self.relay, conn);
        self.relay.detach(conn);
        teardown
    }

    pub fn sweep(&mut self, now: Instant) -> Vec<String> {
        lifecycle::sweep_expired(
            &mut self.router,
            &self.relay,
            now,
            self.max_room_age,
            self.notify_on_expiry,
        )
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            rooms: self.router.registry().len(),
            connections: self.relay.len(),
        }
    }
}
