//! Teardown policy for departing connections and expired rooms.
//!
//! Host departure destroys the room and unpairs its controller. Peer
//! departure only frees the controller slot.

use crate::registry::ConnectionId;
use crate::relay::RelayChannel;
use crate::router::{Role, SessionRouter};
use iceage_shared::protocol::ServerMsg;
use std::time::{Duration, Instant};

/// What a disconnect did to the room the connection belonged to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Teardown {
    /// The connection never completed create or join.
    Unbound,
    /// The room was destroyed; `peer` was told the game ended.
    HostLeft {
        code: String,
        peer: Option<ConnectionId>,
    },
    /// The room is awaiting a new controller; `host` was told.
    PeerLeft { code: String, host: ConnectionId },
}

/// Apply teardown for a connection that has gone away.
pub fn handle_disconnect(
    router: &mut SessionRouter,
    relay: &RelayChannel,
    conn: ConnectionId,
) -> Teardown {
    let Some(binding) = router.binding(conn).cloned() else {
        return Teardown::Unbound;
    };
    if router.find_room_for_connection(conn).is_none() {
        // Room already gone (expired); nothing left to notify.
        router.unbind(conn);
        return Teardown::Unbound;
    }

    match binding.role {
        Role::Host => {
            let peer = router
                .registry()
                .get_room(&binding.room_code)
                .and_then(|room| room.peer);
            if let Some(peer) = peer {
                relay.notify(peer, ServerMsg::GameDisconnected);
                router.unbind(peer);
            }
            router.registry_mut().delete_room(&binding.room_code);
            router.unbind(conn);
            tracing::info!(code = %binding.room_code, "Room deleted, game disconnected");
            Teardown::HostLeft {
                code: binding.room_code,
                peer,
            }
        }
        Role::Peer => {
            let mut host = None;
            if let Some(room) = router.registry_mut().get_room_mut(&binding.room_code) {
                room.peer = None;
                host = Some(room.host);
            }
            router.unbind(conn);
            match host {
                Some(host) => {
                    relay.notify(host, ServerMsg::ControllerDisconnected);
                    tracing::info!(code = %binding.room_code, "Controller disconnected from room");
                    Teardown::PeerLeft {
                        code: binding.room_code,
                        host,
                    }
                }
                None => Teardown::Unbound,
            }
        }
    }
}

/// Delete rooms older than `max_age` and release their members.
///
/// With `notify` set, the game gets `room-expired` and a paired controller
/// is told its game is gone. Returns the deleted codes.
pub fn sweep_expired(
    router: &mut SessionRouter,
    relay: &RelayChannel,
    now: Instant,
    max_age: Duration,
    notify: bool,
) -> Vec<String> {
    let expired = router.registry_mut().sweep_expired(now, max_age);
    let mut codes = Vec::with_capacity(expired.len());

    for room in expired {
        if notify {
            relay.notify(room.host, ServerMsg::RoomExpired);
        }
        router.unbind(room.host);
        if let Some(peer) = room.peer {
            if notify {
                relay.notify(peer, ServerMsg::GameDisconnected);
            }
            router.unbind(peer);
        }
        tracing::info!(code = %room.code, "Expired room deleted");
        codes.push(room.code);
    }

    codes
}
