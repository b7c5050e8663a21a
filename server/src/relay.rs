use crate::registry::ConnectionId;
use crate::router::{Role, SessionRouter};
use iceage_shared::protocol::{GyroData, ServerMsg};
use std::collections::HashMap;
use tokio::sync::{mpsc, watch};

/// Hub-side handle for pushing messages to one connection.
///
/// Shots go through a bounded queue and keep their order. Lifecycle notices
/// have their own lane that never drops. Orientation goes through a single
/// slot that always holds the latest sample.
pub struct ClientLink {
    shots: mpsc::Sender<ServerMsg>,
    notices: mpsc::UnboundedSender<ServerMsg>,
    orientation: watch::Sender<Option<GyroData>>,
}

/// Socket-side ends of a [`ClientLink`].
pub struct LinkReceivers {
    pub shots: mpsc::Receiver<ServerMsg>,
    pub notices: mpsc::UnboundedReceiver<ServerMsg>,
    pub orientation: watch::Receiver<Option<GyroData>>,
}

impl ClientLink {
    pub fn channel(shot_buffer: usize) -> (ClientLink, LinkReceivers) {
        let (shots_tx, shots_rx) = mpsc::channel(shot_buffer);
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();
        let (orientation_tx, orientation_rx) = watch::channel(None);
        (
            ClientLink {
                shots: shots_tx,
                notices: notices_tx,
                orientation: orientation_tx,
            },
            LinkReceivers {
                shots: shots_rx,
                notices: notices_rx,
                orientation: orientation_rx,
            },
        )
    }
}

/// Forwards controller input to the game of the same room.
#[derive(Default)]
pub struct RelayChannel {
    links: HashMap<ConnectionId, ClientLink>,
}

impl RelayChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, conn: ConnectionId, link: ClientLink) {
        self.links.insert(conn, link);
    }

    pub fn detach(&mut self, conn: ConnectionId) -> Option<ClientLink> {
        self.links.remove(&conn)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Send a lifecycle notice to `to`. Notices are never dropped while the
    /// connection is alive.
    pub fn notify(&self, to: ConnectionId, msg: ServerMsg) -> bool {
        match self.links.get(&to) {
            Some(link) => link.notices.send(msg).is_ok(),
            None => {
                tracing::debug!(conn = to, "No link for connection, dropping {:?}", msg);
                false
            }
        }
    }

    /// Replace the host's pending orientation sample with `data`.
    pub fn relay_orientation(
        &self,
        router: &SessionRouter,
        from: ConnectionId,
        data: GyroData,
    ) -> bool {
        let Some(host) = resolve_host(router, from) else {
            return false;
        };
        match self.links.get(&host) {
            Some(link) => {
                link.orientation.send_replace(Some(data));
                true
            }
            None => false,
        }
    }

    /// Forward one shot to the host. Shots are never merged.
    pub fn relay_action(&self, router: &SessionRouter, from: ConnectionId) -> bool {
        let Some(host) = resolve_host(router, from) else {
            tracing::debug!(conn = from, "Dropping shoot from unpaired connection");
            return false;
        };
        let Some(link) = self.links.get(&host) else {
            return false;
        };
        match link.shots.try_send(ServerMsg::PlayerShoot) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn = host, "Shot queue full, dropping shot");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// Host of the room `from` is the registered peer of.
fn resolve_host(router: &SessionRouter, from: ConnectionId) -> Option<ConnectionId> {
    let binding = router.binding(from)?;
    if binding.role != Role::Peer {
        return None;
    }
    router.find_room_for_connection(from).map(|room| room.host)
}
