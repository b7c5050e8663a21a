use crate::error::SessionError;
use crate::registry::{ConnectionId, Room, RoomRegistry};
use std::collections::HashMap;
use std::time::Instant;

/// Side a connection plays in its room. Fixed once bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The game display that created the room.
    Host,
    /// The controller that joined it.
    Peer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub room_code: String,
    pub role: Role,
}

/// Binds connections to rooms and roles.
///
/// All mutations go through `&mut self`; the hub task is the only owner, so
/// the first `bind_peer` on a room wins and later ones see `RoomFull`.
pub struct SessionRouter {
    registry: RoomRegistry,
    bindings: HashMap<ConnectionId, Binding>,
}

impl SessionRouter {
    pub fn new(registry: RoomRegistry) -> Self {
        Self {
            registry,
            bindings: HashMap::new(),
        }
    }

    /// Create a room hosted by `conn` and return its code.
    pub fn bind_host(
        &mut self,
        conn: ConnectionId,
        now: Instant,
    ) -> Result<String, SessionError> {
        if self.bindings.contains_key(&conn) {
            return Err(SessionError::AlreadyBound);
        }
        let code = self.registry.create_room(conn, now)?;
        self.bindings.insert(
            conn,
            Binding {
                room_code: code.clone(),
                role: Role::Host,
            },
        );
        Ok(code)
    }

    /// Join `conn` to the room as its peer. Returns the host to notify.
    pub fn bind_peer(
        &mut self,
        conn: ConnectionId,
        code: &str,
    ) -> Result<ConnectionId, SessionError> {
        if self.bindings.contains_key(&conn) {
            return Err(SessionError::AlreadyBound);
        }
        let room = self
            .registry
            .get_room_mut(code)
            .ok_or(SessionError::RoomNotFound)?;
        if room.peer.is_some() {
            return Err(SessionError::RoomFull);
        }
        room.peer = Some(conn);
        let host = room.host;

        self.bindings.insert(
            conn,
            Binding {
                room_code: code.to_string(),
                role: Role::Peer,
            },
        );
        Ok(host)
    }

    /// Forget the connection's binding. Room state is left alone.
    pub fn unbind(&mut self, conn: ConnectionId) -> Option<Binding> {
        self.bindings.remove(&conn)
    }

    pub fn binding(&self, conn: ConnectionId) -> Option<&Binding> {
        self.bindings.get(&conn)
    }

    /// The room `conn` belongs to, if that room still lists it as a member.
    pub fn find_room_for_connection(&self, conn: ConnectionId) -> Option<&Room> {
        let binding = self.bindings.get(&conn)?;
        let room = self.registry.get_room(&binding.room_code)?;
        let member = match binding.role {
            Role::Host => room.host == conn,
            Role::Peer => room.peer == Some(conn),
        };
        member.then_some(room)
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut RoomRegistry {
        &mut self.registry
    }

    pub fn bound_count(&self) -> usize {
        self.bindings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> SessionRouter {
        SessionRouter::new(RoomRegistry::new(Some(7)))
    }

    #[test]
    fn bind_host_records_host_role() {
        let mut router = router();
        let code = router.bind_host(1, Instant::now()).unwrap();

        let binding = router.binding(1).unwrap();
        assert_eq!(binding.role, Role::Host);
        assert_eq!(binding.room_code, code);
        assert_eq!(router.find_room_for_connection(1).unwrap().code, code);
    }

    #[test]
    fn bind_peer_pairs_room() {
        let mut router = router();
        let code = router.bind_host(1, Instant::now()).unwrap();

        assert_eq!(router.bind_peer(2, &code), Ok(1));
        let room = router.registry().get_room(&code).unwrap();
        assert_eq!(room.peer, Some(2));
        assert_eq!(router.binding(2).unwrap().role, Role::Peer);
        assert_eq!(router.find_room_for_connection(2).unwrap().code, code);
    }

    #[test]
    fn only_first_peer_wins() {
        let mut router = router();
        let code = router.bind_host(1, Instant::now()).unwrap();

        assert!(router.bind_peer(2, &code).is_ok());
        assert_eq!(router.bind_peer(3, &code), Err(SessionError::RoomFull));
        assert_eq!(router.registry().get_room(&code).unwrap().peer, Some(2));
        assert!(router.binding(3).is_none());
    }

    #[test]
    fn unknown_code_is_not_found_and_mutates_nothing() {
        let mut router = router();
        let code = router.bind_host(1, Instant::now()).unwrap();
        let before = router.registry().get_room(&code).cloned();

        assert_eq!(router.bind_peer(2, "0000"), Err(SessionError::RoomNotFound));
        assert!(router.binding(2).is_none());
        assert_eq!(router.registry().get_room(&code).cloned(), before);
        assert_eq!(router.registry().len(), 1);
    }

    #[test]
    fn bound_connection_cannot_rebind() {
        let mut router = router();
        let code = router.bind_host(1, Instant::now()).unwrap();
        router.bind_peer(2, &code).unwrap();

        assert_eq!(router.bind_host(1, Instant::now()), Err(SessionError::AlreadyBound));
        assert_eq!(router.bind_host(2, Instant::now()), Err(SessionError::AlreadyBound));
        assert_eq!(router.bind_peer(1, &code), Err(SessionError::AlreadyBound));
        assert_eq!(router.registry().len(), 1);
    }

    #[test]
    fn unbind_leaves_room_untouched() {
        let mut router = router();
        let code = router.bind_host(1, Instant::now()).unwrap();
        router.bind_peer(2, &code).unwrap();

        let binding = router.unbind(2).unwrap();
        assert_eq!(binding.role, Role::Peer);
        assert!(router.find_room_for_connection(2).is_none());
        assert_eq!(router.registry().get_room(&code).unwrap().peer, Some(2));
        assert!(router.unbind(2).is_none());
    }

    #[test]
    fn stale_binding_does_not_resolve_to_reused_code() {
        let mut router = router();
        let code = router.bind_host(1, Instant::now()).unwrap();

        // Room vanishes and its code is taken by another host.
        router.registry_mut().delete_room(&code);
        router.registry_mut().insert_room(Room {
            code: code.clone(),
            host: 9,
            peer: None,
            created_at: Instant::now(),
        });

        assert!(router.binding(1).is_some());
        assert!(router.find_room_for_connection(1).is_none());
    }
}
