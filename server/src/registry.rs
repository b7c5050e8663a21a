use crate::error::SessionError;
use iceage_shared::config::{ROOM_CODE_MAX, ROOM_CODE_MIN, ROOM_CODE_SPACE};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Transport-assigned identifier of a client connection.
pub type ConnectionId = u64;

/// Random draws before falling back to a scan for a free code.
const MAX_CODE_DRAWS: usize = 32;

/// A game (host) and at most one controller (peer) sharing a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub code: String,
    pub host: ConnectionId,
    pub peer: Option<ConnectionId>,
    pub created_at: Instant,
}

impl Room {
    pub fn is_expired(&self, now: Instant, max_age: Duration) -> bool {
        now.saturating_duration_since(self.created_at) > max_age
    }
}

/// Owns every live room, keyed by code.
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    rng: ChaCha8Rng,
}

impl RoomRegistry {
    /// A fixed seed makes code allocation reproducible.
    pub fn new(rng_seed: Option<u64>) -> Self {
        let rng = match rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            rooms: HashMap::new(),
            rng,
        }
    }

    /// Register a new room awaiting its peer and return its code.
    pub fn create_room(
        &mut self,
        host: ConnectionId,
        now: Instant,
    ) -> Result<String, SessionError> {
        let code = self.allocate_code()?;
        self.rooms.insert(
            code.clone(),
            Room {
                code: code.clone(),
                host,
                peer: None,
                created_at: now,
            },
        );
        Ok(code)
    }

    pub fn get_room(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub(crate) fn get_room_mut(&mut self, code: &str) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    /// Remove a room. Removing an unknown code is a no-op.
    pub fn delete_room(&mut self, code: &str) -> Option<Room> {
        self.rooms.remove(code)
    }

    /// Delete every room older than `max_age`, paired or not, and return them.
    pub fn sweep_expired(&mut self, now: Instant, max_age: Duration) -> Vec<Room> {
        let expired: Vec<String> = self
            .rooms
            .values()
            .filter(|room| room.is_expired(now, max_age))
            .map(|room| room.code.clone())
            .collect();

        expired
            .iter()
            .filter_map(|code| self.rooms.remove(code))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn insert_room(&mut self, room: Room) {
        self.rooms.insert(room.code.clone(), room);
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn allocate_code(&mut self) -> Result<String, SessionError> {
        if self.rooms.len() >= ROOM_CODE_SPACE {
            return Err(SessionError::CapacityExhausted);
        }

        for _ in 0..MAX_CODE_DRAWS {
            let code = self.rng.gen_range(ROOM_CODE_MIN..=ROOM_CODE_MAX).to_string();
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }

        // Nearly full: walk the code space from a random offset.
        let start = self.rng.gen_range(0..ROOM_CODE_SPACE);
        (0..ROOM_CODE_SPACE)
            .map(|i| (ROOM_CODE_MIN as usize + (start + i) % ROOM_CODE_SPACE).to_string())
            .find(|code| !self.rooms.contains_key(code))
            .ok_or(SessionError::CapacityExhausted)
    }
}
