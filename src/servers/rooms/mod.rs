//! Room registry: the process-wide directory of named rooms.
//!
//! Created once at startup and shared through `ServerState`. The map lock is
//! never held while a room lock is taken.

pub mod room;

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::game::Color;
use crate::servers::Peer;
pub use room::{Room, RoomPhase};

pub type SharedRoom = Arc<Mutex<Room>>;

/// Expected lobby failures. `Display` is the text sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Error: Room name is already taken")]
    NameTaken(String),

    #[error("Error: Room not found")]
    NotFound(String),

    #[error("Error: Room is full")]
    Full(String),
}

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: Mutex<BTreeMap<String, SharedRoom>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, name: &str) -> Result<SharedRoom, RoomError> {
        let mut rooms = self.rooms.lock().await;
        if rooms.contains_key(name) {
            return Err(RoomError::NameTaken(name.to_string()));
        }
        let room = Arc::new(Mutex::new(Room::new(name)));
        rooms.insert(name.to_string(), Arc::clone(&room));
        tracing::info!("[registry] [create] room={} total={}", name, rooms.len());
        Ok(room)
    }

    pub async fn get(&self, name: &str) -> Option<SharedRoom> {
        self.rooms.lock().await.get(name).cloned()
    }

    /// Seats `peer` in the named room and returns the room and the colour.
    pub async fn join(&self, name: &str, peer: Peer) -> Result<(SharedRoom, Color), RoomError> {
        let room = self.get(name).await.ok_or_else(|| RoomError::NotFound(name.to_string()))?;
        let color = room.lock().await.join(peer)?;
        Ok((room, color))
    }

    pub async fn spectate(&self, name: &str, peer: Peer) -> Result<SharedRoom, RoomError> {
        let room = self.get(name).await.ok_or_else(|| RoomError::NotFound(name.to_string()))?;
        room.lock().await.spectate(peer)?;
        Ok(room)
    }

    /// Room names in lexical order; empty when no room exists.
    pub async fn list_rooms(&self) -> Vec<String> {
        self.rooms.lock().await.keys().cloned().collect()
    }

    /// Removes the room and detaches its members. Rooms are never removed
    /// implicitly, not even when they empty out.
    pub async fn delete(&self, name: &str) -> Result<(), RoomError> {
        let room = self
            .rooms
            .lock()
            .await
            .remove(name)
            .ok_or_else(|| RoomError::NotFound(name.to_string()))?;
        room.lock().await.close();
        tracing::info!("[registry] [delete] room={}", name);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::ServerMessage;
    use tokio::sync::mpsc;

    fn peer(id: u64) -> Peer {
        // nothing reads these; sends to a dropped receiver are ignored
        let (tx, _rx) = mpsc::unbounded_channel::<ServerMessage>();
        Peer::new(id, tx)
    }

    #[tokio::test]
    async fn test_create_twice_is_name_taken() {
        let registry = RoomRegistry::new();
        registry.create("r1").await.unwrap();
        assert_eq!(
            registry.create("r1").await.unwrap_err(),
            RoomError::NameTaken("r1".into())
        );
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_join_unknown_room() {
        let registry = RoomRegistry::new();
        assert_eq!(
            registry.join("nope", peer(1)).await.unwrap_err(),
            RoomError::NotFound("nope".into())
        );
    }

    #[tokio::test]
    async fn test_join_full_room() {
        let registry = RoomRegistry::new();
        registry.create("r1").await.unwrap();
        assert_eq!(registry.join("r1", peer(1)).await.unwrap().1, Color::White);
        assert_eq!(registry.join("r1", peer(2)).await.unwrap().1, Color::Black);
        assert_eq!(
            registry.join("r1", peer(3)).await.unwrap_err(),
            RoomError::Full("r1".into())
        );
    }

    #[tokio::test]
    async fn test_spectate_unknown_room() {
        let registry = RoomRegistry::new();
        assert_eq!(
            registry.spectate("ghost", peer(1)).await.unwrap_err(),
            RoomError::NotFound("ghost".into())
        );
    }

    #[tokio::test]
    async fn test_spectate_full_room_is_allowed() {
        let registry = RoomRegistry::new();
        registry.create("r1").await.unwrap();
        registry.join("r1", peer(1)).await.unwrap();
        registry.join("r1", peer(2)).await.unwrap();
        let room = registry.spectate("r1", peer(3)).await.unwrap();
        assert_eq!(room.lock().await.spectator_count(), 1);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let registry = RoomRegistry::new();
        assert!(registry.list_rooms().await.is_empty());

        registry.create("beta").await.unwrap();
        let alpha = registry.create("alpha").await.unwrap();
        assert_eq!(registry.list_rooms().await, ["alpha", "beta"]);

        registry.delete("alpha").await.unwrap();
        assert_eq!(registry.list_rooms().await, ["beta"]);
        assert!(alpha.lock().await.is_closed());
        assert_eq!(
            registry.delete("alpha").await.unwrap_err(),
            RoomError::NotFound("alpha".into())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_fill_exactly_two_seats() {
        let registry = Arc::new(RoomRegistry::new());
        registry.create("race").await.unwrap();

        let mut handles = Vec::new();
        for id in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move { registry.join("race", peer(id)).await }));
        }

        let mut seated = Vec::new();
        for handle in handles {
            if let Ok((_, color)) = handle.await.unwrap() {
                seated.push(color);
            }
        }
        seated.sort_by_key(|c| *c == Color::Black);
        assert_eq!(seated, [Color::White, Color::Black]);
    }
}
