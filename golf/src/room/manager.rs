//! Room registry: creates, locates and tears down room actors.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};
use tokio::sync::{RwLock, mpsc};

use super::{
    actor::{RoomActor, RoomHandle},
    config::RoomConfig,
    errors::{RoomError, RoomResult},
    messages::{ConnectionId, ServerMessage},
};
use crate::{
    db::StateStore,
    game::{GameId, PlayerId},
};

/// Owns one [`RoomHandle`] per active game. Constructed explicitly and
/// shared with the HTTP layer.
pub struct RoomRegistry {
    store: Arc<dyn StateStore>,
    config: RoomConfig,
    rooms: Arc<RwLock<Rooms>>,
}

type Rooms = HashMap<GameId, RoomHandle>;

impl RoomRegistry {
    pub fn new(store: Arc<dyn StateStore>, config: RoomConfig) -> Self {
        Self {
            store,
            config,
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Live room for `game_id`, spawning one if there is none or the old
    /// loop has exited.
    pub async fn get_or_create_room(&self, game_id: &GameId) -> RoomHandle {
        {
            let rooms = self.rooms.read().await;
            if let Some(handle) = rooms.get(game_id).filter(|h| !h.is_closed()) {
                return handle.clone();
            }
        }

        let mut rooms = self.rooms.write().await;
        // Another task may have won the race for the write lock
        if let Some(handle) = rooms.get(game_id).filter(|h| !h.is_closed()) {
            return handle.clone();
        }

        let (actor, handle) =
            RoomActor::new(game_id.clone(), Arc::clone(&self.store), &self.config);
        rooms.insert(game_id.clone(), handle.clone());
        drop(rooms);

        let rooms = Arc::downgrade(&self.rooms);
        let (id, spawned) = (game_id.clone(), handle.clone());
        tokio::spawn(async move {
            actor.run().await;
            forget_room(&rooms, &id, &spawned).await;
        });
        log::info!("Spawned room for game {}", game_id);

        handle
    }

    pub async fn get_room(&self, game_id: &GameId) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(game_id).filter(|h| !h.is_closed()).cloned()
    }

    /// Registers a connection, retrying once if the room retired between
    /// lookup and registration.
    pub async fn join_room(
        &self,
        game_id: &GameId,
        player_id: PlayerId,
        sender: mpsc::Sender<ServerMessage>,
    ) -> RoomResult<(RoomHandle, ConnectionId)> {
        let handle = self.get_or_create_room(game_id).await;
        match handle.register(player_id.clone(), sender.clone()).await {
            Ok(connection_id) => Ok((handle, connection_id)),
            Err(RoomError::RoomClosed) => {
                let handle = self.get_or_create_room(game_id).await;
                let connection_id = handle.register(player_id, sender).await?;
                Ok((handle, connection_id))
            }
            Err(err) => Err(err),
        }
    }

    /// Routes the "game ready" event to the room, creating it if needed.
    /// A room nobody has joined retires right after dealing.
    pub async fn start_game(&self, game_id: &GameId) -> RoomResult<()> {
        match self.get_or_create_room(game_id).await.start_game().await {
            Err(RoomError::RoomClosed) => {
                self.get_or_create_room(game_id).await.start_game().await
            }
            result => result,
        }
    }

    /// Cancels the room's loop and forgets it. Member sockets close once
    /// their outbound queues are dropped. Returns false if there was no
    /// such room.
    pub async fn close_room(&self, game_id: &GameId) -> bool {
        let removed = self.rooms.write().await.remove(game_id);
        match removed {
            Some(handle) => {
                handle.close();
                log::info!("Closed room for game {}", game_id);
                true
            }
            None => false,
        }
    }

    /// Number of rooms whose loop is still running.
    pub async fn active_room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.values().filter(|h| !h.is_closed()).count()
    }

    /// Closes every room.
    pub async fn shutdown(&self) {
        let rooms: Vec<RoomHandle> = self.rooms.write().await.drain().map(|(_, h)| h).collect();
        log::info!("Shutting down {} room(s)", rooms.len());
        for handle in rooms {
            handle.close();
        }
    }
}

/// Drops the registry entry of a room whose loop has exited, unless a newer
/// room already took its place.
async fn forget_room(rooms: &Weak<RwLock<Rooms>>, game_id: &GameId, handle: &RoomHandle) {
    let Some(rooms) = rooms.upgrade() else { return };
    let mut rooms = rooms.write().await;
    if rooms.get(game_id).is_some_and(|current| current.same_room(handle)) {
        rooms.remove(game_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStateStore, PlayerRecord};
    use std::time::Duration;

    fn seat(id: &str, seat: i32) -> PlayerRecord {
        PlayerRecord {
            player_id: PlayerId::new(id),
            display_name: id.to_string(),
            seat,
            is_active: true,
        }
    }

    fn registry_with_games(count: usize) -> RoomRegistry {
        let mut store = InMemoryStateStore::new();
        for n in 0..count {
            store = store.with_game(
                GameId::new(format!("g{n}")),
                vec![seat("alice", 0), seat("bob", 1)],
            );
        }
        RoomRegistry::new(Arc::new(store), RoomConfig::default())
    }

    async fn wait_for_empty(registry: &RoomRegistry) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !registry.rooms.read().await.is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("rooms were not forgotten");
    }

    #[tokio::test]
    async fn test_retired_rooms_leave_the_map() {
        let registry = registry_with_games(20);

        for n in 0..20 {
            let (tx, _rx) = mpsc::channel(16);
            let game_id = GameId::new(format!("g{n}"));
            let (room, connection_id) = registry
                .join_room(&game_id, PlayerId::new("alice"), tx)
                .await
                .unwrap();
            room.unregister(connection_id).await.unwrap();
        }

        wait_for_empty(&registry).await;
        assert_eq!(registry.active_room_count().await, 0);
    }

    #[tokio::test]
    async fn test_room_started_without_players_retires() {
        let registry = registry_with_games(1);
        let game_id = GameId::new("g0");

        registry.start_game(&game_id).await.unwrap();
        wait_for_empty(&registry).await;

        // The deal is persisted and a later join is served from the store
        let (tx, mut rx) = mpsc::channel(16);
        registry
            .join_room(&game_id, PlayerId::new("bob"), tx)
            .await
            .unwrap();
        assert!(matches!(rx.recv().await, Some(ServerMessage::State(_))));
    }

    #[tokio::test]
    async fn test_stale_room_does_not_evict_its_replacement() {
        let registry = registry_with_games(1);
        let game_id = GameId::new("g0");

        let (tx, _rx) = mpsc::channel(16);
        let (old, _) = registry
            .join_room(&game_id, PlayerId::new("alice"), tx)
            .await
            .unwrap();
        let (_, replacement) = RoomActor::new(
            game_id.clone(),
            Arc::clone(registry.store()),
            registry.config(),
        );
        registry
            .rooms
            .write()
            .await
            .insert(game_id.clone(), replacement.clone());

        forget_room(&Arc::downgrade(&registry.rooms), &game_id, &old).await;
        let rooms = registry.rooms.read().await;
        assert!(rooms.get(&game_id).is_some_and(|h| h.same_room(&replacement)));
    }
}
