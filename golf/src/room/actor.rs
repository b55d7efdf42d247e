//! Room actor: the single event loop that owns every mutation of one game.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{
    config::RoomConfig,
    errors::{RoomError, RoomResult},
    messages::{ConnectionId, RoomMessage, ServerMessage},
};
use crate::{
    db::{PlayerRecord, StateStore, StoreError, StoredState, decode_state, encode_state},
    game::{GameId, GameResult, GameState, GameView, PlayerAction, PlayerId},
};

/// One attached socket.
#[derive(Debug, Clone)]
pub struct Connection {
    pub player_id: PlayerId,
    pub sender: mpsc::Sender<ServerMessage>,
}

type Connections = Arc<RwLock<HashMap<ConnectionId, Connection>>>;

/// Cloneable handle used by sockets and the registry to talk to a room.
#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    connections: Connections,
    cancel: CancellationToken,
}

impl RoomHandle {
    /// True once the event loop has exited or been cancelled.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.sender.is_closed()
    }

    /// True if both handles drive the same event loop.
    pub fn same_room(&self, other: &RoomHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    pub async fn send(&self, message: RoomMessage) -> RoomResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| RoomError::RoomClosed)
    }

    /// Attaches an outbound queue for `player_id`. Resolves once the room
    /// has queued the current state for it.
    pub async fn register(
        &self,
        player_id: PlayerId,
        sender: mpsc::Sender<ServerMessage>,
    ) -> RoomResult<ConnectionId> {
        let connection_id = Uuid::new_v4();
        let (response, ack) = oneshot::channel();
        self.send(RoomMessage::Register {
            connection_id,
            player_id,
            sender,
            response,
        })
        .await?;
        ack.await.map_err(|_| RoomError::RoomClosed)?;
        Ok(connection_id)
    }

    pub async fn unregister(&self, connection_id: ConnectionId) -> RoomResult<()> {
        self.send(RoomMessage::Unregister { connection_id }).await
    }

    pub async fn submit_action(
        &self,
        connection_id: ConnectionId,
        player_id: PlayerId,
        action: PlayerAction,
    ) -> RoomResult<()> {
        self.send(RoomMessage::Action {
            connection_id,
            player_id,
            action,
        })
        .await
    }

    pub async fn start_game(&self) -> RoomResult<()> {
        let (response, result) = oneshot::channel();
        self.send(RoomMessage::StartGame { response }).await?;
        result.await.map_err(|_| RoomError::RoomClosed)?
    }

    /// Stops the loop immediately; member sockets are closed by dropping
    /// their outbound queues.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Players with at least one live connection, deduplicated.
    pub async fn connected_players(&self) -> Vec<PlayerId> {
        let connections = self.connections.read().await;
        let mut players: Vec<PlayerId> = connections
            .values()
            .map(|c| c.player_id.clone())
            .collect();
        players.sort();
        players.dedup();
        players
    }
}

/// Serializes all actions for one game. State lives in the store; the actor
/// holds only the connection set and a cache of display names.
pub struct RoomActor {
    game_id: GameId,
    store: Arc<dyn StateStore>,
    inbox: mpsc::Receiver<RoomMessage>,
    connections: Connections,
    cancel: CancellationToken,
    display_names: HashMap<PlayerId, String>,
}

impl RoomActor {
    pub fn new(
        game_id: GameId,
        store: Arc<dyn StateStore>,
        config: &RoomConfig,
    ) -> (Self, RoomHandle) {
        let (sender, inbox) = mpsc::channel(config.inbox_capacity);
        let connections: Connections = Arc::new(RwLock::new(HashMap::new()));
        let cancel = CancellationToken::new();

        let actor = Self {
            game_id,
            store,
            inbox,
            connections: Arc::clone(&connections),
            cancel: cancel.clone(),
            display_names: HashMap::new(),
        };
        let handle = RoomHandle {
            sender,
            connections,
            cancel,
        };

        (actor, handle)
    }

    /// Run the room event loop
    pub async fn run(mut self) {
        log::info!("Room {} starting", self.game_id);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                message = self.inbox.recv() => {
                    let Some(message) = message else { break };
                    self.handle_message(message).await;
                    // Nobody attached and nothing queued: retire. The
                    // registry replaces closed handles on the next join.
                    if self.is_idle().await {
                        log::debug!("Room {}: idle, retiring", self.game_id);
                        break;
                    }
                }
            }
        }

        self.cancel.cancel();
        self.inbox.close();
        self.connections.write().await.clear();
        log::info!("Room {} closed", self.game_id);
    }

    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Register {
                connection_id,
                player_id,
                sender,
                response,
            } => {
                self.handle_register(connection_id, player_id, sender).await;
                let _ = response.send(());
            }

            RoomMessage::Unregister { connection_id } => {
                self.handle_unregister(connection_id).await;
            }

            RoomMessage::Action {
                connection_id,
                player_id,
                action,
            } => {
                if let Err(err) = self.handle_action(&player_id, action).await {
                    log::debug!(
                        "Room {}: rejected {} from {}: {}",
                        self.game_id,
                        action,
                        player_id,
                        err
                    );
                    self.send_to(connection_id, err.to_server_message()).await;
                }
            }

            RoomMessage::StartGame { response } => {
                let result = self.handle_start().await;
                if let Err(err) = &result {
                    log::warn!("Room {}: start failed: {}", self.game_id, err);
                }
                let _ = response.send(result);
            }
        }
    }

    async fn is_idle(&self) -> bool {
        self.connections.read().await.is_empty() && self.inbox.is_empty()
    }

    async fn handle_register(
        &mut self,
        connection_id: ConnectionId,
        player_id: PlayerId,
        sender: mpsc::Sender<ServerMessage>,
    ) {
        if self.display_names.is_empty() {
            self.refresh_display_names().await;
        }

        self.connections.write().await.insert(
            connection_id,
            Connection {
                player_id: player_id.clone(),
                sender,
            },
        );
        log::info!(
            "Room {}: {} connected ({})",
            self.game_id,
            player_id,
            connection_id
        );

        match self.load().await {
            Ok((stored, state)) => {
                let state = self.finish_pending(state, stored.version).await;
                let view = GameView::for_viewer(&state, &player_id, &self.display_names);
                self.send_to(connection_id, ServerMessage::State(Box::new(view)))
                    .await;
            }
            Err(RoomError::NotStarted) => {}
            Err(err) => {
                log::warn!("Room {}: could not load state: {}", self.game_id, err);
                self.send_to(connection_id, err.to_server_message()).await;
            }
        }

        self.broadcast(&ServerMessage::player_joined(player_id)).await;
    }

    async fn handle_unregister(&mut self, connection_id: ConnectionId) {
        let removed = self.connections.write().await.remove(&connection_id);
        if let Some(connection) = removed {
            log::info!(
                "Room {}: {} disconnected ({})",
                self.game_id,
                connection.player_id,
                connection_id
            );
            self.broadcast(&ServerMessage::player_left(connection.player_id))
                .await;
        }
    }

    /// Load, apply, compare-and-swap, broadcast.
    async fn handle_action(&self, player_id: &PlayerId, action: PlayerAction) -> RoomResult<()> {
        let (stored, state) = self.load().await?;
        // Rejected below as out of phase, but scored and announced first
        let mut state = self.finish_pending(state, stored.version).await;
        state.apply(player_id, action)?;

        let blob = encode_state(&state)?;
        let version = self
            .store
            .compare_and_swap_state(&self.game_id, &blob, stored.version)
            .await
            .inspect_err(|err| {
                if let StoreError::VersionConflict { expected, actual } = err {
                    log::warn!(
                        "Room {}: version conflict (expected {}, found {})",
                        self.game_id,
                        expected,
                        actual
                    );
                }
            })?;

        let state = self.finish_pending(state, version).await;
        if state.result.is_none() {
            // Still in play, or scoring failed. The move is persisted either
            // way; scoring is retried by the next join or action.
            self.broadcast_state(&state).await;
        }
        Ok(())
    }

    /// Scores and announces a game that ended without a recorded result:
    /// its last move, or a crash before finalizing. Returns the state as
    /// persisted.
    async fn finish_pending(&self, state: GameState, version: i64) -> GameState {
        if !(state.is_finished() && state.result.is_none()) {
            return state;
        }

        match self.finalize(&state, version).await {
            Ok((finished, result)) => {
                self.broadcast_state(&finished).await;
                self.broadcast(&ServerMessage::game_end(&result)).await;
                finished
            }
            Err(err) => {
                log::error!("Room {}: could not finalize game: {}", self.game_id, err);
                state
            }
        }
    }

    async fn handle_start(&mut self) -> RoomResult<()> {
        let roster = self.store.get_players(&self.game_id).await?;
        self.remember_names(&roster);

        let players = roster
            .into_iter()
            .filter(|p| p.is_active)
            .map(|p| p.player_id)
            .collect();
        let state = GameState::initialize(self.game_id.clone(), players)?;

        self.store
            .save_state(&self.game_id, &encode_state(&state)?)
            .await?;
        log::info!("Room {}: game dealt", self.game_id);

        self.broadcast_state(&state).await;
        Ok(())
    }

    /// Scores the finished game on a copy and persists it with a second
    /// compare-and-swap. Recording the result is best effort.
    async fn finalize(
        &self,
        state: &GameState,
        version: i64,
    ) -> RoomResult<(GameState, GameResult)> {
        let mut finished = state.clone();
        let result = finished.finish_game()?;

        self.store
            .compare_and_swap_state(&self.game_id, &encode_state(&finished)?, version)
            .await?;

        if let Err(err) = self.store.record_result(&self.game_id, &result).await {
            log::error!("Room {}: failed to record result: {}", self.game_id, err);
        }
        log::info!(
            "Room {}: game finished, winner {:?}",
            self.game_id,
            result.winner().map(PlayerId::as_str)
        );

        Ok((finished, result))
    }

    async fn load(&self) -> RoomResult<(StoredState, GameState)> {
        let stored = match self.store.load_state(&self.game_id).await {
            Ok(stored) => stored,
            Err(StoreError::NotFound(_)) => return Err(RoomError::NotStarted),
            Err(err) => return Err(err.into()),
        };
        let state = decode_state(&stored.blob)?;
        Ok((stored, state))
    }

    async fn refresh_display_names(&mut self) {
        match self.store.get_players(&self.game_id).await {
            Ok(roster) => self.remember_names(&roster),
            Err(err) => log::debug!("Room {}: no roster: {}", self.game_id, err),
        }
    }

    fn remember_names(&mut self, roster: &[PlayerRecord]) {
        self.display_names = roster
            .iter()
            .map(|p| (p.player_id.clone(), p.display_name.clone()))
            .collect();
    }

    /// Every connection gets its own projection.
    async fn broadcast_state(&self, state: &GameState) {
        let mut dead = Vec::new();
        {
            let connections = self.connections.read().await;
            for (id, connection) in connections.iter() {
                let view = GameView::for_viewer(state, &connection.player_id, &self.display_names);
                if connection
                    .sender
                    .try_send(ServerMessage::State(Box::new(view)))
                    .is_err()
                {
                    dead.push(*id);
                }
            }
        }
        self.drop_connections(dead).await;
    }

    async fn broadcast(&self, message: &ServerMessage) {
        let mut dead = Vec::new();
        {
            let connections = self.connections.read().await;
            for (id, connection) in connections.iter() {
                if connection.sender.try_send(message.clone()).is_err() {
                    dead.push(*id);
                }
            }
        }
        self.drop_connections(dead).await;
    }

    async fn send_to(&self, connection_id: ConnectionId, message: ServerMessage) {
        let failed = {
            let connections = self.connections.read().await;
            connections
                .get(&connection_id)
                .is_some_and(|c| c.sender.try_send(message).is_err())
        };
        if failed {
            self.drop_connections(vec![connection_id]).await;
        }
    }

    /// Removes connections whose queue is full or closed. Dropping the
    /// sender ends the socket's writer task; the client reconnects and gets
    /// fresh state.
    async fn drop_connections(&self, dead: Vec<ConnectionId>) {
        if dead.is_empty() {
            return;
        }

        let mut connections = self.connections.write().await;
        let mut left = Vec::new();
        for id in dead {
            if let Some(connection) = connections.remove(&id) {
                log::warn!(
                    "Room {}: dropping slow or closed connection {} ({})",
                    self.game_id,
                    id,
                    connection.player_id
                );
                left.push(connection.player_id);
            }
        }
        for player_id in left {
            let message = ServerMessage::player_left(player_id);
            for connection in connections.values() {
                let _ = connection.sender.try_send(message.clone());
            }
        }
    }
}
