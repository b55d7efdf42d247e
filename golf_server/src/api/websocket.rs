//! WebSocket handler for live games.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /api/ws/game/{game_id}?token=<session>`
//! 2. Server validates the session and that its owner holds an active seat
//! 3. The socket joins the game's room and receives the current state
//! 4. Server spawns two tasks:
//!    - Writer: drains the room's outbound queue and pings on a timer
//!    - Reader: parses action frames and submits them to the room
//! 5. When either task ends, the other is stopped and the socket leaves the room
//!
//! # Client Messages
//!
//! ```json
//! {"type": "action", "payload": {"action": "swap_card", "data": {"index": 4}}}
//! ```
//!
//! Malformed frames get an `error` reply and are otherwise ignored.
//!
//! # Server Messages
//!
//! `state`, `error`, `game_end`, `player_joined` and `player_left`, each as
//! `{"type": .., "payload": ..}`.

use axum::{
    Error as AxumError,
    body::Bytes,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use golf::{
    game::{GameId, PlayerId},
    room::{ConnectionId, RoomConfig, RoomError, RoomHandle, ServerMessage, parse_client_message},
};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::{sync::mpsc, time};
use tracing::{Instrument, Span};

use super::{
    AppState,
    games::require_active_player,
    middleware::authenticate,
    request_id::{RequestId, session_span},
};
use crate::{logging, metrics};

/// Replies generated by the socket itself rather than the room
const LOCAL_QUEUE_CAPACITY: usize = 8;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// Upgrade HTTP connection to a game socket.
///
/// # Response
///
/// - `101 Switching Protocols` on success
/// - `401 Unauthorized`: missing, unknown or expired session
/// - `403 Forbidden`: not an active player of this game
/// - `404 Not Found`: unknown game
pub async fn websocket_handler(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Path(game_id): Path<String>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
    request_id: RequestId,
) -> Response {
    let game_id = GameId::new(game_id);

    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        logging::log_rejected_connection(game_id.as_str(), "missing token", None);
        return (StatusCode::UNAUTHORIZED, "Missing session token").into_response();
    };

    let player_id = match authenticate(state.sessions.as_ref(), &token).await {
        Ok(player_id) => player_id,
        Err(status) => {
            logging::log_rejected_connection(game_id.as_str(), "invalid session", None);
            return (status, "Invalid session").into_response();
        }
    };

    if let Err(rejection) = require_active_player(&state, &game_id, &player_id).await {
        logging::log_rejected_connection(
            game_id.as_str(),
            &rejection.1.error,
            Some(player_id.as_str()),
        );
        return rejection.into_response();
    }

    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let span = session_span(&request_id, &game_id, &player_id);
    let max_message_bytes = state.registry.config().max_message_bytes;
    ws.max_message_size(max_message_bytes).on_upgrade(move |socket| {
        handle_socket(socket, game_id, player_id, state).instrument(span)
    })
}

/// Drives one authenticated socket until it closes.
async fn handle_socket(socket: WebSocket, game_id: GameId, player_id: PlayerId, state: AppState) {
    let config = state.registry.config().clone();
    let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity);
    let (local_tx, local_rx) = mpsc::channel(LOCAL_QUEUE_CAPACITY);

    let (room, connection_id) = match state
        .registry
        .join_room(&game_id, player_id.clone(), outbound_tx)
        .await
    {
        Ok(joined) => joined,
        Err(err) => {
            tracing::error!(error = %err, "Failed to join room");
            return;
        }
    };

    Span::current().record("connection_id", tracing::field::display(connection_id));
    metrics::websocket_connection_opened();
    metrics::active_rooms(state.registry.active_room_count().await);
    tracing::info!("WebSocket connected");

    let started = Instant::now();
    let (sink, stream) = socket.split();

    let mut send_task = tokio::spawn(
        write_loop(sink, outbound_rx, local_rx, config.clone()).in_current_span(),
    );
    let reader = Reader {
        room: room.clone(),
        connection_id,
        player_id: player_id.clone(),
        local_tx,
        config,
    };
    let mut recv_task = tokio::spawn(reader.run(stream).in_current_span());

    // Whichever side finishes first takes the other down
    let frames_received = tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            0
        }
        received = &mut recv_task => {
            send_task.abort();
            received.unwrap_or_default()
        }
    };

    if let Err(err) = room.unregister(connection_id).await {
        // The room already retired or was shut down
        tracing::debug!(error = %err, "Unregister skipped");
    }

    metrics::websocket_connection_closed();
    logging::log_session_closed(
        game_id.as_str(),
        player_id.as_str(),
        frames_received,
        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    );
}

/// Writes room frames and local replies, pinging on `ping_interval`. Ends
/// when the room drops the connection or a write fails or stalls.
async fn write_loop<S>(
    mut sink: S,
    mut outbound: mpsc::Receiver<ServerMessage>,
    mut local: mpsc::Receiver<ServerMessage>,
    config: RoomConfig,
) where
    S: Sink<Message, Error = AxumError> + Unpin,
{
    let mut ping = time::interval_at(
        time::Instant::now() + config.ping_interval,
        config.ping_interval,
    );

    loop {
        let message = tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                // Dropped by the room: slow consumer or room closed
                None => break,
            },
            Some(frame) = local.recv() => frame,
            _ = ping.tick() => {
                if !send_with_deadline(&mut sink, Message::Ping(Bytes::new()), config.write_wait).await {
                    break;
                }
                continue;
            }
        };

        let kind = frame_kind(&message);
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize frame");
                continue;
            }
        };

        if !send_with_deadline(&mut sink, Message::Text(json.into()), config.write_wait).await {
            break;
        }
        metrics::websocket_messages_sent(kind);
    }

    let _ = time::timeout(config.write_wait, sink.send(Message::Close(None))).await;
}

/// False if the write failed or did not finish within `write_wait`.
async fn send_with_deadline<S>(sink: &mut S, message: Message, write_wait: Duration) -> bool
where
    S: Sink<Message, Error = AxumError> + Unpin,
{
    match time::timeout(write_wait, sink.send(message)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "WebSocket write failed");
            false
        }
        Err(_) => {
            tracing::warn!("WebSocket write timed out");
            false
        }
    }
}

struct Reader {
    room: RoomHandle,
    connection_id: ConnectionId,
    player_id: PlayerId,
    local_tx: mpsc::Sender<ServerMessage>,
    config: RoomConfig,
}

impl Reader {
    /// Reads until close, error or a silent peer. Every inbound frame,
    /// pongs included, resets the `pong_wait` deadline. Returns the number
    /// of text frames received.
    async fn run<S>(self, mut stream: S) -> u64
    where
        S: Stream<Item = Result<Message, AxumError>> + Unpin,
    {
        let mut received = 0;

        loop {
            let Some(frame) = next_frame(&mut stream, self.config.pong_wait).await else {
                break;
            };

            match frame {
                Message::Text(text) => {
                    received += 1;
                    metrics::websocket_messages_received();
                    if !self.handle_text(text.as_str()).await {
                        break;
                    }
                }
                Message::Binary(_) => {
                    metrics::websocket_malformed_message();
                    self.reply(RoomError::MalformedAction(
                        "binary frames are not supported".to_string(),
                    ));
                }
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }

        received
    }

    /// Returns false once the room is gone.
    async fn handle_text(&self, text: &str) -> bool {
        match parse_client_message(text) {
            Ok(action) => self
                .room
                .submit_action(self.connection_id, self.player_id.clone(), action)
                .await
                .is_ok(),
            Err(err) => {
                metrics::websocket_malformed_message();
                tracing::debug!(error = %err, "Malformed frame");
                self.reply(err);
                true
            }
        }
    }

    fn reply(&self, err: RoomError) {
        // A full local queue means the peer is not reading; drop the reply
        let _ = self.local_tx.try_send(err.to_server_message());
    }
}

/// Next inbound frame, or `None` once the peer closed, errored or stayed
/// silent for `pong_wait`.
async fn next_frame<S>(stream: &mut S, pong_wait: Duration) -> Option<Message>
where
    S: Stream<Item = Result<Message, AxumError>> + Unpin,
{
    match time::timeout(pong_wait, stream.next()).await {
        Err(_) => {
            tracing::info!("Peer went silent");
            None
        }
        Ok(None) => None,
        Ok(Some(Err(e))) => {
            tracing::debug!(error = %e, "WebSocket read failed");
            None
        }
        Ok(Some(Ok(frame))) => Some(frame),
    }
}

fn frame_kind(message: &ServerMessage) -> &'static str {
    match message {
        ServerMessage::State(_) => "state",
        ServerMessage::Error(_) => "error",
        ServerMessage::GameEnd(_) => "game_end",
        ServerMessage::PlayerJoined(_) => "player_joined",
        ServerMessage::PlayerLeft(_) => "player_left",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{sink, stream};

    const SHORT_WAIT: Duration = Duration::from_millis(50);

    #[test]
    fn test_frame_kind_matches_wire_type() {
        let frame = ServerMessage::player_joined(PlayerId::new("alice"));
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], frame_kind(&frame));

        let frame = ServerMessage::error("nope", false);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], frame_kind(&frame));
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let mut peer = stream::iter([Ok::<_, AxumError>(Message::Pong(Bytes::new()))])
            .chain(stream::pending());

        // A pong counts as traffic and resets the deadline
        assert!(matches!(
            next_frame(&mut peer, SHORT_WAIT).await,
            Some(Message::Pong(_))
        ));

        let started = Instant::now();
        assert!(next_frame(&mut peer, SHORT_WAIT).await.is_none());
        assert!(started.elapsed() >= SHORT_WAIT);
    }

    #[tokio::test]
    async fn test_read_error_ends_the_session() {
        let mut peer = stream::iter([Err::<Message, _>(AxumError::new("connection reset"))]);
        assert!(next_frame(&mut peer, SHORT_WAIT).await.is_none());
    }

    #[tokio::test]
    async fn test_stalled_write_times_out() {
        let mut stalled = Box::pin(sink::unfold((), |(), _: Message| {
            std::future::pending::<Result<(), AxumError>>()
        }));
        assert!(!send_with_deadline(&mut stalled, Message::Ping(Bytes::new()), SHORT_WAIT).await);
    }

    #[tokio::test]
    async fn test_write_outcome() {
        let mut healthy = sink::drain::<Message>().sink_map_err(|never| -> AxumError { match never {} });
        assert!(send_with_deadline(&mut healthy, Message::Ping(Bytes::new()), SHORT_WAIT).await);

        let mut broken = Box::pin(sink::unfold((), |(), _: Message| async {
            Err::<(), _>(AxumError::new("broken pipe"))
        }));
        assert!(!send_with_deadline(&mut broken, Message::Ping(Bytes::new()), SHORT_WAIT).await);
    }
}
