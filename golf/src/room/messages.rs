//! Room inbox messages and the JSON frames exchanged with clients.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::errors::{RoomError, RoomResult};
use crate::game::{GameResult, GameView, PlayerAction, PlayerId};

/// Identifies one socket. A player may hold several.
pub type ConnectionId = Uuid;

/// Messages that can be sent to a RoomActor
#[derive(Debug)]
pub enum RoomMessage {
    /// Attach a connection. The room sends it the current state.
    Register {
        connection_id: ConnectionId,
        player_id: PlayerId,
        sender: mpsc::Sender<ServerMessage>,
        response: oneshot::Sender<()>,
    },

    /// Detach a connection
    Unregister { connection_id: ConnectionId },

    /// Player action received on `connection_id`
    Action {
        connection_id: ConnectionId,
        player_id: PlayerId,
        action: PlayerAction,
    },

    /// Deal the game once both players have accepted
    StartGame {
        response: oneshot::Sender<RoomResult<()>>,
    },
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub error: String,
    pub retryable: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEndPayload {
    #[serde(rename = "winnerPlayerID")]
    pub winner_player_id: Option<PlayerId>,
    pub is_draw: bool,
    pub scores: BTreeMap<PlayerId, i32>,
}

impl From<&GameResult> for GameEndPayload {
    fn from(result: &GameResult) -> Self {
        Self {
            winner_player_id: result.winner().cloned(),
            is_draw: result.is_draw(),
            scores: result.scores.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub user_id: PlayerId,
}

/// Frames sent to clients, as `{"type": .., "payload": ..}`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    State(Box<GameView>),
    Error(ErrorPayload),
    GameEnd(GameEndPayload),
    PlayerJoined(PresencePayload),
    PlayerLeft(PresencePayload),
}

impl ServerMessage {
    pub fn error(error: impl Into<String>, retryable: bool) -> Self {
        Self::Error(ErrorPayload {
            error: error.into(),
            retryable,
        })
    }

    pub fn game_end(result: &GameResult) -> Self {
        Self::GameEnd(result.into())
    }

    pub fn player_joined(user_id: PlayerId) -> Self {
        Self::PlayerJoined(PresencePayload { user_id })
    }

    pub fn player_left(user_id: PlayerId) -> Self {
        Self::PlayerLeft(PresencePayload { user_id })
    }
}

#[derive(Deserialize)]
struct ClientEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Option<ActionPayload>,
}

#[derive(Deserialize)]
struct ActionPayload {
    action: String,
    #[serde(default)]
    data: Option<ActionData>,
}

#[derive(Default, Deserialize)]
struct ActionData {
    index: Option<i64>,
}

/// Parses an inbound text frame into a [`PlayerAction`].
///
/// Only `{"type":"action","payload":{"action":..,"data":{"index":..}}}` is
/// accepted. Everything else is [`RoomError::MalformedAction`].
pub fn parse_client_message(text: &str) -> RoomResult<PlayerAction> {
    let envelope: ClientEnvelope = serde_json::from_str(text)
        .map_err(|e| RoomError::MalformedAction(format!("invalid JSON: {e}")))?;

    if envelope.kind != "action" {
        return Err(RoomError::MalformedAction(format!(
            "unknown message type '{}'",
            envelope.kind
        )));
    }
    let payload = envelope
        .payload
        .ok_or_else(|| RoomError::MalformedAction("missing payload".to_string()))?;
    let data = payload.data.unwrap_or_default();

    let index = || -> RoomResult<usize> {
        let raw = data
            .index
            .ok_or_else(|| RoomError::MalformedAction("missing index".to_string()))?;
        usize::try_from(raw)
            .map_err(|_| RoomError::MalformedAction(format!("invalid index {raw}")))
    };

    match payload.action.as_str() {
        "initial_flip" => Ok(PlayerAction::InitialFlip { index: index()? }),
        "draw_deck" => Ok(PlayerAction::DrawDeck),
        "draw_discard" => Ok(PlayerAction::DrawDiscard),
        "swap_card" => Ok(PlayerAction::SwapCard { index: index()? }),
        "discard_flip" => Ok(PlayerAction::DiscardFlip { index: index()? }),
        other => Err(RoomError::MalformedAction(format!(
            "unknown action '{other}'"
        ))),
    }
}
