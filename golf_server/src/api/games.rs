//! Game lifecycle endpoints.
//!
//! Games and their seats are created by the lobby; this server deals them
//! and reports who is connected.
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/games/abc123/start \
//!   -H "Authorization: Bearer SESSION"
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use golf::{
    db::{PlayerRecord, StoreError},
    game::{GameError, GameId, PlayerId},
    room::RoomError,
};
use serde::Serialize;

use super::{ApiError, AppState, api_error, request_id::RequestId};
use crate::metrics;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameResponse {
    pub game_id: GameId,
    pub started: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    #[serde(flatten)]
    pub record: PlayerRecord,
    pub connected: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterResponse {
    pub game_id: GameId,
    pub players: Vec<RosterEntry>,
}

/// Deal a game whose players have all accepted.
///
/// The caller must hold an active seat. Connected sockets receive the
/// opening state as soon as the deal is persisted.
///
/// # Errors
///
/// - `401 Unauthorized`: missing or invalid session
/// - `403 Forbidden`: caller is not an active player of the game
/// - `404 Not Found`: unknown game
/// - `409 Conflict`: already dealt, or the roster is not exactly two players
pub async fn start_game(
    State(state): State<AppState>,
    Extension(player_id): Extension<PlayerId>,
    request_id: RequestId,
    Path(game_id): Path<String>,
) -> Result<Json<StartGameResponse>, ApiError> {
    let game_id = GameId::new(game_id);
    require_active_player(&state, &game_id, &player_id).await?;

    state
        .registry
        .start_game(&game_id)
        .await
        .map_err(room_error_response)?;

    metrics::games_started_total();
    tracing::info!(
        request_id = %request_id,
        game_id = %game_id,
        player_id = %player_id,
        "Game started"
    );

    Ok(Json(StartGameResponse {
        game_id,
        started: true,
    }))
}

/// Seats of a game with their live connection status.
pub async fn get_players(
    State(state): State<AppState>,
    Extension(player_id): Extension<PlayerId>,
    Path(game_id): Path<String>,
) -> Result<Json<RosterResponse>, ApiError> {
    let game_id = GameId::new(game_id);
    let roster = require_active_player(&state, &game_id, &player_id).await?;

    let connected = match state.registry.get_room(&game_id).await {
        Some(room) => room.connected_players().await,
        None => Vec::new(),
    };

    let players = roster
        .into_iter()
        .map(|record| RosterEntry {
            connected: connected.contains(&record.player_id),
            record,
        })
        .collect();

    Ok(Json(RosterResponse { game_id, players }))
}

/// Loads the roster and checks that `player_id` holds an active seat.
pub(crate) async fn require_active_player(
    state: &AppState,
    game_id: &GameId,
    player_id: &PlayerId,
) -> Result<Vec<PlayerRecord>, ApiError> {
    let roster = state
        .registry
        .store()
        .get_players(game_id)
        .await
        .map_err(|err| room_error_response(RoomError::Store(err)))?;

    if roster.is_empty() {
        return Err(api_error(StatusCode::NOT_FOUND, "Game not found"));
    }

    let seated = roster
        .iter()
        .any(|p| &p.player_id == player_id && p.is_active);
    if !seated {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "Not a player in this game",
        ));
    }

    Ok(roster)
}

pub(crate) fn room_error_response(err: RoomError) -> ApiError {
    let status = match &err {
        RoomError::Rule(GameError::InvalidPlayerCount(_)) => StatusCode::CONFLICT,
        RoomError::Rule(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RoomError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        RoomError::Store(StoreError::AlreadyExists(_)) => StatusCode::CONFLICT,
        RoomError::Store(StoreError::VersionConflict { .. }) => StatusCode::CONFLICT,
        RoomError::Store(StoreError::Timeout(_)) => StatusCode::SERVICE_UNAVAILABLE,
        RoomError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        RoomError::MalformedAction(_) | RoomError::NotStarted => StatusCode::BAD_REQUEST,
        RoomError::RoomClosed => StatusCode::SERVICE_UNAVAILABLE,
    };

    if status.is_server_error() {
        tracing::error!(error = %err, "Game request failed");
    }

    api_error(status, err.client_message())
}
