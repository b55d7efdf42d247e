//! Persistence contracts consumed by the game rooms and the HTTP layer, plus
//! their PostgreSQL implementations.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{PgPool, Row};

use super::errors::{StoreError, StoreResult};
use super::timeouts::{DEFAULT_TRANSACTION_TIMEOUT, with_default_timeout, with_timeout};
use crate::game::{GameId, GameResult, PlayerId};

/// A persisted state blob together with its row version.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoredState {
    pub blob: String,
    pub version: i64,
}

/// A seat in a game, as recorded by the lobby.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub player_id: PlayerId,
    pub display_name: String,
    pub seat: i32,
    pub is_active: bool,
}

/// Versioned game-state storage with compare-and-swap writes.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Latest blob and version.
    async fn load_state(&self, game_id: &GameId) -> StoreResult<StoredState>;

    /// First write for a game; the stored version becomes 1.
    async fn save_state(&self, game_id: &GameId, blob: &str) -> StoreResult<()>;

    /// Writes only if the stored version still equals `expected_version`.
    /// Returns the new version (`expected_version + 1`).
    async fn compare_and_swap_state(
        &self,
        game_id: &GameId,
        blob: &str,
        expected_version: i64,
    ) -> StoreResult<i64>;

    /// Seats of a game ordered by seat index.
    async fn get_players(&self, game_id: &GameId) -> StoreResult<Vec<PlayerRecord>>;

    /// Writes scores, winner and the finished status.
    async fn record_result(&self, game_id: &GameId, result: &GameResult) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()>;
}

/// Lookup of session tokens issued elsewhere.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Owner of an unexpired session, if any.
    async fn validate_session(&self, token: &str) -> StoreResult<Option<PlayerId>>;
}

/// PostgreSQL [`StateStore`].
///
/// Works against the lobby's `games`, `game_players` and `users` tables,
/// plus `game_states (game_id TEXT PRIMARY KEY, state_json TEXT NOT NULL,
/// version BIGINT NOT NULL, updated_at TIMESTAMPTZ NOT NULL)` keyed by the
/// game's public id.
#[derive(Clone)]
pub struct PgStateStore {
    pool: PgPool,
}

impl PgStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn load_state(&self, game_id: &GameId) -> StoreResult<StoredState> {
        let row = with_default_timeout(
            sqlx::query("SELECT state_json, version FROM game_states WHERE game_id = $1")
                .bind(game_id.as_str())
                .fetch_optional(&self.pool),
        )
        .await?;

        let row = row.ok_or_else(|| StoreError::NotFound(game_id.to_string()))?;
        Ok(StoredState {
            blob: row.try_get("state_json")?,
            version: row.try_get("version")?,
        })
    }

    async fn save_state(&self, game_id: &GameId, blob: &str) -> StoreResult<()> {
        let result = with_default_timeout(
            sqlx::query(
                "INSERT INTO game_states (game_id, state_json, version, updated_at)
                 VALUES ($1, $2, 1, NOW())
                 ON CONFLICT (game_id) DO NOTHING",
            )
            .bind(game_id.as_str())
            .bind(blob)
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(game_id.to_string()));
        }
        Ok(())
    }

    async fn compare_and_swap_state(
        &self,
        game_id: &GameId,
        blob: &str,
        expected_version: i64,
    ) -> StoreResult<i64> {
        let row = with_default_timeout(
            sqlx::query(
                "UPDATE game_states
                 SET state_json = $2, version = version + 1, updated_at = NOW()
                 WHERE game_id = $1 AND version = $3
                 RETURNING version",
            )
            .bind(game_id.as_str())
            .bind(blob)
            .bind(expected_version)
            .fetch_optional(&self.pool),
        )
        .await?;

        if let Some(row) = row {
            return Ok(row.try_get("version")?);
        }

        // Nothing updated: either the game is gone or someone else won the race
        let current = with_default_timeout(
            sqlx::query("SELECT version FROM game_states WHERE game_id = $1")
                .bind(game_id.as_str())
                .fetch_optional(&self.pool),
        )
        .await?;

        match current {
            Some(row) => Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: row.try_get("version")?,
            }),
            None => Err(StoreError::NotFound(game_id.to_string())),
        }
    }

    async fn get_players(&self, game_id: &GameId) -> StoreResult<Vec<PlayerRecord>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT gp.user_id::text AS user_id, u.username, gp.order_index, gp.is_active
                 FROM game_players gp
                 JOIN games g ON gp.game_id = g.game_id
                 JOIN users u ON gp.user_id = u.user_id
                 WHERE g.public_id::text = $1
                 ORDER BY gp.order_index",
            )
            .bind(game_id.as_str())
            .fetch_all(&self.pool),
        )
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(PlayerRecord {
                    player_id: PlayerId::new(row.try_get::<String, _>("user_id")?),
                    display_name: row.try_get("username")?,
                    seat: row.try_get("order_index")?,
                    is_active: row.try_get("is_active")?,
                })
            })
            .collect()
    }

    async fn record_result(&self, game_id: &GameId, result: &GameResult) -> StoreResult<()> {
        let pool = self.pool.clone();
        let public_id = game_id.as_str().to_string();
        let scores: Vec<(String, i32)> = result
            .scores
            .iter()
            .map(|(player, score)| (player.as_str().to_string(), *score))
            .collect();
        let winner = result.winner().map(|p| p.as_str().to_string());
        let finished_at = result.finished_at;

        let updated = with_timeout(DEFAULT_TRANSACTION_TIMEOUT, async move {
            let mut tx = pool.begin().await?;

            for (user_id, score) in &scores {
                sqlx::query(
                    "UPDATE game_players SET score = $3
                     WHERE game_id = (SELECT game_id FROM games WHERE public_id::text = $1)
                       AND user_id::text = $2",
                )
                .bind(&public_id)
                .bind(user_id)
                .bind(*score)
                .execute(&mut *tx)
                .await?;
            }

            let updated = sqlx::query(
                "UPDATE games
                 SET status = 'finished', finished_at = $2,
                     winner_user_id = (SELECT user_id FROM users WHERE user_id::text = $3)
                 WHERE public_id::text = $1",
            )
            .bind(&public_id)
            .bind(finished_at)
            .bind(winner)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(updated.rows_affected())
        })
        .await?;

        if updated == 0 {
            return Err(StoreError::NotFound(game_id.to_string()));
        }
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        with_default_timeout(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }
}

/// PostgreSQL [`SessionStore`] over the `sessions` table.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn validate_session(&self, token: &str) -> StoreResult<Option<PlayerId>> {
        let row = with_default_timeout(
            sqlx::query("SELECT user_id::text AS user_id FROM sessions WHERE token = $1 AND expires_at > NOW()")
                .bind(token)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.map(|r| r.try_get::<String, _>("user_id").map(PlayerId::new))
            .transpose()
            .map_err(StoreError::from)
    }
}
