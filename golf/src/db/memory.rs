//! In-process stores for tests and `--memory` runs. Same contracts as the
//! PostgreSQL implementations, compare-and-swap included.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::errors::{StoreError, StoreResult};
use super::repository::{PlayerRecord, SessionStore, StateStore, StoredState};
use crate::game::{GameId, GameResult, PlayerId};

#[derive(Default)]
struct Tables {
    states: HashMap<GameId, StoredState>,
    rosters: HashMap<GameId, Vec<PlayerRecord>>,
    results: HashMap<GameId, GameResult>,
}

#[derive(Default)]
pub struct InMemoryStateStore {
    tables: RwLock<Tables>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a game and its seats, as the lobby would.
    pub fn with_game(mut self, game_id: GameId, roster: Vec<PlayerRecord>) -> Self {
        self.tables.get_mut().rosters.insert(game_id, roster);
        self
    }

    /// Result written by [`StateStore::record_result`], if any.
    pub async fn recorded_result(&self, game_id: &GameId) -> Option<GameResult> {
        self.tables.read().await.results.get(game_id).cloned()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load_state(&self, game_id: &GameId) -> StoreResult<StoredState> {
        self.tables
            .read()
            .await
            .states
            .get(game_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(game_id.to_string()))
    }

    async fn save_state(&self, game_id: &GameId, blob: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.states.contains_key(game_id) {
            return Err(StoreError::AlreadyExists(game_id.to_string()));
        }
        tables.states.insert(
            game_id.clone(),
            StoredState {
                blob: blob.to_string(),
                version: 1,
            },
        );
        Ok(())
    }

    async fn compare_and_swap_state(
        &self,
        game_id: &GameId,
        blob: &str,
        expected_version: i64,
    ) -> StoreResult<i64> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .states
            .get_mut(game_id)
            .ok_or_else(|| StoreError::NotFound(game_id.to_string()))?;

        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: stored.version,
            });
        }
        stored.blob = blob.to_string();
        stored.version += 1;
        Ok(stored.version)
    }

    async fn get_players(&self, game_id: &GameId) -> StoreResult<Vec<PlayerRecord>> {
        let tables = self.tables.read().await;
        let mut roster = tables
            .rosters
            .get(game_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(game_id.to_string()))?;
        roster.sort_by_key(|p| p.seat);
        Ok(roster)
    }

    async fn record_result(&self, game_id: &GameId, result: &GameResult) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.rosters.contains_key(game_id) {
            return Err(StoreError::NotFound(game_id.to_string()));
        }
        tables.results.insert(game_id.clone(), result.clone());
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, PlayerId>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, token: impl Into<String>, player_id: PlayerId) -> Self {
        self.sessions.get_mut().insert(token.into(), player_id);
        self
    }

    pub async fn insert(&self, token: impl Into<String>, player_id: PlayerId) {
        self.sessions.write().await.insert(token.into(), player_id);
    }

    pub async fn revoke(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn validate_session(&self, token: &str) -> StoreResult<Option<PlayerId>> {
        Ok(self.sessions.read().await.get(token).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn game() -> GameId {
        GameId::new("g1")
    }

    fn seat(id: &str, seat: i32) -> PlayerRecord {
        PlayerRecord {
            player_id: PlayerId::new(id),
            display_name: id.to_uppercase(),
            seat,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = InMemoryStateStore::new();
        store.save_state(&game(), "blob-1").await.unwrap();

        let stored = store.load_state(&game()).await.unwrap();
        assert_eq!(stored.blob, "blob-1");
        assert_eq!(stored.version, 1);

        assert!(matches!(
            store.save_state(&game(), "again").await,
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_cas_advances_version() {
        let store = InMemoryStateStore::new();
        store.save_state(&game(), "v1").await.unwrap();

        assert_eq!(store.compare_and_swap_state(&game(), "v2", 1).await.unwrap(), 2);
        let err = store
            .compare_and_swap_state(&game(), "stale", 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict {
                expected: 1,
                actual: 2
            }
        ));
        assert_eq!(store.load_state(&game()).await.unwrap().blob, "v2");
    }

    #[tokio::test]
    async fn test_cas_on_missing_game() {
        let store = InMemoryStateStore::new();
        assert!(matches!(
            store.compare_and_swap_state(&game(), "x", 1).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_cas_single_winner() {
        let store = Arc::new(InMemoryStateStore::new());
        store.save_state(&game(), "v1").await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .compare_and_swap_state(&game(), &format!("writer-{i}"), 1)
                        .await
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(version) => {
                    winners += 1;
                    assert_eq!(version, 2);
                }
                Err(err) => assert!(err.is_retryable()),
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_roster_sorted_by_seat() {
        let store = InMemoryStateStore::new().with_game(game(), vec![seat("b", 1), seat("a", 0)]);
        let roster = store.get_players(&game()).await.unwrap();
        assert_eq!(roster[0].player_id, PlayerId::new("a"));
        assert_eq!(roster[1].display_name, "B");
    }

    #[tokio::test]
    async fn test_sessions() {
        let sessions = InMemorySessionStore::new().with_session("tok", PlayerId::new("a"));
        assert_eq!(
            sessions.validate_session("tok").await.unwrap(),
            Some(PlayerId::new("a"))
        );
        sessions.revoke("tok").await;
        assert_eq!(sessions.validate_session("tok").await.unwrap(), None);
    }
}
