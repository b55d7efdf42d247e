//! Persistence error types.

use std::time::Duration;
use thiserror::Error;

use super::timeouts::TimeoutError;

/// Errors from the state and session stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No state or game with this id
    #[error("Game {0} not found")]
    NotFound(String),

    /// Compare-and-swap lost against a concurrent writer
    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: i64, actual: i64 },

    /// Initial save for a game that already has state
    #[error("State for game {0} already exists")]
    AlreadyExists(String),

    /// Blob written by an incompatible engine version
    #[error("Incompatible state schema: found {found}, expected {expected}")]
    IncompatibleSchema { found: u32, expected: u32 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<TimeoutError> for StoreError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(after) => Self::Timeout(after),
            TimeoutError::Database(e) => Self::Database(e),
        }
    }
}

impl StoreError {
    /// Only a lost compare-and-swap is worth retrying; the client resends
    /// against the fresh state it is about to receive.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }

    /// Message safe to send to a client. Never includes SQL text or ids.
    pub fn client_message(&self) -> String {
        match self {
            StoreError::NotFound(_) => "Game not found".to_string(),
            StoreError::VersionConflict { .. } => {
                "Game state changed, please retry".to_string()
            }
            StoreError::AlreadyExists(_) => "Game already started".to_string(),
            StoreError::IncompatibleSchema { .. } => {
                "Game state cannot be loaded by this server version".to_string()
            }
            StoreError::Timeout(_) => "Service temporarily unavailable".to_string(),
            StoreError::Database(_) | StoreError::Serialization(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_version_conflict_is_retryable() {
        assert!(
            StoreError::VersionConflict {
                expected: 3,
                actual: 4
            }
            .is_retryable()
        );
        assert!(!StoreError::NotFound("g".into()).is_retryable());
        assert!(!StoreError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(!StoreError::Database(sqlx::Error::RowNotFound).is_retryable());
    }

    #[test]
    fn test_client_message_is_sanitized() {
        let err = StoreError::Database(sqlx::Error::Protocol(
            "relation \"game_states\" does not exist".into(),
        ));
        assert_eq!(err.client_message(), "Internal server error");

        let err = StoreError::NotFound("secret-game-id".into());
        assert!(!err.client_message().contains("secret-game-id"));
    }

    #[test]
    fn test_timeout_conversion() {
        let err: StoreError = TimeoutError::Timeout(Duration::from_secs(5)).into();
        assert!(matches!(err, StoreError::Timeout(_)));

        let err: StoreError = TimeoutError::Database(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, StoreError::Database(_)));
    }
}
