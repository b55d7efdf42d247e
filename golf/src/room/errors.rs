//! Room error types.

use thiserror::Error;

use super::messages::ServerMessage;
use crate::db::StoreError;
use crate::game::GameError;

#[derive(Debug, Error)]
pub enum RoomError {
    /// The action broke a game rule
    #[error(transparent)]
    Rule(#[from] GameError),

    /// Loading or persisting state failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Inbound message could not be understood
    #[error("Malformed message: {0}")]
    MalformedAction(String),

    /// No state has been dealt for this game yet
    #[error("Game has not started")]
    NotStarted,

    /// The room's event loop has exited
    #[error("Room is closed")]
    RoomClosed,
}

impl RoomError {
    pub fn is_retryable(&self) -> bool {
        match self {
            RoomError::Store(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            RoomError::Store(err) => err.client_message(),
            _ => self.to_string(),
        }
    }

    /// The `error` message sent back to the originating connection.
    pub fn to_server_message(&self) -> ServerMessage {
        ServerMessage::error(self.client_message(), self.is_retryable())
    }
}

pub type RoomResult<T> = Result<T, RoomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_errors_pass_through() {
        let err = RoomError::from(GameError::NotYourTurn);
        assert_eq!(err.client_message(), "not your turn");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_store_errors_are_sanitized() {
        let err = RoomError::from(StoreError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.client_message(), "Internal server error");

        let err = RoomError::from(StoreError::VersionConflict {
            expected: 4,
            actual: 5,
        });
        assert!(err.is_retryable());
    }
}
