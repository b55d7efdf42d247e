//! Game rooms: one async actor per active game.
//!
//! ## Architecture
//!
//! Each room runs in its own Tokio task and drains an mpsc inbox, so no two
//! actions for the same game are ever evaluated concurrently. Actions are
//! applied against the latest persisted state and written back with a
//! compare-and-swap on its version; every member connection then receives
//! its own redacted view through a bounded outbound queue.
//!
//! The [`RoomRegistry`] spawns rooms lazily and replaces handles whose loop
//! has exited.
//!
//! ## Example
//!
//! ```no_run
//! use golf::db::InMemoryStateStore;
//! use golf::game::{GameId, PlayerId};
//! use golf::room::{RoomConfig, RoomRegistry};
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = RoomRegistry::new(Arc::new(InMemoryStateStore::new()), RoomConfig::default());
//!     let (tx, mut rx) = mpsc::channel(64);
//!
//!     let game = GameId::new("abc123");
//!     let (room, _conn) = registry.join_room(&game, PlayerId::new("alice"), tx).await.unwrap();
//!     if let Err(err) = room.start_game().await {
//!         eprintln!("not dealt: {}", err.client_message());
//!     }
//!
//!     while let Some(frame) = rx.recv().await {
//!         println!("{}", serde_json::to_string(&frame).unwrap());
//!     }
//! }
//! ```

pub mod actor;
pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;

pub use actor::{Connection, RoomActor, RoomHandle};
pub use config::RoomConfig;
pub use errors::{RoomError, RoomResult};
pub use manager::RoomRegistry;
pub use messages::{
    ConnectionId, ErrorPayload, GameEndPayload, PresencePayload, RoomMessage, ServerMessage,
    parse_client_message,
};
