//! # Golf
//!
//! A two-player Golf card game engine with real-time game rooms.
//!
//! Each player holds a 3x2 grid of cards, mostly face down, and tries to end
//! with the lowest score. Matching ranks in a column cancel out. The first
//! player to turn over their whole grid triggers a final round in which the
//! opponent gets one more turn.
//!
//! ## Core Modules
//!
//! - [`game`]: cards, scoring, the rules state machine and per-viewer views
//! - [`db`]: versioned state persistence (PostgreSQL and in-memory)
//! - [`room`]: one actor per game serializing actions and broadcasting state
//!
//! ## Example
//!
//! ```
//! use golf::game::{GameId, GameState, PlayerAction, PlayerId};
//!
//! let alice = PlayerId::new("alice");
//! let bob = PlayerId::new("bob");
//! let mut game = GameState::initialize(GameId::new("g1"), vec![alice.clone(), bob]).unwrap();
//!
//! game.apply(&alice, PlayerAction::InitialFlip { index: 0 }).unwrap();
//! assert_eq!(game.version, 2);
//! ```

/// Versioned game-state persistence.
pub mod db;

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{GameError, GameId, GameState, GameView, PlayerAction, PlayerId};

/// Per-game actors and their registry.
pub mod room;
pub use room::{RoomConfig, RoomError, RoomHandle, RoomRegistry, ServerMessage};
