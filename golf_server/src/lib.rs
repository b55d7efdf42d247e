//! HTTP and WebSocket front end for golf game rooms.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
