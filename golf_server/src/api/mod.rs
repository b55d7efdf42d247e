//! HTTP/WebSocket API for the golf server.
//!
//! # Modules
//!
//! - [`games`]: game lifecycle endpoints (start, roster)
//! - [`websocket`]: the live game socket
//! - [`middleware`]: bearer-session authentication for protected endpoints
//! - [`request_id`]: correlation ids for requests and game sockets
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                               - Health check (public)
//! GET  /api/ws/game/{game_id}?token=<sess>   - WebSocket (session in query)
//! POST /api/v1/games/{game_id}/start         - Deal the game (auth required)
//! GET  /api/v1/games/{game_id}/players       - Roster and presence (auth required)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use golf::db::{InMemorySessionStore, InMemoryStateStore};
//! use golf::room::{RoomConfig, RoomRegistry};
//! use golf_server::api::{AppState, create_router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryStateStore::new());
//! let state = AppState {
//!     registry: Arc::new(RoomRegistry::new(store, RoomConfig::default())),
//!     sessions: Arc::new(InMemorySessionStore::new()),
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively; the lobby front end is served from
//! another origin.

pub mod games;
pub mod middleware;
pub mod request_id;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use golf::{db::SessionStore, room::RoomRegistry};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::metrics;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    /// Live rooms; also owns the state store
    pub registry: Arc<RoomRegistry>,
    /// Session token lookup
    pub sessions: Arc<dyn SessionStore>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/games/{game_id}/start", post(games::start_game))
        .route("/games/{game_id}/players", get(games::get_players))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        // WebSocket route handles its own auth via query parameter
        .route("/api/ws/game/{game_id}", get(websocket::websocket_handler))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the state store answers, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","store":true,"rooms":{"active_count":2},...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_healthy = state.registry.store().health_check().await.is_ok();
    let active_rooms = state.registry.active_room_count().await;
    metrics::active_rooms(active_rooms);

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "rooms": {
            "active_count": active_rooms
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
