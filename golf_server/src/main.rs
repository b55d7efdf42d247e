//! Golf game server: one room actor per live game, behind axum.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Error};
use golf::{
    db::{
        Database, InMemorySessionStore, InMemoryStateStore, PlayerRecord, SessionStore,
        StateStore,
    },
    game::{GameId, PlayerId},
    room::RoomRegistry,
};
use golf_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics,
};
use pico_args::Arguments;

const HELP: &str = "\
Run the golf game server

USAGE:
  golf_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/golf]

FLAGS:
  --memory                 Use in-process stores with a demo game instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  METRICS_BIND             Prometheus exporter address (disabled when unset)
  WS_PING_INTERVAL_SECS    Heartbeat ping interval  [default: 20]
  WS_PONG_WAIT_SECS        Read deadline  [default: 90]
  (A .env file in the working directory is loaded when present)
";

/// Demo game seeded by `--memory`
const DEMO_GAME: &str = "demo";
const DEMO_PLAYERS: [(&str, &str, &str); 2] = [
    ("alice", "Alice", "alice-token"),
    ("bob", "Bob", "bob-token"),
];

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        memory: pargs.contains("--memory"),
    };

    let config = ServerConfig::from_env(args.bind, args.database_url, args.memory)?;
    config.validate()?;

    logging::init();
    tracing::info!("Starting golf server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        tracing::info!("Prometheus metrics at http://{}/metrics", addr);
    }

    let (store, sessions, database) = if config.use_memory {
        let (store, sessions) = demo_stores();
        (store, sessions, None)
    } else {
        tracing::info!("Connecting to database");
        let db = Database::new(&config.database)
            .await
            .context("Failed to connect to database")?;
        store_health(&db).await;
        let store: Arc<dyn StateStore> = Arc::new(db.state_store());
        let sessions: Arc<dyn SessionStore> = Arc::new(db.session_store());
        (store, sessions, Some(db))
    };

    let registry = Arc::new(RoomRegistry::new(store, config.room.clone()));
    let app = api::create_router(AppState {
        registry: Arc::clone(&registry),
        sessions,
    });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    tracing::info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down server...");
    registry.shutdown().await;
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// In-process stores with one two-player game ready to be dealt.
fn demo_stores() -> (Arc<dyn StateStore>, Arc<dyn SessionStore>) {
    let roster = DEMO_PLAYERS
        .iter()
        .zip(0..)
        .map(|((id, name, _), seat)| PlayerRecord {
            player_id: PlayerId::new(*id),
            display_name: (*name).to_string(),
            seat,
            is_active: true,
        })
        .collect();
    let store = InMemoryStateStore::new().with_game(GameId::new(DEMO_GAME), roster);

    let mut sessions = InMemorySessionStore::new();
    for (id, _, token) in DEMO_PLAYERS {
        sessions = sessions.with_session(token, PlayerId::new(id));
        tracing::info!(
            "Demo session for {}: /api/ws/game/{}?token={}",
            id,
            DEMO_GAME,
            token
        );
    }

    (Arc::new(store), Arc::new(sessions))
}

async fn store_health(db: &Database) {
    match db.state_store().health_check().await {
        Ok(()) => tracing::info!("Database connected successfully"),
        Err(e) => tracing::warn!("Database health check failed: {}", e),
    }
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
