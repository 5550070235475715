use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use serde_json::json;
use socketioxide::SocketIo;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use roster_backend::handlers::{on_connect, VIEWERS_ROOM};
use roster_backend::history::HistoryError;
use roster_backend::persistence::load_state;
use roster_backend::service::{now_ms, RosterService, ServiceError, SharedHistory};
use roster_backend::state::ShuffleNotice;
use roster_backend::{Config, FileHistory};

// ─── Time Sync Endpoint ───────────────────────────────────────────────────────

async fn time_sync() -> axum::Json<serde_json::Value> {
    axum::Json(json!({ "serverTime": now_ms() }))
}

// ─── Reveal Sweep Task ────────────────────────────────────────────────────────

async fn run_reveal_sweep(service: RosterService, io: SocketIo) {
    let mut interval = tokio::time::interval(Duration::from_millis(500)); // 2Hz
    loop {
        interval.tick().await;

        match service.sweep(now_ms()).await {
            None => {}
            Some(Ok(applied)) => {
                let _ = io.to(VIEWERS_ROOM).emit("assignments-updated", &applied);
            }
            Some(Err(ServiceError::History(e @ HistoryError::VersionConflict { .. }))) => {
                warn!("Overdue shuffle dropped: {e}");
                let notice = ShuffleNotice {
                    event_id: None,
                    reason: e.to_string(),
                };
                let _ = io.to(VIEWERS_ROOM).emit("shuffle-conflict", &notice);
            }
            Some(Err(e)) => error!("Overdue shuffle could not be applied: {e}"),
        }
    }
}

// ─── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster_backend=info,socketioxide=warn".into()),
        )
        .init();

    info!("☕ Roastery Roster backend starting...");

    let config = Config::from_env()?;

    // Load persisted roster and history
    let roster = load_state(&config.state_file).await;
    let history: SharedHistory = Arc::new(FileHistory::open(&config.history_file).await?);
    let port = config.port;
    let service = RosterService::new(config, roster, history);

    // Build Socket.IO layer
    let (socket_layer, io) = SocketIo::builder().build_layer();

    let service_sock = service.clone();
    io.ns("/", move |socket: socketioxide::extract::SocketRef| {
        let service = service_sock.clone();
        async move {
            on_connect(socket, service).await;
        }
    });

    // Server-side fallback for reveals nobody applied
    tokio::spawn(run_reveal_sweep(service.clone(), io.clone()));

    // CORS: viewers are served from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/sync", get(time_sync))
        .layer(socket_layer)
        .layer(cors);

    let addr = format!("0.0.0.0:{port}");
    info!("🚀 Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
