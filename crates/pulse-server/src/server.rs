use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use pulse_store::{ChangeFeed, Database, RecordRepo, UserRepo};
use pulse_telemetry::SqliteLogSink;
use tower_http::cors::CorsLayer;

use crate::broadcast::Broadcaster;
use crate::client::ClientRegistry;
use crate::handlers;
use crate::stream;
use crate::watcher::ChangeWatcher;

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
    /// Outbound frame queue depth per streaming client.
    pub max_send_queue: usize,
    /// Change feed buffer; a lagging watcher coalesces missed notices.
    pub feed_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            max_send_queue: 256,
            feed_capacity: 1024,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<RecordRepo>,
    pub users: Arc<UserRepo>,
    pub registry: Arc<ClientRegistry>,
    /// Present when warn+ logs are persisted to SQLite.
    pub logs: Option<Arc<SqliteLogSink>>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/records",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route(
            "/api/records/{id}",
            get(handlers::get_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        )
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/api/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/api/dashboard/status-counts", get(handlers::status_counts))
        .route("/api/dashboard/stream", get(stream::stream_handler))
        .route("/api/diagnostics/logs", get(handlers::diagnostics_logs))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle to shut it down.
pub async fn start(
    config: ServerConfig,
    db: Database,
    log_sink: Option<Arc<SqliteLogSink>>,
) -> Result<ServerHandle, std::io::Error> {
    let feed = ChangeFeed::new(config.feed_capacity);
    let feed_rx = feed.subscribe();
    let repo = Arc::new(RecordRepo::new(db.clone(), feed));
    let users = Arc::new(UserRepo::new(db));
    let registry = Arc::new(ClientRegistry::new(config.max_send_queue));

    // Live pipeline: feed -> recompute -> fan out
    let watcher = ChangeWatcher::new(Arc::clone(&repo), Broadcaster::new(Arc::clone(&registry)));
    let watcher_handle = watcher.start(feed_rx);

    let state = AppState {
        repo,
        users,
        registry: Arc::clone(&registry),
        logs: log_sink,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "pulse server started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        registry,
        _server: server_handle,
        _watcher: watcher_handle,
    })
}

/// Handle returned by `start()`. Keeps background tasks alive.
pub struct ServerHandle {
    pub port: u16,
    pub registry: Arc<ClientRegistry>,
    _server: tokio::task::JoinHandle<()>,
    _watcher: tokio::task::JoinHandle<()>,
}
