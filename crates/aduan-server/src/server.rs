use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use aduan_llm::FailoverClient;
use aduan_store::{Database, EmergencyRepo, ReportRepo};
use aduan_triage::{start_eviction_task, TriageEngine};

use crate::handlers;

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
    /// Generous because a worst-case turn rides out provider retries.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8630,
            request_timeout_secs: 300,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TriageEngine>,
    pub client: Arc<FailoverClient>,
    pub reports: ReportRepo,
    pub emergencies: EmergencyRepo,
    pub db: Database,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/api/chat", post(handlers::chat_handler))
        .route("/api/reports", get(handlers::reports_list))
        .route("/api/reports/{id}", get(handlers::report_get))
        .route("/health", get(handlers::health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

/// Create and start the server. Returns a handle to shut it down.
pub async fn start(config: ServerConfig, state: AppState) -> Result<ServerHandle, std::io::Error> {
    // Idle vault sweep (every 60s)
    let eviction = start_eviction_task(state.engine.vault(), Duration::from_secs(60));

    // Expired emergency entries leave the store on a timer
    let purge = start_purge_task(state.emergencies.clone(), Duration::from_secs(3600));

    let request_timeout = Duration::from_secs(config.request_timeout_secs);
    let router = build_router(state, request_timeout);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "Aduan server started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server_handle,
        _eviction: eviction,
        _purge: purge,
    })
}

/// Handle returned by `start()`. Keeps background tasks alive.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
    _eviction: tokio::task::JoinHandle<()>,
    _purge: tokio::task::JoinHandle<()>,
}

fn start_purge_task(repo: EmergencyRepo, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match repo.purge_expired() {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Expired emergency entries purged"),
                Err(e) => tracing::warn!(error = %e, "Emergency purge failed"),
            }
        }
    })
}
