use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    scanner::{self, ScanOptions, LOOPBACK},
    types::DiscoveryReport,
    verifier,
};

#[derive(Clone)]
pub struct AppState {
    options: Arc<ScanOptions>,
    last: Arc<RwLock<Option<DiscoveryReport>>>,
}

impl AppState {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options: Arc::new(options),
            last: Arc::new(RwLock::new(None)),
        }
    }
}

/// API routes for discovery, last result and single-port probes.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/status", get(get_status))
        .route("/discover", post(post_discover))
        .route("/probe/{port}", get(get_probe))
        .with_state(state);

    Router::new().nest("/api", api).layer(TraceLayer::new_for_http())
}

pub async fn spawn_server(bind: &str, options: ScanOptions) -> Result<()> {
    let app = router(AppState::new(options));
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "serving discovery API");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn get_status(State(app): State<AppState>) -> impl IntoResponse {
    match app.last.read().await.as_ref() {
        Some(report) => (StatusCode::OK, Json(report.clone())).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn post_discover(State(app): State<AppState>) -> impl IntoResponse {
    let report = scanner::discover(&app.options).await;
    *app.last.write().await = Some(report.clone());
    (StatusCode::OK, Json(report))
}

async fn get_probe(State(app): State<AppState>, Path(port): Path<u16>) -> impl IntoResponse {
    let report = verifier::probe_report(LOOPBACK, port, app.options.timeout).await;
    (StatusCode::OK, Json(report))
}
