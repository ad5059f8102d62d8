// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unauthenticated `GET /health` endpoint for process supervisors.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;
use vidrelay_config::model::HealthConfig;
use vidrelay_core::RelayError;
use vidrelay_relay::JobRegistry;

#[derive(Clone)]
pub struct HealthState {
    started: Instant,
    registry: Arc<JobRegistry>,
}

impl HealthState {
    pub fn new(registry: Arc<JobRegistry>) -> Self {
        Self {
            started: Instant::now(),
            registry,
        }
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub running_jobs: usize,
}

/// GET /health
pub async fn get_health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
        running_jobs: state.registry.running_count().await,
    })
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Binds the configured `host:port`.
pub async fn bind(config: &HealthConfig) -> Result<TcpListener, RelayError> {
    let addr = format!("{}:{}", config.host, config.port);
    TcpListener::bind(&addr).await.map_err(|e| {
        RelayError::Config(format!("failed to bind health endpoint to {addr}: {e}"))
    })
}

/// Serves [`router`] on `listener` until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    state: HealthState,
    cancel: CancellationToken,
) -> Result<(), RelayError> {
    if let Ok(addr) = listener.local_addr() {
        info!("health endpoint listening on {addr}");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| RelayError::Internal(format!("health endpoint error: {e}")))
}
