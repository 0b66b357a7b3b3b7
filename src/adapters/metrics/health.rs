//! Health Check Server - Liveness, Readiness and Metrics
//!
//! Exposes /live, /ready and /metrics via axum 0.7. Readiness flips
//! to 503 once the polling supervisor starts shutting down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use super::prometheus::MetricsRegistry;

/// Shared state behind the health endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Whether pollers are running (false once shutdown starts).
    pub polling: Arc<AtomicBool>,
    /// Metrics rendered on /metrics.
    pub metrics: Arc<MetricsRegistry>,
}

impl HealthState {
    /// Create a health state that reports ready.
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            polling: Arc::new(AtomicBool::new(true)),
            metrics,
        }
    }

    /// Check if the engine is polling.
    pub fn is_ready(&self) -> bool {
        self.polling.load(Ordering::Relaxed)
    }
}

/// Axum-based health and metrics HTTP server.
pub struct HealthServer {
    /// Health state shared with the binary.
    state: HealthState,
    /// Bind address, e.g. "127.0.0.1:9090".
    bind_address: String,
}

impl HealthServer {
    /// Create a new health server.
    pub const fn new(state: HealthState, bind_address: String) -> Self {
        Self {
            state,
            bind_address,
        }
    }

    /// Build the router without binding, for embedding or tests.
    pub fn router(state: HealthState) -> Router {
        Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .route("/metrics", get(Self::metrics))
            .with_state(state)
    }

    /// Serve until the shutdown signal fires.
    #[instrument(skip(self, shutdown_rx), fields(address = %self.bind_address))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Self::router(self.state);
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;

        info!("Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness probe: 200 while polling, 503 during shutdown.
    async fn readiness(State(state): State<HealthState>) -> impl IntoResponse {
        if state.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }

    async fn metrics(State(state): State<HealthState>) -> impl IntoResponse {
        match state.metrics.render() {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => {
                warn!(error = %e, "Failed to encode metrics");
                (StatusCode::INTERNAL_SERVER_ERROR, String::new())
            }
        }
    }
}
