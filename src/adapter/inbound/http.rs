//! HTTP listener for `GET /health`.
//!
//! In webhook mode the Telegram route is merged into the same router, so a
//! single port serves both.

use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{Error, Result};
use crate::infrastructure::health::HealthChecker;

/// Router serving the health probe.
pub fn health_router(checker: Arc<HealthChecker>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(checker)
}

async fn health(State(checker): State<Arc<HealthChecker>>) -> (StatusCode, Json<Value>) {
    let report = checker.report().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report.to_json()))
}

/// Serve `router` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Connection(format!("HTTP server error: {e}")))?;

    info!("HTTP server stopped");
    Ok(())
}
