//! Lightweight admin HTTP server
//!
//! Exposes `/healthz`, with the health report provided by the caller.

use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::types::Health;

/// Produces the current health report on each request.
pub type HealthFn = Arc<dyn Fn() -> Health + Send + Sync>;

async fn healthz(State(report): State<HealthFn>) -> (StatusCode, Json<Health>) {
    let health = report();
    let status = if health.serving { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(health))
}

pub fn router(report: HealthFn) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(report)
}

/// Serve the admin routes on `listener` until `shutdown` resolves.
pub async fn serve_admin<F>(listener: TcpListener, report: HealthFn, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "admin server listening");
    axum::serve(listener, router(report))
        .with_graceful_shutdown(shutdown)
        .await
}
