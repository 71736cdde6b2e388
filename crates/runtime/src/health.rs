use std::{future::Future, net::SocketAddr, sync::Arc};

use api_types::{HealthResponse, StatusResponse};
use axum::{Json, Router, extract::State, routing::get};
use eyre::Result;
use tokio::net::TcpListener;
use tracing::info;

/// Produces the body of `GET /` on demand.
pub type StatusFn = Arc<dyn Fn() -> StatusResponse + Send + Sync>;

/// Health check handler returning `{ "status": "ok" }`.
pub async fn handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_owned() })
}

async fn status_handler(State(status): State<StatusFn>) -> Json<StatusResponse> {
    Json(status())
}

/// Create a router exposing `/health` and the `/` status summary.
pub fn router(status: StatusFn) -> Router {
    Router::new().route("/health", get(handler)).route("/", get(status_handler)).with_state(status)
}

/// Bind `addr` and serve the health endpoints until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, status: StatusFn, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, status, shutdown).await
}

/// Serve the health endpoints on an already bound listener.
pub async fn serve_listener<F>(listener: TcpListener, status: StatusFn, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = %listener.local_addr()?, "Starting health server");
    axum::serve(listener, router(status).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Health server stopped");
    Ok(())
}
