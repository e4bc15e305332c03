//! Status API Server

use std::future::IntoFuture;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use crate::relay::Relay;

use super::handlers::{get_status, stream_logs, AppState};

/// Build the status API router; exposed separately so tests can drive it
/// in-process.
pub fn router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/logs", get(stream_logs))
        .layer(CorsLayer::permissive())
        .with_state(AppState { relay })
}

/// Serve the API on an already-bound listener until shutdown. Open SSE
/// connections are dropped with the server rather than awaited, so shutdown
/// never hangs on a subscribed monitor. Log producers are never blocked by
/// this task.
pub(crate) async fn serve(
    relay: Arc<Relay>,
    listener: TcpListener,
    mut shutdown: broadcast::Receiver<()>,
) {
    let app = router(Arc::clone(&relay));
    tokio::select! {
        _ = shutdown.recv() => {}
        result = axum::serve(listener, app).into_future() => {
            if let Err(e) = result {
                relay.log(format!("[api] Server failed: {e}"));
            }
        }
    }
    relay.log("[api] Listener shut down");
}
