//! Status API Handlers

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::Json;
use tokio_stream::{Stream, StreamExt};

use crate::broadcast::Subscription;
use crate::relay::Relay;

use super::types::StatusResponse;

/// Shared state for the API handlers
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

/// `GET /status`
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.relay.status())
}

/// `GET /logs` — server-sent events, one event per broadcast log line.
pub async fn stream_logs(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.relay.logs().subscribe();
    let prologue = tokio_stream::once(Ok(Event::default().data("Connected to log stream")));
    Sse::new(prologue.chain(LogStream { subscription }))
}

/// Adapts a log subscription to an SSE event stream. Dropping the stream
/// (client disconnect observed by axum) drops the subscription, which
/// unsubscribes from the broadcaster.
struct LogStream {
    subscription: Subscription,
}

impl Stream for LogStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.get_mut().subscription.poll_recv(cx) {
            Poll::Ready(Some(line)) => Poll::Ready(Some(Ok(Event::default().data(line)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
