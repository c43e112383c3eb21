use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use gravity_core::simulator::SimEvent;

use crate::error::AppError;
use crate::state::{AppState, ConnectionGuard};

/// GET /api/v1/sessions/{session}/stream — live state changes for one session.
///
/// The first event is a full `snapshot`; every later event is named after
/// its change kind (`phase`, `log`, `agent`, `progress`, `deploy`).
pub async fn session_stream(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, AppError> {
    let max_sse = state.config.limits.max_sse_subscribers;
    let current = state.sse_subscriber_count.load(Ordering::Relaxed);
    if current >= max_sse {
        tracing::warn!(current, max = max_sse, "SSE subscriber limit reached");
        return Err(AppError::Unavailable(
            "Too many live subscribers".to_string(),
        ));
    }

    let handle = state.session(&session).await?;
    let guard = ConnectionGuard::new(Arc::clone(&state.sse_subscriber_count));
    let (snapshot, rx) = handle.subscribe().await;
    tracing::debug!(session = %handle.id(), "SSE subscriber attached");

    let initial = SseEvent::default()
        .event("snapshot")
        .data(serde_json::to_string(&snapshot).unwrap_or_default());

    let updates = BroadcastStream::new(rx).filter_map(move |result: Result<SimEvent, _>| {
        let _guard = &guard;
        match result {
            Ok(event) => {
                let json = serde_json::to_string(&event).unwrap_or_default();
                Some(Ok(SseEvent::default().event(event.kind()).data(json)))
            },
            Err(e) => {
                tracing::warn!("SSE broadcast receive error: {e}");
                None
            },
        }
    });

    let stream = tokio_stream::once(Ok(initial)).chain(updates);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
