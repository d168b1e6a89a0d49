//! Server-Sent Events (SSE) for pipeline progress streaming

use crate::AppState;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use factcheck_common::events::FactCheckEvent;
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// GET /events query
#[derive(Debug, Default, Deserialize)]
pub struct EventStreamQuery {
    /// Only forward events of this run
    pub run_id: Option<Uuid>,
}

/// Serialize one event as an SSE frame named after its type
pub fn to_sse_event(event: &FactCheckEvent) -> Option<Event> {
    let event_type = event.event_type();
    match serde_json::to_string(event) {
        Ok(event_json) => Some(Event::default().event(event_type).data(event_json)),
        Err(e) => {
            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
            None
        }
    }
}

/// GET /events - SSE stream of pipeline events
///
/// Streams:
/// - RunStarted
/// - StageEvent (start/log/stream/handover/done per stage)
/// - RunCompleted
/// - RunFailed
pub async fn event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventStreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(run_id = ?query.run_id, "New SSE client connected to pipeline events");

    let mut rx = state.event_bus.subscribe();
    let run_filter = query.run_id;

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if run_filter.is_some_and(|id| id != event.run_id()) {
                        continue;
                    }
                    if let Some(frame) = to_sse_event(&event) {
                        debug!("SSE: Broadcasting {}", event.event_type());
                        yield Ok(frame);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: Client lagged, {} events dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("heartbeat"))
}
