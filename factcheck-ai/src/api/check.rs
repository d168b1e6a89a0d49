//! Claim check endpoint
//!
//! POST /check runs the full pipeline and answers with the report. Progress
//! is published on the event bus under the returned run id while the
//! request is open.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::PipelineResult,
    workflow::EventBusObserver,
    AppState,
};

/// Longest accepted claim, in characters
pub const MAX_CLAIM_CHARS: usize = 2_000;

/// POST /check request
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub claim: String,
}

/// POST /check response
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub run_id: Uuid,
    #[serde(flatten)]
    pub result: PipelineResult,
}

/// Decrements the in-flight counter however the handler exits
struct ActiveRun<'a>(&'a AtomicUsize);

impl<'a> ActiveRun<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// POST /check
pub async fn check_claim(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> ApiResult<Json<CheckResponse>> {
    let claim = request.claim.trim();
    if claim.is_empty() {
        return Err(ApiError::BadRequest("Claim must not be empty".to_string()));
    }
    if claim.chars().count() > MAX_CLAIM_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Claim exceeds {} characters",
            MAX_CLAIM_CHARS
        )));
    }

    let run_id = Uuid::new_v4();
    let observer = EventBusObserver::new(run_id, state.event_bus.clone());
    let _active = ActiveRun::enter(&state.active_runs);

    info!(run_id = %run_id, "Check requested");
    observer.run_started(claim);

    match state.orchestrator.run(claim, &observer).await {
        Ok(result) => {
            observer.run_completed(&result);
            Ok(Json(CheckResponse { run_id, result }))
        }
        Err(e) => {
            warn!(run_id = %run_id, error = %e, "Check failed");
            observer.run_failed(&e);
            *state.last_error.write().await = Some(e.to_string());
            Err(e.into())
        }
    }
}

/// Build claim check routes
pub fn check_routes() -> Router<AppState> {
    Router::new().route("/check", post(check_claim))
}
