//! factcheck-ai library interface
//!
//! Multi-stage claim verification: research, audit, challenge and
//! adjudication over a rate-limited generation service.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod stages;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use crate::workflow::PipelineOrchestrator;
use axum::Router;
use chrono::{DateTime, Utc};
use factcheck_common::events::EventBus;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared pipeline; every run goes through its one rate limiter
    pub orchestrator: Arc<PipelineOrchestrator>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Pipeline runs in flight
    pub active_runs: Arc<AtomicUsize>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last run failure, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>, event_bus: EventBus) -> Self {
        Self {
            orchestrator,
            event_bus,
            active_runs: Arc::new(AtomicUsize::new(0)),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::check_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .with_state(state)
}
