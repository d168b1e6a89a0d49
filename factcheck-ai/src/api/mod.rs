//! HTTP API handlers for factcheck-ai

pub mod check;
pub mod health;
pub mod sse;

pub use check::check_routes;
pub use health::health_routes;
pub use sse::event_stream;
