//! # Fact Check Common Library
//!
//! Shared code for the fact-checking service and its tooling:
//! - Error types
//! - Configuration file model and resolution
//! - Pipeline event types and the broadcast event bus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
