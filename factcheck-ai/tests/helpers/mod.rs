//! Test Helper Utilities
//!
//! Shared stubs for testing factcheck-ai without network access

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod recording_observer;
pub mod stub_services;

pub use recording_observer::{FailingObserver, RecordingObserver};
pub use stub_services::{
    paced_orchestrator, test_orchestrator, Role, ScriptedService, StubEvidenceSource,
};
