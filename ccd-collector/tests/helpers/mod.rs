//! Shared utilities for ccd-collector integration tests

#![allow(dead_code)]

pub mod fake_upstream;
pub mod log_capture;

pub use fake_upstream::{FakeUpstream, Scenario};
pub use log_capture::{capture_logs, LogCapture};
