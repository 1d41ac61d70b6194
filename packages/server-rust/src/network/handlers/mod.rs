//! HTTP handler definitions for the correlate server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for building the router.

pub mod health;

pub use health::health_handler;

use std::sync::Arc;
use std::time::Instant;

use super::NetworkConfig;
use crate::service::Telemetry;

/// Shared application state passed to all axum handlers via `State` extraction.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Tracer, logger and interceptor shared by all requests.
    pub telemetry: Telemetry,
    /// Network configuration (bind address, timeouts).
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
