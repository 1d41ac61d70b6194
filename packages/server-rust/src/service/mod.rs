//! Operation interception and telemetry wiring.
//!
//! 1. **Interceptor** (`interceptor`): runs operations inside spans with
//!    lifecycle log entries
//! 2. **Middleware** (`middleware`): the same lifecycle as a Tower layer
//! 3. **Configuration** (`config`) and assembly (`telemetry`)

pub mod config;
pub mod interceptor;
pub mod middleware;
pub mod telemetry;

pub use config::{ConfigError, IdGeneratorKind, LogSinkKind, SpanExporterKind, TelemetryConfig};
pub use interceptor::{Interceptor, SpanName, Traced};
pub use telemetry::Telemetry;
