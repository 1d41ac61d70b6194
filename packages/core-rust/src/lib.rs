//! Correlate Core: request context and log entry models, and X-Ray trace
//! id translation over `OpenTelemetry` span contexts.

pub mod context;
pub mod log;
pub mod traits;
pub mod xray;

pub use context::RequestContext;
pub use log::{ErrorInfo, LogEntry, LogFields, LogLevel, ParseLevelError};
pub use traits::LogSink;
