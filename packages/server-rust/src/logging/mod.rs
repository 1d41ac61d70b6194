//! Structured logger that stamps every entry with the current request
//! context and the active span's X-Ray trace id.
//!
//! - [`sink`]: JSON-lines, `tracing`, and in-memory sinks
//! - [`host`]: process-wide host identity

pub mod host;
pub mod sink;

#[cfg(test)]
pub(crate) mod capture;

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use correlate_core::{ErrorInfo, LogEntry, LogFields, LogLevel, LogSink};

use crate::context;
use crate::trace;

pub use sink::{JsonLinesSink, MemorySink, TracingSink};

/// Handle for emitting correlated log entries. Cloning shares the sink.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    sink: Arc<dyn LogSink>,
    hostname: Arc<str>,
    min_level: LogLevel,
}

impl Logger {
    /// Creates a logger that drops entries below `min_level`.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>, hostname: impl Into<String>, min_level: LogLevel) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                sink,
                hostname: Arc::from(hostname.into()),
                min_level,
            }),
        }
    }

    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.inner.hostname
    }

    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.inner.min_level
    }

    pub fn debug(&self, message: impl Into<String>, fields: LogFields) {
        self.log(LogLevel::Debug, message, fields);
    }

    pub fn info(&self, message: impl Into<String>, fields: LogFields) {
        self.log(LogLevel::Info, message, fields);
    }

    pub fn warn(&self, message: impl Into<String>, fields: LogFields) {
        self.log(LogLevel::Warn, message, fields);
    }

    pub fn error(&self, message: impl Into<String>, fields: LogFields) {
        self.log(LogLevel::Error, message, fields);
    }

    /// Logs `error` alongside `message`; the error lands in `data.error`.
    pub fn error_with<E>(&self, message: impl Into<String>, error: &E, fields: LogFields)
    where
        E: fmt::Display + fmt::Debug + ?Sized,
    {
        if !self.enabled(LogLevel::Error) {
            return;
        }
        self.log(LogLevel::Error, message, fields.with_error(ErrorInfo::capture(error)));
    }

    /// Logs `error` using its own message as the entry message.
    pub fn error_from<E>(&self, error: &E, fields: LogFields)
    where
        E: fmt::Display + fmt::Debug + ?Sized,
    {
        if !self.enabled(LogLevel::Error) {
            return;
        }
        let info = ErrorInfo::capture(error);
        let message = info.message.clone();
        self.log(LogLevel::Error, message, fields.with_error(info));
    }

    /// Builds one entry from the caller's fields, the current request
    /// context, and the active span, then hands it to the sink.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, fields: LogFields) {
        if !self.enabled(level) {
            return;
        }
        let LogFields {
            source,
            event,
            data,
        } = fields;

        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            source,
            event,
            data,
            context: context::get().unwrap_or_default(),
            trace_id: trace::current_xray_trace_id(),
            hostname: self.inner.hostname.to_string(),
        };
        self.inner.sink.emit(entry);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("hostname", &self.inner.hostname)
            .field("min_level", &self.inner.min_level)
            .finish_non_exhaustive()
    }
}
