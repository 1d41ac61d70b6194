//! Telemetry configuration: service identity, logger, id generation, export.

use std::fmt;
use std::str::FromStr;

use correlate_core::{LogLevel, ParseLevelError};

/// Errors raised while parsing or validating [`TelemetryConfig`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("service name must not be empty")]
    EmptyServiceName,
    #[error(transparent)]
    Level(#[from] ParseLevelError),
    #[error("unknown {kind} `{value}` (expected one of: {expected})")]
    UnknownVariant {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Where the structured logger writes its entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogSinkKind {
    /// One JSON object per line on stdout.
    #[default]
    JsonLines,
    /// Forwarded to the installed `tracing` subscriber.
    Tracing,
}

/// How trace and span ids are generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdGeneratorKind {
    /// Epoch seconds in the top 32 bits of the trace id.
    #[default]
    Xray,
    Random,
}

/// What happens to a span once it ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpanExporterKind {
    /// Debug-level `tracing` event per finished span.
    #[default]
    Logging,
    Noop,
}

macro_rules! impl_kind_parse {
    ($ty:ty, $kind:literal, $expected:literal, { $($name:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    _ => Err(ConfigError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                        expected: $expected,
                    }),
                }
            }
        }
    };
}

impl_kind_parse!(LogSinkKind, "log sink", "json, tracing", {
    "json" => LogSinkKind::JsonLines,
    "jsonl" => LogSinkKind::JsonLines,
    "tracing" => LogSinkKind::Tracing,
});

impl_kind_parse!(IdGeneratorKind, "id generator", "xray, random", {
    "xray" => IdGeneratorKind::Xray,
    "random" => IdGeneratorKind::Random,
});

impl_kind_parse!(SpanExporterKind, "span exporter", "logging, noop", {
    "logging" => SpanExporterKind::Logging,
    "noop" => SpanExporterKind::Noop,
});

impl fmt::Display for LogSinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::JsonLines => "json",
            Self::Tracing => "tracing",
        })
    }
}

impl fmt::Display for IdGeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Xray => "xray",
            Self::Random => "random",
        })
    }
}

impl fmt::Display for SpanExporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Logging => "logging",
            Self::Noop => "noop",
        })
    }
}

/// Telemetry settings shared by the tracer, logger and HTTP boundary.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Recorded on every exported span.
    pub service_name: String,
    /// Overrides the resolved host name on log entries.
    pub hostname: Option<String>,
    /// Entries below this level are dropped.
    pub min_level: LogLevel,
    pub sink: LogSinkKind,
    pub id_generator: IdGeneratorKind,
    pub span_exporter: SpanExporterKind,
    /// Request paths that get a request context but no server span.
    pub ignored_paths: Vec<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "correlate".to_string(),
            hostname: None,
            min_level: LogLevel::Info,
            sink: LogSinkKind::default(),
            id_generator: IdGeneratorKind::default(),
            span_exporter: SpanExporterKind::default(),
            ignored_paths: vec!["/health".to_string()],
        }
    }
}

impl TelemetryConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyServiceName`] for a blank service name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::EmptyServiceName);
        }
        Ok(())
    }

    #[must_use]
    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignored_paths.iter().any(|p| p == path)
    }
}
