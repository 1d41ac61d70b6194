//! Structured log record types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::RequestContext;

/// Severity of a log entry, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Optional caller-supplied fields attached to a log call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFields {
    /// Emitting component or operation, e.g. `OrderService.place`.
    pub source: Option<String>,
    /// Machine-readable event tag, e.g. `span_start`.
    pub event: Option<String>,
    /// Arbitrary structured payload.
    pub data: Option<Value>,
}

impl LogFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    #[must_use]
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Stores `error` in `data` under the `error` key.
    ///
    /// Object payloads gain an `error` member; any other payload is moved
    /// under `value` so nothing the caller supplied is lost.
    #[must_use]
    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        let error = serde_json::to_value(error).unwrap_or(Value::Null);
        let data = match self.data.take() {
            None => {
                let mut map = Map::new();
                map.insert("error".to_string(), error);
                map
            }
            Some(Value::Object(mut map)) => {
                map.insert("error".to_string(), error);
                map
            }
            Some(other) => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map.insert("error".to_string(), error);
                map
            }
        };
        self.data = Some(Value::Object(data));
        self
    }
}

/// Serializable rendering of an error value.
///
/// `message` is the `Display` output. `detail` is the `Debug` output, which
/// for `anyhow::Error` and most error enums carries the cause chain and any
/// captured backtrace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorInfo {
    #[must_use]
    pub fn capture<E>(error: &E) -> Self
    where
        E: fmt::Display + fmt::Debug + ?Sized,
    {
        let message = error.to_string();
        let detail = format!("{error:?}");
        Self {
            detail: (detail != message).then_some(detail),
            message,
        }
    }
}

/// A single structured log record.
///
/// Built once per log call, never mutated afterwards, and handed to a
/// `LogSink` by value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub context: RequestContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    pub hostname: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("trace".parse::<LogLevel>().is_err());
    }

    #[test]
    fn with_error_on_empty_data() {
        let fields = LogFields::new().with_error(ErrorInfo {
            message: "boom".to_string(),
            detail: None,
        });
        assert_eq!(fields.data, Some(json!({ "error": { "message": "boom" } })));
    }

    #[test]
    fn with_error_keeps_object_members() {
        let fields = LogFields::new()
            .data(json!({ "orderId": 7 }))
            .with_error(ErrorInfo {
                message: "boom".to_string(),
                detail: Some("Boom { code: 3 }".to_string()),
            });
        assert_eq!(
            fields.data,
            Some(json!({
                "orderId": 7,
                "error": { "message": "boom", "detail": "Boom { code: 3 }" },
            }))
        );
    }

    #[test]
    fn with_error_wraps_scalar_data() {
        let fields = LogFields::new().data(json!(42)).with_error(ErrorInfo {
            message: "boom".to_string(),
            detail: None,
        });
        assert_eq!(
            fields.data,
            Some(json!({ "value": 42, "error": { "message": "boom" } }))
        );
    }

    #[test]
    fn error_info_keeps_debug_detail() {
        #[derive(Debug)]
        struct Boom {
            code: u8,
        }
        impl fmt::Display for Boom {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "boom {}", self.code)
            }
        }

        let info = ErrorInfo::capture(&Boom { code: 3 });
        assert_eq!(info.message, "boom 3");
        assert_eq!(info.detail.as_deref(), Some("Boom { code: 3 }"));
    }

    #[test]
    fn entry_serializes_with_verbatim_field_names() {
        let entry = LogEntry {
            timestamp: DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
            level: LogLevel::Warn,
            message: "slow".to_string(),
            source: Some("Cart.load".to_string()),
            event: None,
            data: None,
            context: RequestContext::new().with_request_id("r-1"),
            trace_id: Some("1-5759e988-bd862e3fe1be46a994272793".to_string()),
            hostname: "web-1".to_string(),
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({
                "timestamp": "2024-01-02T03:04:05Z",
                "level": "warn",
                "message": "slow",
                "source": "Cart.load",
                "context": { "requestId": "r-1" },
                "traceId": "1-5759e988-bd862e3fe1be46a994272793",
                "hostname": "web-1",
            })
        );
    }
}
