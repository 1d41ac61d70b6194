//! Log sinks.

use std::io::Write;
use std::sync::Arc;

use correlate_core::{LogEntry, LogLevel, LogSink};
use parking_lot::Mutex;

/// Writes each entry as one JSON object per line.
pub struct JsonLinesSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesSink {
    #[must_use]
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl LogSink for JsonLinesSink {
    fn emit(&self, entry: LogEntry) {
        let mut line = match serde_json::to_vec(&entry) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize log entry");
                return;
            }
        };
        line.push(b'\n');

        let mut writer = self.writer.lock();
        if let Err(err) = writer.write_all(&line).and_then(|()| writer.flush()) {
            tracing::warn!(error = %err, "failed to write log entry");
        }
    }
}

impl std::fmt::Debug for JsonLinesSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink").finish_non_exhaustive()
    }
}

/// Re-emits entries as `tracing` events on the `correlate::log` target, so
/// they go through whatever subscriber the process installed.
///
/// Fields keep the entry's serialized names. `context` and `data` are
/// recorded as JSON text; absent optional fields are not recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

macro_rules! emit_event {
    ($level:expr, $entry:expr, $context:expr, $data:expr) => {
        tracing::event!(
            target: "correlate::log",
            $level,
            timestamp = %$entry.timestamp.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
            level = $entry.level.as_str(),
            source = $entry.source.as_deref(),
            event = $entry.event.as_deref(),
            data = $data.as_deref(),
            context = $context.as_str(),
            traceId = $entry.trace_id.as_deref(),
            hostname = $entry.hostname.as_str(),
            "{}",
            $entry.message
        )
    };
}

impl LogSink for TracingSink {
    fn emit(&self, entry: LogEntry) {
        let context = match serde_json::to_string(&entry.context) {
            Ok(context) => context,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize request context");
                return;
            }
        };
        let data = entry.data.as_ref().map(ToString::to_string);
        match entry.level {
            LogLevel::Debug => emit_event!(tracing::Level::DEBUG, entry, context, data),
            LogLevel::Info => emit_event!(tracing::Level::INFO, entry, context, data),
            LogLevel::Warn => emit_event!(tracing::Level::WARN, entry, context, data),
            LogLevel::Error => emit_event!(tracing::Level::ERROR, entry, context, data),
        }
    }
}

/// Keeps entries in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in emission order.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// The `event` tag of each entry, `None` for untagged entries.
    #[must_use]
    pub fn events(&self) -> Vec<Option<String>> {
        self.entries.lock().iter().map(|e| e.event.clone()).collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn emit(&self, entry: LogEntry) {
        self.entries.lock().push(entry);
    }
}
