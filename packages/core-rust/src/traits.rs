use crate::log::LogEntry;

/// Destination for structured log entries.
///
/// Implementations own serialization and delivery and must preserve the
/// entry's field names. `emit` is called synchronously from the log call;
/// any batching or asynchronous transport is the sink's own business.
pub trait LogSink: Send + Sync {
    fn emit(&self, entry: LogEntry);
}
