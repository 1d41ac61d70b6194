//! Span exporter that reports finished spans through `tracing`.
//!
//! Shipping spans to a tracing backend is done by an external collector or an
//! OTLP exporter plugged into the provider; this one covers local debugging.

use std::future::Future;

use opentelemetry::trace::Status;
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::trace::{SpanData, SpanExporter};

/// Writes each finished span as a `debug` event on the `correlate::span` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingExporter;

impl LoggingExporter {
    fn report(span: &SpanData) {
        let duration_ms = span
            .end_time
            .duration_since(span.start_time)
            .map_or(0, |d| d.as_millis());
        let (status, status_message) = match &span.status {
            Status::Unset => ("unset", None),
            Status::Ok => ("ok", None),
            Status::Error { description } => ("error", Some(description.as_ref())),
        };
        tracing::debug!(
            target: "correlate::span",
            name = %span.name,
            kind = ?span.span_kind,
            trace_id = %span.span_context.trace_id(),
            span_id = %span.span_context.span_id(),
            parent_span_id = %span.parent_span_id,
            status,
            status_message,
            duration_ms,
            "span finished"
        );
    }
}

impl SpanExporter for LoggingExporter {
    fn export(&self, batch: Vec<SpanData>) -> impl Future<Output = OTelSdkResult> + Send {
        for span in &batch {
            Self::report(span);
        }
        std::future::ready(Ok(()))
    }
}
