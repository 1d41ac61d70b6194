//! Tracers backed by the SDK's in-memory exporter, for unit tests.

use opentelemetry_sdk::trace::{
    InMemorySpanExporter, InMemorySpanExporterBuilder, RandomIdGenerator, SdkTracerProvider,
    SpanData,
};

use super::Tracer;

/// In-memory exporter whose spans survive the provider shutting down when
/// the last telemetry handle is dropped.
pub(crate) fn exporter() -> InMemorySpanExporter {
    InMemorySpanExporterBuilder::new()
        .keep_records_on_shutdown()
        .build()
}

/// A tracer for `service` whose finished spans land in the returned exporter.
pub(crate) fn tracer(service: &str) -> (Tracer, InMemorySpanExporter) {
    let exporter = exporter();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .with_id_generator(RandomIdGenerator::default())
        .build();
    (Tracer::new(service, provider), exporter)
}

/// Finished spans in the order they ended.
pub(crate) fn finished(exporter: &InMemorySpanExporter) -> Vec<SpanData> {
    exporter.get_finished_spans().unwrap()
}
