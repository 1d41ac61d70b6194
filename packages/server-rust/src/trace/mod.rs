//! Tracing on the `OpenTelemetry` SDK: the tracer that starts spans, the
//! per-task active context, X-Ray header propagation, and a span exporter
//! that reports finished spans as `tracing` events.
//!
//! - [`active`]: task-local active context
//! - [`tracer`]: span creation and parenting
//! - [`propagation`]: `X-Amzn-Trace-Id` extract and inject
//! - [`export`]: logging exporter

pub mod active;
pub mod export;
pub mod propagation;
pub mod tracer;

#[cfg(test)]
pub(crate) mod testing;

pub use active::{current_context, current_span_context, current_xray_trace_id, with_context};
pub use export::LoggingExporter;
pub use propagation::{extract, inject, HeaderExtractor, HeaderInjector};
pub use tracer::Tracer;
