//! X-Ray interoperability: the composite trace id written into log entries.
//!
//! The composite id is `<flags>-<first 8 hex>-<remaining hex>`, with the flags
//! printed as a decimal integer. For a sampled span this is byte-identical to
//! an X-Ray trace id (`1-5759e988-bd862e3fe1be46a994272793`), which lets the
//! backend join log lines to traces.

use opentelemetry::trace::{SpanContext, TraceFlags};

/// Lowercase header name used by X-Ray to propagate trace context.
pub const XRAY_HEADER: &str = "x-amzn-trace-id";

const EPOCH_HEX_LEN: usize = 8;

/// Translates the active span's identity into the composite backend trace id.
///
/// Returns `None` when there is no active span or its context is invalid
/// (all-zero trace or span id).
#[must_use]
pub fn translate(active: Option<&SpanContext>) -> Option<String> {
    let ctx = active?;
    if !ctx.is_valid() {
        return None;
    }
    compose(&ctx.trace_id().to_string(), ctx.trace_flags())
}

/// Builds the composite id from a raw hex trace id.
///
/// Ids shorter than eight characters are not rejected: the whole id becomes
/// the first segment and the second segment is empty (`"1-abc-"`). Backends
/// already consume that shape, so it is kept as-is.
#[must_use]
pub fn compose(trace_id: &str, flags: TraceFlags) -> Option<String> {
    if trace_id.is_empty() {
        return None;
    }
    let split = trace_id
        .char_indices()
        .nth(EPOCH_HEX_LEN)
        .map_or(trace_id.len(), |(idx, _)| idx);
    let (head, tail) = trace_id.split_at(split);
    Some(format!("{}-{head}-{tail}", flags.to_u8()))
}
