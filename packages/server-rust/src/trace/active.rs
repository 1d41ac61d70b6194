//! Per-task active `OpenTelemetry` context.
//!
//! `Context::attach` is thread-bound and its guard cannot cross an `.await`,
//! so async call chains carry their context in a task-local instead. Outside
//! any task-local scope the thread's attached context is used.

use std::future::Future;

use correlate_core::xray;
use opentelemetry::trace::{SpanContext, TraceContextExt};
use opentelemetry::Context;

tokio::task_local! {
    static ACTIVE_CONTEXT: Context;
}

/// Returns the context active for the current task.
#[must_use]
pub fn current_context() -> Context {
    ACTIVE_CONTEXT
        .try_with(Clone::clone)
        .unwrap_or_else(|_| Context::current())
}

/// Span context of the active span, if any.
#[must_use]
pub fn current_span_context() -> Option<SpanContext> {
    let cx = current_context();
    cx.has_active_span()
        .then(|| cx.span().span_context().clone())
}

/// X-Ray style composite trace id of the active span.
#[must_use]
pub fn current_xray_trace_id() -> Option<String> {
    xray::translate(current_span_context().as_ref())
}

/// Runs `fut` with `cx` as the active context. The previous context is
/// restored afterwards. Pass `Context::new()` to run with no active span.
pub fn with_context<F: Future>(cx: Context, fut: F) -> impl Future<Output = F::Output> {
    ACTIVE_CONTEXT.scope(cx, fut)
}
