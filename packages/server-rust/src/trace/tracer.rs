//! Span factory bound to a service name and an SDK tracer provider.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use opentelemetry::trace::{SpanKind, TraceContextExt, Tracer as _, TracerProvider as _};
use opentelemetry::Context;
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};

use super::active::{current_context, with_context};

/// Creates spans. Clones share the same provider.
///
/// Spans are returned inside a [`Context`], the SDK's handle for an active
/// span: `cx.span()` sets status and ends it, and the context itself is what
/// [`with_context`] activates.
#[derive(Clone)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

struct TracerInner {
    service: String,
    provider: SdkTracerProvider,
    tracer: SdkTracer,
}

impl Tracer {
    #[must_use]
    pub fn new(service: impl Into<String>, provider: SdkTracerProvider) -> Self {
        let service = service.into();
        let tracer = provider.tracer(service.clone());
        Self {
            inner: Arc::new(TracerInner {
                service,
                provider,
                tracer,
            }),
        }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.inner.service
    }

    #[must_use]
    pub fn provider(&self) -> &SdkTracerProvider {
        &self.inner.provider
    }

    /// Starts a span under the task's active span, or a new root if there is
    /// none. The span is not activated.
    #[must_use]
    pub fn start(&self, name: impl Into<Cow<'static, str>>, kind: SpanKind) -> Context {
        self.start_with_parent(name, kind, &current_context())
    }

    /// Starts a span under whatever span `parent` holds. A context carrying
    /// a remote span context (see [`extract`](super::extract)) continues that
    /// trace; a context without a span starts a new one.
    #[must_use]
    pub fn start_with_parent(
        &self,
        name: impl Into<Cow<'static, str>>,
        kind: SpanKind,
        parent: &Context,
    ) -> Context {
        let span = self
            .inner
            .tracer
            .span_builder(name)
            .with_kind(kind)
            .start_with_context(&self.inner.tracer, parent);
        parent.with_span(span)
    }

    /// Starts a span under the active span and runs `f` with it activated.
    ///
    /// The span is active from before `f` is called until its future
    /// completes. Ending the span is left to the caller.
    pub fn in_span<F, Fut>(
        &self,
        name: impl Into<Cow<'static, str>>,
        kind: SpanKind,
        f: F,
    ) -> impl Future<Output = Fut::Output>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future,
    {
        let cx = self.start(name, kind);
        with_context(cx.clone(), f(cx))
    }

    /// Flushes and shuts down the provider. Spans ended afterwards are dropped.
    ///
    /// # Errors
    ///
    /// Returns the SDK error if the provider was already shut down or an
    /// exporter failed to shut down.
    pub fn shutdown(&self) -> OTelSdkResult {
        self.inner.provider.shutdown()
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("service", &self.inner.service)
            .finish_non_exhaustive()
    }
}
