//! Span-wrapping interceptor for async operations.
//!
//! Every intercepted call goes through the same lifecycle:
//!
//! ```text
//! start span (child of the active span) + activate
//!     -> info  event=span_start
//!     -> await operation
//!     -> Ok:  status ok
//!        Err: status error(message), error event=span_error
//!     -> info  event=span_end
//!     -> end span
//! ```
//!
//! The closing half runs exactly once on every exit path: normal return,
//! returned error, panic unwinding through the operation, or the caller
//! dropping the future before it settles. The last two close with status
//! error [`DROPPED_MESSAGE`].

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use correlate_core::{ErrorInfo, LogFields};
use opentelemetry::trace::{SpanKind, Status, TraceContextExt};
use opentelemetry::Context;

use crate::logging::Logger;
use crate::trace::{self, Tracer};

pub const SPAN_START: &str = "span_start";
pub const SPAN_END: &str = "span_end";
pub const SPAN_ERROR: &str = "span_error";

/// Status message recorded when an intercepted future is dropped unsettled.
pub const DROPPED_MESSAGE: &str = "operation dropped before completion";

/// Span name in `<component>.<operation>` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpanName(Arc<str>);

impl SpanName {
    #[must_use]
    pub fn new(component: &str, operation: &str) -> Self {
        Self(Arc::from(format!("{component}.{operation}")))
    }

    /// Uses `name` verbatim.
    #[must_use]
    pub fn raw(name: impl Into<String>) -> Self {
        Self(Arc::from(name.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&SpanName> for Cow<'static, str> {
    fn from(name: &SpanName) -> Self {
        Cow::Owned(name.as_str().to_owned())
    }
}

impl fmt::Display for SpanName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wraps operations in spans and emits lifecycle log entries.
#[derive(Debug, Clone)]
pub struct Interceptor {
    tracer: Tracer,
    logger: Logger,
    kind: SpanKind,
}

impl Interceptor {
    #[must_use]
    pub fn new(tracer: Tracer, logger: Logger) -> Self {
        Self {
            tracer,
            logger,
            kind: SpanKind::Internal,
        }
    }

    /// Overrides the kind of span this interceptor starts.
    #[must_use]
    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Runs `fut` inside a new active span named `name`.
    ///
    /// The result, success or error, is returned unchanged.
    pub fn run<Fut, T, E>(&self, name: SpanName, fut: Fut) -> impl Future<Output = Result<T, E>>
    where
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display + fmt::Debug,
    {
        self.run_with(name, move || fut)
    }

    /// Like [`run`](Self::run), but `op` itself is invoked with the span
    /// already active, so any synchronous work it does is covered too.
    pub fn run_with<F, Fut, T, E>(&self, name: SpanName, op: F) -> impl Future<Output = Result<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display + fmt::Debug,
    {
        let tracer = self.tracer.clone();
        let logger = self.logger.clone();
        let kind = self.kind.clone();

        async move {
            let cx = tracer.start(&name, kind);
            trace::with_context(cx.clone(), async move {
                let mut guard = SpanGuard::begin(cx, logger, name);
                let result = op().await;
                match &result {
                    Ok(_) => guard.succeed(),
                    Err(err) => guard.fail(err),
                }
                guard.close();
                result
            })
            .await
        }
    }

    /// Returns `op` wrapped so that every call runs under a span named `name`.
    #[must_use]
    pub fn wrap<F>(&self, name: SpanName, op: F) -> Traced<F> {
        Traced {
            interceptor: self.clone(),
            name,
            op: Arc::new(op),
        }
    }
}

/// An operation wrapped by [`Interceptor::wrap`].
///
/// Arguments are passed as a single value; use `()` for none and a tuple for
/// several.
pub struct Traced<F> {
    interceptor: Interceptor,
    name: SpanName,
    op: Arc<F>,
}

impl<F> Traced<F> {
    #[must_use]
    pub fn name(&self) -> &SpanName {
        &self.name
    }

    /// Invokes the wrapped operation with `args`.
    pub fn call<A, Fut, T, E>(&self, args: A) -> impl Future<Output = Result<T, E>>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display + fmt::Debug,
    {
        let op = Arc::clone(&self.op);
        self.interceptor.run_with(self.name.clone(), move || (*op)(args))
    }
}

impl<F> Clone for Traced<F> {
    fn clone(&self) -> Self {
        Self {
            interceptor: self.interceptor.clone(),
            name: self.name.clone(),
            op: Arc::clone(&self.op),
        }
    }
}

impl<F> fmt::Debug for Traced<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traced").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Owns the closing half of the lifecycle for one invocation.
struct SpanGuard {
    cx: Context,
    logger: Logger,
    name: SpanName,
    settled: bool,
    closed: bool,
}

impl SpanGuard {
    fn begin(cx: Context, logger: Logger, name: SpanName) -> Self {
        logger.info(
            format!("{name} started"),
            LogFields::new().source(name.as_str()).event(SPAN_START),
        );
        Self {
            cx,
            logger,
            name,
            settled: false,
            closed: false,
        }
    }

    fn succeed(&mut self) {
        self.record(Status::Ok);
    }

    fn fail<E>(&mut self, err: &E)
    where
        E: fmt::Display + fmt::Debug + ?Sized,
    {
        let info = ErrorInfo::capture(err);
        self.record(Status::error(info.message.clone()));
        self.logger.error(
            format!("{} failed: {}", self.name, info.message),
            LogFields::new()
                .source(self.name.as_str())
                .event(SPAN_ERROR)
                .with_error(info),
        );
    }

    fn record(&mut self, status: Status) {
        if self.settled {
            tracing::warn!(span = %self.name, "span status already recorded");
            return;
        }
        self.settled = true;
        self.cx.span().set_status(status);
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if !self.settled {
            self.record(Status::error(DROPPED_MESSAGE));
        }
        // Drop can run outside the task-local scope; the attached context
        // keeps the span_end entry on this span's trace.
        let _attached = self.cx.clone().attach();
        self.logger.info(
            format!("{} ended", self.name),
            LogFields::new().source(self.name.as_str()).event(SPAN_END),
        );
        self.cx.span().end();
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context;
    use crate::logging::MemorySink;
    use crate::trace::testing;
    use correlate_core::{xray, LogLevel, RequestContext};
    use opentelemetry::trace::SpanId;
    use opentelemetry_sdk::trace::{InMemorySpanExporter, SpanData};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct OutOfStock {
        sku: String,
    }

    impl fmt::Display for OutOfStock {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{} is out of stock", self.sku)
        }
    }

    struct Harness {
        interceptor: Interceptor,
        sink: MemorySink,
        exporter: InMemorySpanExporter,
        _tracer: Tracer,
    }

    impl Harness {
        fn spans(&self) -> Vec<SpanData> {
            testing::finished(&self.exporter)
        }
    }

    fn harness() -> Harness {
        let sink = MemorySink::new();
        let (tracer, exporter) = testing::tracer("shop");
        let logger = Logger::new(Arc::new(sink.clone()), "web-1", LogLevel::Debug);
        Harness {
            interceptor: Interceptor::new(tracer.clone(), logger),
            sink,
            exporter,
            _tracer: tracer,
        }
    }

    fn name() -> SpanName {
        SpanName::new("Inventory", "reserve")
    }

    #[test]
    fn span_name_joins_component_and_operation() {
        assert_eq!(name().as_str(), "Inventory.reserve");
        assert_eq!(SpanName::raw("GET /cart").to_string(), "GET /cart");
    }

    #[tokio::test]
    async fn success_returns_result_and_records_ok() {
        let h = harness();
        let result: Result<u32, OutOfStock> = h.interceptor.run(name(), async { Ok(7) }).await;
        assert_eq!(result, Ok(7));

        assert_eq!(
            h.sink.events(),
            [Some(SPAN_START.to_string()), Some(SPAN_END.to_string())]
        );
        assert!(h.sink.entries().iter().all(|e| e.level == LogLevel::Info));
        assert!(h
            .sink
            .entries()
            .iter()
            .all(|e| e.source.as_deref() == Some("Inventory.reserve")));

        let spans = h.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "Inventory.reserve");
        assert_eq!(spans[0].status, Status::Ok);
        assert_eq!(spans[0].span_kind, SpanKind::Internal);
    }

    #[tokio::test]
    async fn failure_is_returned_unchanged_and_recorded() {
        let h = harness();
        let err = OutOfStock { sku: "sku-1".into() };
        let result: Result<u32, OutOfStock> = h
            .interceptor
            .run(name(), {
                let err = err.clone();
                async move { Err(err) }
            })
            .await;
        assert_eq!(result, Err(err));

        assert_eq!(
            h.sink.events(),
            [
                Some(SPAN_START.to_string()),
                Some(SPAN_ERROR.to_string()),
                Some(SPAN_END.to_string()),
            ]
        );
        let entries = h.sink.entries();
        let error_entry = &entries[1];
        assert_eq!(error_entry.level, LogLevel::Error);
        assert_eq!(error_entry.source.as_deref(), Some("Inventory.reserve"));
        assert_eq!(
            error_entry.data.as_ref().unwrap()["error"]["message"],
            "sku-1 is out of stock"
        );

        let spans = h.spans();
        assert_eq!(spans[0].status, Status::error("sku-1 is out of stock"));
    }

    #[tokio::test]
    async fn lifecycle_entries_carry_the_span_trace_id() {
        let h = harness();
        let seen = h
            .interceptor
            .run(name(), async {
                Ok::<_, OutOfStock>(trace::current_span_context())
            })
            .await
            .unwrap()
            .unwrap();

        let expected = xray::translate(Some(&seen));
        assert!(expected.is_some());
        assert!(h.sink.entries().iter().all(|e| e.trace_id == expected));
    }

    #[tokio::test]
    async fn span_start_is_logged_before_operation_runs() {
        let h = harness();
        let sink = h.sink.clone();
        h.interceptor
            .run_with(name(), move || {
                let started = sink.events();
                async move {
                    assert_eq!(started, [Some(SPAN_START.to_string())]);
                    Ok::<_, OutOfStock>(())
                }
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn nested_calls_form_parent_child_spans() {
        let h = harness();
        let inner_interceptor = h.interceptor.clone();

        let result: Result<(), OutOfStock> = h
            .interceptor
            .run(SpanName::new("Checkout", "place"), async move {
                let outer = trace::current_span_context().unwrap();
                let inner = inner_interceptor
                    .run(name(), async {
                        Ok::<_, OutOfStock>(trace::current_span_context().unwrap())
                    })
                    .await
                    .unwrap();
                assert_eq!(inner.trace_id(), outer.trace_id());
                assert_ne!(inner.span_id(), outer.span_id());
                assert_eq!(trace::current_span_context().unwrap(), outer);
                Ok(())
            })
            .await;
        result.unwrap();

        let spans = h.spans();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].name, "Inventory.reserve");
        assert_eq!(spans[1].name, "Checkout.place");
        assert_eq!(spans[0].parent_span_id, spans[1].span_context.span_id());
        assert_eq!(spans[0].span_context.trace_id(), spans[1].span_context.trace_id());
        assert_eq!(spans[1].status, Status::Ok);
    }

    #[tokio::test]
    async fn inner_failure_does_not_change_outer_status() {
        let h = harness();
        let inner_interceptor = h.interceptor.clone();

        let result: Result<&str, OutOfStock> = h
            .interceptor
            .run(SpanName::new("Checkout", "place"), async move {
                let inner: Result<(), OutOfStock> = inner_interceptor
                    .run(name(), async { Err(OutOfStock { sku: "a".into() }) })
                    .await;
                assert!(inner.is_err());
                Ok("fallback")
            })
            .await;
        assert_eq!(result, Ok("fallback"));

        let spans = h.spans();
        assert!(matches!(spans[0].status, Status::Error { .. }));
        assert_eq!(spans[1].status, Status::Ok);
    }

    #[tokio::test]
    async fn dropped_future_still_closes_span() {
        let h = harness();
        let fut = h.interceptor.run(name(), async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            Ok::<(), OutOfStock>(())
        });
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(10), fut).await;
        assert!(timed_out.is_err());

        assert_eq!(
            h.sink.events(),
            [Some(SPAN_START.to_string()), Some(SPAN_END.to_string())]
        );
        let spans = h.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].status, Status::error(DROPPED_MESSAGE));
    }

    #[tokio::test]
    async fn panicking_operation_still_closes_span() {
        let h = harness();
        let crashing = h.interceptor.run(name(), async {
            tokio::task::yield_now().await;
            let backend_up = false;
            if !backend_up {
                panic!("inventory backend crashed");
            }
            Ok::<(), OutOfStock>(())
        });

        let joined = tokio::spawn(crashing).await;
        assert!(joined.unwrap_err().is_panic());

        assert_eq!(
            h.sink.events(),
            [Some(SPAN_START.to_string()), Some(SPAN_END.to_string())]
        );
        let entries = h.sink.entries();
        assert!(entries[0].trace_id.is_some());
        assert_eq!(entries[1].trace_id, entries[0].trace_id);

        let spans = h.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "Inventory.reserve");
        assert_eq!(spans[0].status, Status::error(DROPPED_MESSAGE));
    }

    #[tokio::test]
    async fn wrapped_operation_keeps_its_signature() {
        let h = harness();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let reserve = h.interceptor.wrap(name(), move |(sku, qty): (String, u32)| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if qty == 0 {
                    Err(OutOfStock { sku })
                } else {
                    Ok(qty * 2)
                }
            }
        });

        assert_eq!(reserve.call(("a".to_string(), 2)).await, Ok(4));
        assert_eq!(
            reserve.call(("b".to_string(), 0)).await,
            Err(OutOfStock { sku: "b".into() })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(reserve.name().as_str(), "Inventory.reserve");

        let statuses: Vec<_> = h.spans().into_iter().map(|s| s.status).collect();
        assert_eq!(statuses, [Status::Ok, Status::error("b is out of stock")]);
    }

    #[tokio::test]
    async fn zero_argument_operations_take_unit() {
        let h = harness();
        let ping = h.interceptor.wrap(SpanName::new("Health", "ping"), |()| async {
            Ok::<_, OutOfStock>("pong")
        });
        assert_eq!(ping.call(()).await, Ok("pong"));
    }

    #[tokio::test]
    async fn concurrent_chains_keep_their_own_context() {
        let h = harness();
        let chain = |id: &'static str| {
            let interceptor = h.interceptor.clone();
            context::scope_with(RequestContext::new().with_request_id(id), async move {
                interceptor
                    .run(SpanName::new("Chain", id), async move {
                        for _ in 0..3 {
                            tokio::task::yield_now().await;
                        }
                        Ok::<_, OutOfStock>(())
                    })
                    .await
            })
        };

        let (a, b) = tokio::join!(chain("a"), chain("b"));
        a.unwrap();
        b.unwrap();

        let entries = h.sink.entries();
        assert_eq!(entries.len(), 4);
        for entry in entries {
            let source = entry.source.unwrap();
            let request_id = entry.context.request_id.unwrap();
            assert_eq!(source, format!("Chain.{request_id}"));
        }

        let spans = h.spans();
        assert_eq!(spans.len(), 2);
        assert_ne!(spans[0].span_context.trace_id(), spans[1].span_context.trace_id());
        assert!(spans.iter().all(|s| s.parent_span_id == SpanId::INVALID));
    }

    #[tokio::test]
    async fn interceptor_kind_is_configurable() {
        let h = harness();
        let client = h.interceptor.clone().with_kind(SpanKind::Client);
        client
            .run(SpanName::new("Payments", "charge"), async { Ok::<_, OutOfStock>(()) })
            .await
            .unwrap();
        assert_eq!(h.spans()[0].span_kind, SpanKind::Client);
    }
}
