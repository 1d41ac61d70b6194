//! HTTP boundary: request context and server span per inbound request.
//!
//! [`RequestContextLayer`] builds a [`RequestContext`] from each request,
//! continues any inbound `X-Amzn-Trace-Id` trace, and runs the rest of the
//! stack with both the context and a `Server` span in scope.
//! [`trace::inject`] writes the header for outgoing calls.

use std::fmt;
use std::task::{Context, Poll};
use std::time::Instant;

use correlate_core::{LogFields, RequestContext};
use futures_util::future::BoxFuture;
use http::{Request, Response, StatusCode};
use opentelemetry::trace::{SpanKind, Status, TraceContextExt};
use serde_json::json;
use tower::{Layer, Service};

use crate::context;
use crate::service::Telemetry;
use crate::trace;

/// Header carrying the caller's request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const DROPPED_MESSAGE: &str = "request dropped before completion";

// ---------------------------------------------------------------------------
// RequestContextLayer
// ---------------------------------------------------------------------------

/// Tower layer that scopes a [`RequestContext`] and a server span around
/// every request.
#[derive(Debug, Clone)]
pub struct RequestContextLayer {
    telemetry: Telemetry,
}

impl RequestContextLayer {
    #[must_use]
    pub fn new(telemetry: Telemetry) -> Self {
        Self { telemetry }
    }
}

impl<S> Layer<S> for RequestContextLayer {
    type Service = RequestContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestContextService {
            inner,
            telemetry: self.telemetry.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// RequestContextService
// ---------------------------------------------------------------------------

/// Service wrapper produced by [`RequestContextLayer`].
#[derive(Debug, Clone)]
pub struct RequestContextService<S> {
    inner: S,
    telemetry: Telemetry,
}

impl<S> RequestContextService<S> {
    /// Starts the server span for `req`, or `None` for ignored paths. The
    /// span continues the inbound X-Ray trace when the header is valid.
    fn start_span<B>(&self, req: &Request<B>) -> Option<opentelemetry::Context> {
        let path = req.uri().path();
        if self.telemetry.config().is_ignored(path) {
            return None;
        }
        let parent = trace::extract(req.headers(), &trace::current_context());
        let name = format!("{} {}", req.method(), path);
        Some(
            self.telemetry
                .tracer()
                .start_with_parent(name, SpanKind::Server, &parent),
        )
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestContextService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + fmt::Debug + Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // The ready service is the one that must handle this request.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let ctx = request_context(&req);
        let span = self.start_span(&req);
        let active = span.clone().unwrap_or_default();
        let logger = self.telemetry.logger().clone();

        let fut = async move {
            let traced = span.is_some();
            let mut guard = ServerSpan(span);
            let started = Instant::now();
            let result = inner.call(req).await;
            let duration_ms = started.elapsed().as_millis();

            match &result {
                Ok(resp) => {
                    let status = resp.status();
                    guard.finish(span_status(status));
                    if traced {
                        logger.info(
                            "request completed",
                            LogFields::new().source("http").event("http_request").data(json!({
                                "status": status.as_u16(),
                                "durationMs": duration_ms,
                            })),
                        );
                    }
                }
                Err(err) => {
                    guard.finish(Status::error(err.to_string()));
                    logger.error_with(
                        "request failed",
                        err,
                        LogFields::new()
                            .source("http")
                            .event("http_request")
                            .data(json!({ "durationMs": duration_ms })),
                    );
                }
            }
            result
        };

        Box::pin(context::scope_with(ctx, trace::with_context(active, fut)))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Builds the request context for `req`. A missing or unreadable
/// `x-request-id` is replaced with a fresh UUID v4.
#[must_use]
pub fn request_context<B>(req: &Request<B>) -> RequestContext {
    let url = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path(), |pq| pq.as_str());
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string);

    RequestContext::new()
        .with_url(url)
        .with_method(req.method().as_str())
        .with_request_id(request_id)
}

fn span_status(status: StatusCode) -> Status {
    if status.is_server_error() {
        Status::error(format!("HTTP {}", status.as_u16()))
    } else {
        Status::Ok
    }
}

/// Closes the server span exactly once, on completion or on drop.
///
/// The SDK keeps the strongest status a span was given (`Ok` over `Error`
/// over `Unset`), so an `Ok` set by the handler survives a 5xx here.
struct ServerSpan(Option<opentelemetry::Context>);

impl ServerSpan {
    fn finish(&mut self, status: Status) {
        if let Some(cx) = self.0.take() {
            let span = cx.span();
            span.set_status(status);
            span.end();
        }
    }
}

impl Drop for ServerSpan {
    fn drop(&mut self) {
        self.finish(Status::error(DROPPED_MESSAGE));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
