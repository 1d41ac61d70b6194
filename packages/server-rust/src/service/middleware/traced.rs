//! Span middleware for any `tower::Service`.
//!
//! Each request is handled inside a span named after the wrapped service,
//! with the same lifecycle logging as [`Interceptor::run`].

use std::fmt;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::service::interceptor::{Interceptor, SpanName};

// ---------------------------------------------------------------------------
// TracedLayer
// ---------------------------------------------------------------------------

/// Tower layer that runs every call of the inner service under a span.
#[derive(Debug, Clone)]
pub struct TracedLayer {
    interceptor: Interceptor,
    name: SpanName,
}

impl TracedLayer {
    #[must_use]
    pub fn new(interceptor: Interceptor, name: SpanName) -> Self {
        Self { interceptor, name }
    }
}

impl<S> Layer<S> for TracedLayer {
    type Service = TracedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracedService {
            inner,
            interceptor: self.interceptor.clone(),
            name: self.name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// TracedService
// ---------------------------------------------------------------------------

/// Service wrapper produced by [`TracedLayer`].
///
/// The inner service's `call` runs before the span starts; work it defers
/// to the returned future is covered by the span.
#[derive(Debug, Clone)]
pub struct TracedService<S> {
    inner: S,
    interceptor: Interceptor,
    name: SpanName,
}

impl<S, Req> Service<Req> for TracedService<S>
where
    S: Service<Req>,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: fmt::Display + fmt::Debug + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let fut = self.inner.call(req);
        Box::pin(self.interceptor.run(self.name.clone(), fut))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
