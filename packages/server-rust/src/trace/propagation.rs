//! `X-Amzn-Trace-Id` propagation through the `opentelemetry-aws` X-Ray
//! propagator, over `http::HeaderMap` carriers.

use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use opentelemetry_aws::trace::XrayPropagator;

use super::active::current_context;

/// Read side of a header map, for propagators.
#[derive(Debug)]
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

/// Write side of a header map, for propagators. Keys or values that are not
/// valid header text are skipped.
#[derive(Debug)]
pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}

/// Returns `base` extended with the remote span described by the inbound
/// X-Ray header. A missing or malformed header leaves `base` unchanged, so
/// spans started under the result begin a new trace.
#[must_use]
pub fn extract(headers: &HeaderMap, base: &Context) -> Context {
    XrayPropagator::default().extract_with_context(base, &HeaderExtractor(headers))
}

/// Writes the active span as an `X-Amzn-Trace-Id` header. Returns `false`
/// when no valid span is active.
pub fn inject(headers: &mut HeaderMap) -> bool {
    let cx = current_context();
    if !cx.span().span_context().is_valid() {
        return false;
    }
    XrayPropagator::default().inject_context(&cx, &mut HeaderInjector(headers));
    true
}
