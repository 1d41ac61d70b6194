use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-request metadata captured at the inbound boundary.
///
/// Every field is optional and passed through unmodified. A snapshot of this
/// struct is copied by value into each log entry emitted while the request
/// is executing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// Full request URL (or path and query when the host is unknown).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// HTTP method, e.g. `GET`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Correlation id assigned at the edge (`x-request-id`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Opaque description of the authenticated caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Map<String, Value>>,
}

impl RequestContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: Map<String, Value>) -> Self {
        self.user = Some(user);
        self
    }

    /// Returns true if no field has been populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.method.is_none() && self.request_id.is_none() && self.user.is_none()
    }
}
