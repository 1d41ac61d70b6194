//! HTTP boundary: configuration, request context layer, middleware stack,
//! handlers, and the server lifecycle.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod module;
pub mod request_context;

pub use config::NetworkConfig;
pub use handlers::AppState;
pub use middleware::build_http_layers;
pub use module::NetworkModule;
pub use request_context::{request_context, RequestContextLayer, REQUEST_ID_HEADER};
