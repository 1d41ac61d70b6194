//! Network module with deferred startup lifecycle.
//!
//! `new()` creates resources, `start()` binds the TCP listener, and
//! `serve()` accepts connections until the shutdown future resolves.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::config::NetworkConfig;
use super::handlers::{health_handler, AppState};
use super::middleware::build_http_layers;
use crate::service::Telemetry;

/// Manages the HTTP server lifecycle.
///
/// 1. `new()` -- captures configuration and telemetry
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- begins accepting connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    telemetry: Telemetry,
    routes: Router<AppState>,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, telemetry: Telemetry) -> Self {
        Self {
            config,
            telemetry,
            routes: Router::new(),
            listener: None,
        }
    }

    /// Adds application routes next to the built-in `/health` route.
    #[must_use]
    pub fn with_routes(mut self, routes: Router<AppState>) -> Self {
        self.routes = self.routes.merge(routes);
        self
    }

    /// Assembles the axum router with all routes and middleware.
    #[must_use]
    pub fn build_router(&self) -> Router {
        let state = AppState {
            telemetry: self.telemetry.clone(),
            config: Arc::new(self.config.clone()),
            start_time: Instant::now(),
        };

        let layers = build_http_layers(&self.config, &self.telemetry);

        Router::new()
            .route("/health", get(health_handler))
            .merge(self.routes.clone())
            .layer(layers)
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until `shutdown` resolves, then waits for
    /// in-flight requests to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server
    /// hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;

        info!(service = self.telemetry.tracer().service_name(), "serving HTTP connections");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("server stopped");
        Ok(())
    }
}
