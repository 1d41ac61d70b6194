//! Demo server: an axum app whose handlers run nested intercepted
//! operations, so every log line carries the request context and trace id.
//!
//! ```text
//! curl -H 'X-Request-Id: r-1' localhost:8080/orders/7
//! curl localhost:8080/orders/0      # failing operation, 404
//! curl localhost:8080/ping          # tower-layer traced route
//! ```

use std::time::Duration;

use anyhow::Context as _;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clap::{Parser, ValueEnum};
use correlate_core::{LogFields, LogLevel};
use correlate_server::context;
use correlate_server::network::AppState;
use correlate_server::service::{IdGeneratorKind, LogSinkKind, SpanExporterKind};
use correlate_server::{
    Interceptor, Logger, NetworkConfig, NetworkModule, SpanName, Telemetry, TelemetryConfig,
    TracedLayer,
};
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Parser)]
#[command(name = "correlate-demo", about = "Request correlation demo server")]
struct Cli {
    /// Service name recorded on exported spans.
    #[arg(long, env = "CORRELATE_SERVICE_NAME", default_value = "correlate-demo")]
    service_name: String,

    /// Minimum level for correlated log entries.
    #[arg(long, env = "CORRELATE_LOG_LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Destination for correlated log entries: json or tracing.
    #[arg(long, env = "CORRELATE_LOG_SINK", default_value = "json")]
    log_sink: LogSinkKind,

    /// Trace id generation: xray or random.
    #[arg(long, env = "CORRELATE_ID_GENERATOR", default_value = "xray")]
    id_generator: IdGeneratorKind,

    /// Finished span handling: logging or noop.
    #[arg(long, env = "CORRELATE_SPAN_EXPORTER", default_value = "logging")]
    span_exporter: SpanExporterKind,

    /// Host name stamped on log entries.
    #[arg(long, env = "CORRELATE_HOSTNAME")]
    hostname: Option<String>,

    #[arg(long, env = "CORRELATE_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "CORRELATE_PORT", default_value_t = 8080)]
    port: u16,

    #[arg(long, env = "CORRELATE_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    /// Format of process diagnostics.
    #[arg(long, env = "CORRELATE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

impl Cli {
    fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self.service_name.clone(),
            hostname: self.hostname.clone(),
            min_level: self.log_level,
            sink: self.log_sink,
            id_generator: self.id_generator,
            span_exporter: self.span_exporter,
            ..TelemetryConfig::default()
        }
    }

    fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "correlate_server=info,correlate_demo=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
    }
}

#[derive(Debug, thiserror::Error)]
enum OrderError {
    #[error("order {0} not found")]
    NotFound(u64),
}

async fn reserve_stock(id: u64) -> Result<u32, OrderError> {
    tokio::time::sleep(Duration::from_millis(5)).await;
    if id == 0 {
        return Err(OrderError::NotFound(id));
    }
    Ok(u32::try_from(id % 10).unwrap_or(0) + 1)
}

async fn load_order(interceptor: &Interceptor, logger: &Logger, id: u64) -> Result<Value, OrderError> {
    logger.info(
        "loading order",
        LogFields::new().source("OrderService.load").data(json!({ "orderId": id })),
    );

    let reserved = interceptor
        .run(SpanName::new("InventoryService", "reserve"), reserve_stock(id))
        .await?;

    let audit = logger.clone();
    tokio::spawn(context::inherit(async move {
        audit.info("order viewed", LogFields::new().source("audit").data(json!({ "orderId": id })));
    }));

    Ok(json!({ "id": id, "reserved": reserved }))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, StatusCode> {
    let interceptor = state.telemetry.interceptor();
    let logger = state.telemetry.logger();

    interceptor
        .run(
            SpanName::new("OrderService", "load"),
            load_order(interceptor, logger, id),
        )
        .await
        .map(Json)
        .map_err(|_| StatusCode::NOT_FOUND)
}

fn demo_routes(telemetry: &Telemetry) -> Router<AppState> {
    Router::new()
        .route("/orders/{id}", get(get_order))
        .route(
            "/ping",
            get(|| async { "pong" }).layer(TracedLayer::new(
                telemetry.interceptor().clone(),
                SpanName::new("PingHandler", "call"),
            )),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let telemetry =
        Telemetry::from_config(cli.telemetry_config()).context("invalid telemetry configuration")?;

    let mut module = NetworkModule::new(cli.network_config(), telemetry.clone())
        .with_routes(demo_routes(&telemetry));
    let port = module.start().await?;
    info!(port, service = %cli.service_name, "correlate demo listening");

    module
        .serve(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for ctrl-c");
            }
            info!("shutdown signal received");
        })
        .await?;

    telemetry.shutdown();
    Ok(())
}
