//! Assembles the tracer, logger and interceptor from a [`TelemetryConfig`].

use std::sync::Arc;

use correlate_core::LogSink;
use opentelemetry_aws::trace::XrayIdGenerator;
use opentelemetry_sdk::trace::{RandomIdGenerator, SdkTracerProvider, SpanExporter};
use opentelemetry_sdk::Resource;

use super::config::{ConfigError, IdGeneratorKind, LogSinkKind, SpanExporterKind, TelemetryConfig};
use super::interceptor::Interceptor;
use crate::logging::{host, JsonLinesSink, Logger, TracingSink};
use crate::trace::{LoggingExporter, Tracer};

/// Shared telemetry handles. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Telemetry {
    config: Arc<TelemetryConfig>,
    tracer: Tracer,
    logger: Logger,
    interceptor: Interceptor,
}

impl Telemetry {
    /// Builds the handles described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration does not validate.
    pub fn from_config(config: TelemetryConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let sink: Arc<dyn LogSink> = match config.sink {
            LogSinkKind::JsonLines => Arc::new(JsonLinesSink::stdout()),
            LogSinkKind::Tracing => Arc::new(TracingSink),
        };
        Ok(match config.span_exporter {
            SpanExporterKind::Logging => Self::with_parts(config, sink, Some(LoggingExporter)),
            SpanExporterKind::Noop => Self::with_parts(config, sink, None::<LoggingExporter>),
        })
    }

    /// Builds the handles with a caller-supplied sink and exporter, ignoring
    /// the config's `sink` and `span_exporter` choices. With no exporter,
    /// spans are still created and propagated but never exported.
    #[must_use]
    pub fn with_parts<E>(config: TelemetryConfig, sink: Arc<dyn LogSink>, exporter: Option<E>) -> Self
    where
        E: SpanExporter + 'static,
    {
        let tracer = Tracer::new(config.service_name.clone(), provider(&config, exporter));
        let hostname = config
            .hostname
            .clone()
            .unwrap_or_else(|| host::hostname().to_string());
        let logger = Logger::new(sink, hostname, config.min_level);
        let interceptor = Interceptor::new(tracer.clone(), logger.clone());

        Self {
            config: Arc::new(config),
            tracer,
            logger,
            interceptor,
        }
    }

    #[must_use]
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    #[must_use]
    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    #[must_use]
    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    /// Flushes pending spans and shuts the tracer provider down.
    pub fn shutdown(&self) {
        if let Err(err) = self.tracer.shutdown() {
            tracing::warn!(error = %err, "tracer provider shutdown failed");
        }
    }
}

fn provider<E>(config: &TelemetryConfig, exporter: Option<E>) -> SdkTracerProvider
where
    E: SpanExporter + 'static,
{
    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .build();
    let builder = SdkTracerProvider::builder().with_resource(resource);
    let builder = match config.id_generator {
        IdGeneratorKind::Xray => builder.with_id_generator(XrayIdGenerator::default()),
        IdGeneratorKind::Random => builder.with_id_generator(RandomIdGenerator::default()),
    };
    match exporter {
        Some(exporter) => builder.with_simple_exporter(exporter),
        None => builder,
    }
    .build()
}
