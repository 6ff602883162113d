//! OpenTelemetry Tracer Initialization
//!
//! Builds the subscriber the service logs into: an env filter, a JSON fmt
//! layer and, when an OTLP endpoint is configured, a tracing-opentelemetry
//! layer exporting spans over OTLP/HTTP to any compatible backend (Jaeger,
//! Grafana Tempo, ...).
//!
//! The subscriber is returned as a [`Logger`]; nothing here installs a global
//! default or a global tracer provider.

use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
    Resource,
};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

use super::logger::Logger;
use crate::error::{ApiError, ApiResult};

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// OTLP endpoint for traces (e.g., "http://localhost:4318/v1/traces")
    pub otlp_endpoint: Option<String>,
    /// Service name for traces
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (production, staging, development)
    pub environment: String,
    /// Trace sampling ratio (0.0 to 1.0)
    pub trace_sample_rate: f64,
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: std::env::var("PLACES_OTLP_ENDPOINT")
                .ok()
                .filter(|s| !s.is_empty()),
            service_name: std::env::var("PLACES_SERVICE_NAME")
                .unwrap_or_else(|_| "places-api".to_string()),
            service_version: std::env::var("PLACES_SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            environment: std::env::var("PLACES_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            trace_sample_rate: std::env::var("PLACES_TRACE_SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.1),
            log_level: std::env::var("PLACES_LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),
        }
    }
}

impl TelemetryConfig {
    fn sampler(&self) -> Sampler {
        let root = if self.trace_sample_rate >= 1.0 {
            Sampler::AlwaysOn
        } else if self.trace_sample_rate <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(self.trace_sample_rate)
        };
        Sampler::ParentBased(Box::new(root))
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::try_new(&self.log_level).unwrap_or_else(|_| EnvFilter::new("debug"))
        })
    }
}

/// Everything `main` needs from telemetry bootstrap.
pub struct Telemetry {
    /// Sink handed to every component.
    pub logger: Logger,
    provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    /// Flush pending spans and stop the exporter. Call before exit.
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                self.logger
                    .in_scope(|| tracing::error!(error = %e, "Failed to shut down tracer provider"));
            }
        }
    }
}

/// Build the service subscriber.
///
/// Sets up:
/// - JSON log lines filtered by `RUST_LOG` or the configured level
/// - OTLP/HTTP span export (only if an endpoint is configured)
pub fn init_telemetry(config: &TelemetryConfig) -> ApiResult<Telemetry> {
    let provider = match &config.otlp_endpoint {
        Some(endpoint) => {
            let exporter = SpanExporter::builder()
                .with_http()
                .with_endpoint(endpoint)
                .build()
                .map_err(|e| {
                    ApiError::internal_error(format!("Failed to create OTLP exporter: {}", e))
                })?;

            let resource = Resource::builder()
                .with_service_name(config.service_name.clone())
                .with_attributes(vec![
                    KeyValue::new("service.version", config.service_version.clone()),
                    KeyValue::new("deployment.environment", config.environment.clone()),
                ])
                .build();

            Some(
                SdkTracerProvider::builder()
                    .with_batch_exporter(exporter)
                    .with_sampler(config.sampler())
                    .with_id_generator(RandomIdGenerator::default())
                    .with_resource(resource)
                    .build(),
            )
        }
        None => None,
    };

    let otel_layer = provider
        .as_ref()
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer("places-api")));

    let subscriber = tracing_subscriber::registry()
        .with(config.env_filter())
        .with(tracing_subscriber::fmt::layer().json())
        .with(otel_layer);

    let logger = Logger::new(tracing::Dispatch::new(subscriber));

    logger.in_scope(|| {
        tracing::info!(
            service_name = config.service_name,
            environment = config.environment,
            otlp_endpoint = ?config.otlp_endpoint,
            "Telemetry initialized"
        )
    });

    Ok(Telemetry { logger, provider })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_bounds() {
        let mut config = TelemetryConfig::default();

        config.trace_sample_rate = 1.5;
        assert!(matches!(config.sampler(), Sampler::ParentBased(_)));

        config.trace_sample_rate = 0.25;
        assert!(matches!(config.sampler(), Sampler::ParentBased(_)));
    }

    #[test]
    fn test_init_without_endpoint_has_no_provider() {
        let config = TelemetryConfig {
            otlp_endpoint: None,
            log_level: "info".to_string(),
            ..TelemetryConfig::default()
        };

        let telemetry = init_telemetry(&config).unwrap();
        assert!(telemetry.provider.is_none());
        telemetry.shutdown();
    }
}
