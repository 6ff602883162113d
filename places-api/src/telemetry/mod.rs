//! Places Telemetry - Observability Infrastructure
//!
//! Injected loggers, OpenTelemetry trace export and Prometheus metrics for
//! the API layer. Everything works without an external collector.

pub mod logger;
pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use logger::Logger;
pub use metrics::{metrics_handler, PlacesMetrics};
pub use middleware::observability_middleware;
pub use tracer::{init_telemetry, Telemetry, TelemetryConfig};
