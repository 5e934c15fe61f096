//! Runtime observability: the in-memory log buffer, the tracing layer that
//! feeds it, and (behind the `metrics` feature) Prometheus instrumentation.

pub mod buffer_layer;
pub mod log_buffer;
#[cfg(feature = "metrics")]
pub mod metrics;

pub use buffer_layer::BufferLayer;
pub use log_buffer::{LogBuffer, LogEvent, LogStats, LogStream};
#[cfg(feature = "metrics")]
pub use metrics::{http_metrics_middleware, prometheus_metrics, MetricsState};
