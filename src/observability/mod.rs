//! Observability: structured logging and in-process metrics

pub mod logging;
pub mod metrics;

pub use logging::{
    init_default_logging, init_logging, init_logging_with_level, parse_level, LogFormat,
};
pub use metrics::{metrics, MetricsCollector, MetricsSnapshot, QueryTimer};

// Span macros for structured logging
pub use logging::{dispatch_span, query_span};
