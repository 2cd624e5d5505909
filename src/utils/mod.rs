//! # Utility Modules
//!
//! Supporting utilities for observability.
//!
//! ## Components
//! - **Logging**: `tracing-subscriber` setup driven by `LoggingConfig`
//! - **Metrics**: Thread-safe counters owned by each stage

pub mod logging;
pub mod metrics;

pub use metrics::{MetricsSnapshot, StageMetrics};
