//! # Observability Module
//!
//! Logging setup and the Prometheus metrics recorder.

pub mod config;
pub mod logging;
pub mod metrics;

pub use self::config::{LogConfig, LogFormat, ObservabilityConfig};
pub use self::logging::init_logging;
pub use self::metrics::install_recorder;
