//! Helios Core Library
//!
//! This library provides core functionality shared by the Helios load balancer crates:
//! - Configuration management
//! - Configuration errors
//! - The metrics sink interface consumed by the balancer and the IP allocator

pub mod config;
pub mod error;
pub mod metrics;

// Re-export commonly used types
pub use config::model::{BalancerConfig, BalancerType, ServiceWeight};
pub use error::ConfigError;
pub use metrics::{MetricsRecorder, NoopRecorder};

#[cfg(feature = "observability")]
pub use metrics::PrometheusRecorder;
