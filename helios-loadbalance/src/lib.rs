//! Helios Load Balance Library
//!
//! This library provides the decision-making core of the Helios load balancer including:
//! - Backend registry with snapshot reads
//! - Backend selection strategies
//! - Background TCP health checking
//! - Load balance management and metrics push

pub mod loadbalance;

// Re-export commonly used types
pub use loadbalance::{
    Backend, BackendRegistry, BackendSelector, HealthChecker, LoadBalanceManager,
    LoadBalancerStats, ServiceSnapshot,
};
pub use helios_core::{BalancerConfig, BalancerType, MetricsRecorder};
