//! Metrics sink interface
//!
//! The balancer and the IP allocator never own a process-wide collector; the
//! embedding process hands them a recorder and decides how it is exposed.

mod recorder;

#[cfg(feature = "observability")]
mod prometheus;

pub use recorder::{MetricsRecorder, NoopRecorder};

#[cfg(feature = "observability")]
pub use self::prometheus::PrometheusRecorder;
