use super::MetricsRecorder;
use ::prometheus::{
    exponential_buckets, CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Prometheus metrics recorder
///
/// Collectors live in a registry owned by this recorder, the embedding process
/// decides whether and how it is scraped.
#[derive(Clone)]
pub struct PrometheusRecorder {
    pub registry: Arc<Registry>,
    lb_status: GaugeVec,
    backend_connections: GaugeVec,
    backend_health: GaugeVec,
    request_duration: HistogramVec,
    operation_total: CounterVec,
    ip_allocation_status: GaugeVec,
}

impl PrometheusRecorder {
    pub fn new() -> Result<Self, ::prometheus::Error> {
        Self::with_registry(Arc::new(Registry::new()))
    }

    pub fn with_registry(registry: Arc<Registry>) -> Result<Self, ::prometheus::Error> {
        let lb_status = GaugeVec::new(
            Opts::new("lb_status", "Status of the load balancer (1 for active, 0 for inactive)")
                .namespace("helios"),
            &["name", "namespace"],
        )?;

        let backend_connections = GaugeVec::new(
            Opts::new("backend_connections", "Number of active connections per backend")
                .namespace("helios"),
            &["backend_address", "service_name"],
        )?;

        let backend_health = GaugeVec::new(
            Opts::new("backend_health", "Health status of backend (1 for healthy, 0 for unhealthy)")
                .namespace("helios"),
            &["backend_address", "service_name"],
        )?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "Time taken to process requests")
                .namespace("helios")
                .buckets(exponential_buckets(0.001, 2.0, 10)?),
            &["service_name"],
        )?;

        let operation_total = CounterVec::new(
            Opts::new("operations_total", "Total number of load balancing operations")
                .namespace("helios"),
            &["service_name", "operation", "status"],
        )?;

        let ip_allocation_status = GaugeVec::new(
            Opts::new("ip_allocation_status", "Status of IP allocation (1 for allocated, 0 for free)")
                .namespace("helios"),
            &["ip_address"],
        )?;

        registry.register(Box::new(lb_status.clone()))?;
        registry.register(Box::new(backend_connections.clone()))?;
        registry.register(Box::new(backend_health.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(operation_total.clone()))?;
        registry.register(Box::new(ip_allocation_status.clone()))?;

        Ok(Self {
            registry,
            lb_status,
            backend_connections,
            backend_health,
            request_duration,
            operation_total,
            ip_allocation_status,
        })
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl MetricsRecorder for PrometheusRecorder {
    fn record_lb_status(&self, name: &str, namespace: &str, active: bool) {
        self.lb_status
            .with_label_values(&[name, namespace])
            .set(flag(active));
    }

    fn record_backend_connections(&self, backend_addr: &str, service_name: &str, connections: f64) {
        self.backend_connections
            .with_label_values(&[backend_addr, service_name])
            .set(connections);
    }

    fn record_backend_health(&self, backend_addr: &str, service_name: &str, healthy: bool) {
        self.backend_health
            .with_label_values(&[backend_addr, service_name])
            .set(flag(healthy));
    }

    fn record_request_duration(&self, service_name: &str, duration: Duration) {
        self.request_duration
            .with_label_values(&[service_name])
            .observe(duration.as_secs_f64());
    }

    fn record_operation(&self, service_name: &str, operation: &str, status: &str) {
        self.operation_total
            .with_label_values(&[service_name, operation, status])
            .inc();
    }

    fn record_ip_allocation(&self, ip_address: &str, allocated: bool) {
        self.ip_allocation_status
            .with_label_values(&[ip_address])
            .set(flag(allocated));
    }
}
