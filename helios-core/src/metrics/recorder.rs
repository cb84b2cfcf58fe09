use std::time::Duration;

/// 指标记录接口
///
/// 所有方法都是即发即弃的，调用方不关心返回值
pub trait MetricsRecorder: Send + Sync {
    /// 记录负载均衡器状态（1 活跃，0 停用）
    fn record_lb_status(&self, name: &str, namespace: &str, active: bool);

    /// 记录后端当前连接数
    fn record_backend_connections(&self, backend_addr: &str, service_name: &str, connections: f64);

    /// 记录后端健康状态
    fn record_backend_health(&self, backend_addr: &str, service_name: &str, healthy: bool);

    /// 记录一次请求的处理时长
    fn record_request_duration(&self, service_name: &str, duration: Duration);

    /// 记录负载均衡操作结果
    fn record_operation(&self, service_name: &str, operation: &str, status: &str);

    /// 记录IP分配状态
    fn record_ip_allocation(&self, ip_address: &str, allocated: bool);
}

/// 丢弃所有观测值的记录器
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl MetricsRecorder for NoopRecorder {
    fn record_lb_status(&self, _name: &str, _namespace: &str, _active: bool) {}

    fn record_backend_connections(&self, _backend_addr: &str, _service_name: &str, _connections: f64) {}

    fn record_backend_health(&self, _backend_addr: &str, _service_name: &str, _healthy: bool) {}

    fn record_request_duration(&self, _service_name: &str, _duration: Duration) {}

    fn record_operation(&self, _service_name: &str, _operation: &str, _status: &str) {}

    fn record_ip_allocation(&self, _ip_address: &str, _allocated: bool) {}
}
