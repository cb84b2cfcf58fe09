use crate::error::NetworkError;
use crate::ip_allocator::IpAllocator;
use helios_core::MetricsRecorder;
use std::sync::Arc;

/// 虚拟 IP 管理入口
///
/// 持有一个分配器，可选地把分配状态上报给指标记录器。
pub struct NetworkManager {
    allocator: IpAllocator,
    recorder: Option<Arc<dyn MetricsRecorder>>,
}

impl NetworkManager {
    pub fn new() -> Self {
        Self {
            allocator: IpAllocator::new(),
            recorder: None,
        }
    }

    /// 创建带指标上报的管理器
    pub fn with_metrics(recorder: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            allocator: IpAllocator::new(),
            recorder: Some(recorder),
        }
    }

    pub fn allocate_ip(&self, range_spec: &str) -> Result<String, NetworkError> {
        let ip = self.allocator.allocate_ip(range_spec)?;
        if let Some(recorder) = &self.recorder {
            recorder.record_ip_allocation(&ip, true);
        }
        Ok(ip)
    }

    /// 释放地址，只有确实被移除时才以规范地址上报
    pub fn release_ip(&self, address: &str) {
        let Some(released) = self.allocator.release_ip(address) else {
            return;
        };
        if let Some(recorder) = &self.recorder {
            recorder.record_ip_allocation(&released, false);
        }
    }

    pub fn allocator(&self) -> &IpAllocator {
        &self.allocator
    }
}

impl Default for NetworkManager {
    fn default() -> Self {
        Self::new()
    }
}
