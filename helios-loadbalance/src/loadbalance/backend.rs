use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// 后端服务器
///
/// 由注册表独占持有（`Arc<Backend>`），快照和选择结果只持有引用。
/// `connections` 和 `healthy` 是独立的原子字段，读取二者可能来自不同时刻。
#[derive(Debug)]
pub struct Backend {
    pub address: String,
    pub port: u16,
    pub service_name: String,
    pub weight: u32,
    connections: AtomicU32,
    healthy: AtomicBool,
}

impl Backend {
    /// 创建新的后端，初始为不健康，等待首次探测或显式标记
    pub fn new(address: impl Into<String>, port: u16, service_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port,
            service_name: service_name.into(),
            weight: 1,
            connections: AtomicU32::new(0),
            healthy: AtomicBool::new(false),
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_healthy(self, healthy: bool) -> Self {
        self.set_healthy(healthy);
        self
    }

    pub fn with_connections(self, connections: u32) -> Self {
        self.connections.store(connections, Ordering::Relaxed);
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Release);
    }

    pub fn connections(&self) -> u32 {
        self.connections.load(Ordering::Relaxed)
    }

    /// 连接数加一，返回新值
    pub fn increment_connections(&self) -> u32 {
        self.connections.fetch_add(1, Ordering::Relaxed).saturating_add(1)
    }

    /// 连接数减一，不会低于0，返回新值
    pub fn decrement_connections(&self) -> u32 {
        let previous = self
            .connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(1))
            })
            .unwrap_or_else(|current| current);
        previous.saturating_sub(1)
    }

    /// 探测用的目标地址，IPv6 地址需要加方括号
    pub fn endpoint(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service_name, self.endpoint())
    }
}
