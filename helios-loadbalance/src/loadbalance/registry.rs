use super::Backend;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 每个服务的轮询游标
///
/// 游标只在服务首次添加后端时创建，之后选择路径只做原子自增，不需要写锁
#[derive(Debug, Default)]
pub struct RoundRobinState {
    current: AtomicUsize,
}

impl RoundRobinState {
    /// 自增并返回新的游标值
    pub fn advance(&self) -> usize {
        self.current.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }
}

#[derive(Debug, Default)]
struct ServiceEntry {
    backends: Vec<Arc<Backend>>,
    cursor: Arc<RoundRobinState>,
}

/// 服务级统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadBalancerStats {
    pub total_connections: u64,
    pub active_backends: usize,
    pub healthy_backends: usize,
}

/// 某个服务在某一时刻的后端快照
#[derive(Debug, Clone)]
pub struct ServiceSnapshot {
    pub service_name: String,
    pub backends: Vec<Arc<Backend>>,
    cursor: Arc<RoundRobinState>,
}

impl ServiceSnapshot {
    pub fn cursor(&self) -> &RoundRobinState {
        &self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// 后端注册表
///
/// 选择引擎和健康检查器的唯一数据来源。所有修改走写锁，
/// 读取只在读锁下拷贝一份 `Arc` 列表，之后的选择和网络I/O都不持锁。
#[derive(Debug, Default)]
pub struct BackendRegistry {
    services: RwLock<HashMap<String, ServiceEntry>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加后端，服务不存在时同时创建游标和统计入口。不做去重。
    pub fn add_backend(&self, backend: impl Into<Arc<Backend>>) -> Arc<Backend> {
        let backend = backend.into();
        let mut services = self.services.write();
        services
            .entry(backend.service_name.clone())
            .or_default()
            .backends
            .push(backend.clone());

        tracing::debug!(
            "Registered backend {} for service {}",
            backend.endpoint(),
            backend.service_name
        );
        backend
    }

    /// 删除第一个地址和服务都匹配的后端
    pub fn remove_backend(&self, address: &str, service_name: &str) -> Option<Arc<Backend>> {
        let mut services = self.services.write();
        let entry = services.get_mut(service_name)?;
        let index = entry.backends.iter().position(|b| b.address == address)?;
        let removed = entry.backends.remove(index);

        tracing::debug!(
            "Removed backend {} from service {}",
            removed.endpoint(),
            service_name
        );
        Some(removed)
    }

    /// 拷贝服务当前的后端列表，服务不存在时返回空列表
    pub fn snapshot(&self, service_name: &str) -> Vec<Arc<Backend>> {
        self.services
            .read()
            .get(service_name)
            .map(|entry| entry.backends.clone())
            .unwrap_or_default()
    }

    /// 拷贝后端列表以及该服务的轮询游标
    pub fn service_snapshot(&self, service_name: &str) -> Option<ServiceSnapshot> {
        let services = self.services.read();
        services.get(service_name).map(|entry| ServiceSnapshot {
            service_name: service_name.to_string(),
            backends: entry.backends.clone(),
            cursor: entry.cursor.clone(),
        })
    }

    /// 拷贝所有服务的后端列表
    pub fn snapshot_all(&self) -> Vec<(String, Vec<Arc<Backend>>)> {
        self.services
            .read()
            .iter()
            .map(|(name, entry)| (name.clone(), entry.backends.clone()))
            .collect()
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services.read().keys().cloned().collect()
    }

    pub fn backend_count(&self) -> usize {
        self.services
            .read()
            .values()
            .map(|entry| entry.backends.len())
            .sum()
    }

    /// 服务统计，每次读取时根据后端列表现算
    pub fn stats(&self, service_name: &str) -> LoadBalancerStats {
        let services = self.services.read();
        let Some(entry) = services.get(service_name) else {
            return LoadBalancerStats::default();
        };

        entry
            .backends
            .iter()
            .fold(LoadBalancerStats::default(), |mut stats, backend| {
                stats.active_backends += 1;
                stats.total_connections += u64::from(backend.connections());
                if backend.is_healthy() {
                    stats.healthy_backends += 1;
                }
                stats
            })
    }
}
