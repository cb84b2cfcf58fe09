use crate::error::NetworkError;
use crate::range::IpRange;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::net::IpAddr;

/// 从地址范围中顺序分配虚拟 IP
///
/// 已分配地址以规范文本形式保存在一个集合里，整个集合由一把锁保护。
#[derive(Debug, Default)]
pub struct IpAllocator {
    used: Mutex<HashSet<String>>,
}

impl IpAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 分配一个地址
    ///
    /// 单个地址总是分配成功，多个调用方可以共享同一个固定地址；
    /// 范围返回第一个未被占用的地址，全部占用时返回 `Exhausted`。
    pub fn allocate_ip(&self, range_spec: &str) -> Result<String, NetworkError> {
        let range: IpRange = range_spec.parse()?;

        let mut used = self.used.lock();

        if range.is_single() {
            let ip = range.start.to_string();
            used.insert(ip.clone());
            tracing::debug!("Assigned fixed IP {}", ip);
            return Ok(ip);
        }

        for candidate in range.iter() {
            let ip = candidate.to_string();
            if !used.contains(&ip) {
                used.insert(ip.clone());
                tracing::debug!("Allocated IP {} from range {}", ip, range);
                return Ok(ip);
            }
        }

        tracing::warn!("IP range {} is exhausted", range);
        Err(NetworkError::Exhausted(range.to_string()))
    }

    /// 释放地址，返回实际被移除的规范地址；未分配的地址直接忽略
    pub fn release_ip(&self, address: &str) -> Option<String> {
        let key = normalize(address);
        if !self.used.lock().remove(&key) {
            return None;
        }

        tracing::debug!("Released IP {}", key);
        Some(key)
    }

    pub fn is_allocated(&self, address: &str) -> bool {
        self.used.lock().contains(&normalize(address))
    }

    pub fn allocated_count(&self) -> usize {
        self.used.lock().len()
    }
}

fn normalize(address: &str) -> String {
    let trimmed = address.trim();
    trimmed
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|_| trimmed.to_string())
}
