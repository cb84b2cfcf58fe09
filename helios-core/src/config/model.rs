use crate::error::ConfigError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 负载均衡器配置
///
/// 构造之后不再修改；运行时通过 `Arc` 共享给选择器和健康检查器
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BalancerConfig {
    #[serde(default, alias = "type", alias = "method")]
    pub algorithm: BalancerType,
    #[serde(default)]
    pub health_check: bool,
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
    /// 单次TCP探测的超时时间
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default)]
    pub metrics_enabled: bool,
    /// 按服务覆盖后端权重（仅加权轮询使用）
    #[serde(default)]
    pub weights: Vec<ServiceWeight>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ServiceWeight {
    pub service_name: String,
    pub weight: u32,
}

/// 负载均衡算法
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BalancerType {
    /// 轮询（不过滤健康状态）
    #[default]
    #[serde(rename = "roundrobin")]
    RoundRobin,
    /// 最少连接
    #[serde(rename = "leastconnection")]
    LeastConnection,
    /// 加权轮询
    #[serde(rename = "weightedroundrobin")]
    WeightedRoundRobin,
    /// 客户端标识哈希，保证会话亲和
    #[serde(rename = "iphash")]
    IPHash,
    /// 随机选择
    #[serde(rename = "random")]
    RandomSelection,
}

impl BalancerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "roundrobin",
            Self::LeastConnection => "leastconnection",
            Self::WeightedRoundRobin => "weightedroundrobin",
            Self::IPHash => "iphash",
            Self::RandomSelection => "random",
        }
    }
}

impl fmt::Display for BalancerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BalancerType {
    type Err = ConfigError;

    /// 接受 `RoundRobin`、`round_robin`、`round-robin` 等写法
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "roundrobin" => Ok(Self::RoundRobin),
            "leastconnection" | "leastconnections" => Ok(Self::LeastConnection),
            "weightedroundrobin" => Ok(Self::WeightedRoundRobin),
            "iphash" => Ok(Self::IPHash),
            "random" | "randomselection" => Ok(Self::RandomSelection),
            _ => Err(ConfigError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            algorithm: BalancerType::default(),
            health_check: false,
            check_interval_ms: default_check_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            metrics_enabled: false,
            weights: Vec::new(),
        }
    }
}

impl BalancerConfig {
    pub fn new(algorithm: BalancerType) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    /// 启用健康检查并设置检查间隔
    pub fn with_health_check(mut self, interval: Duration) -> Self {
        self.health_check = true;
        self.check_interval_ms = duration_to_ms(interval);
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout_ms = duration_to_ms(timeout);
        self
    }

    pub fn with_weight(mut self, service_name: impl Into<String>, weight: u32) -> Self {
        self.weights.push(ServiceWeight {
            service_name: service_name.into(),
            weight,
        });
        self
    }

    pub fn with_metrics(mut self) -> Self {
        self.metrics_enabled = true;
        self
    }

    /// 健康检查间隔，配置为0时使用默认值
    pub fn check_interval(&self) -> Duration {
        if self.check_interval_ms == 0 {
            Duration::from_millis(default_check_interval_ms())
        } else {
            Duration::from_millis(self.check_interval_ms)
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        if self.probe_timeout_ms == 0 {
            Duration::from_millis(default_probe_timeout_ms())
        } else {
            Duration::from_millis(self.probe_timeout_ms)
        }
    }

    /// 查找服务的权重覆盖，第一个匹配项生效
    pub fn weight_for(&self, service_name: &str) -> Option<u32> {
        self.weights
            .iter()
            .find(|w| w.service_name == service_name)
            .map(|w| w.weight)
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for weight in &self.weights {
            if weight.service_name.trim().is_empty() {
                anyhow::bail!("Weight override has empty service_name");
            }

            if weight.weight == 0 {
                anyhow::bail!(
                    "Weight override for service '{}' must be positive",
                    weight.service_name
                );
            }

            if !seen.insert(weight.service_name.as_str()) {
                anyhow::bail!(
                    "Duplicate weight override for service '{}'",
                    weight.service_name
                );
            }
        }

        if self.health_check && self.probe_timeout() > self.check_interval() {
            tracing::warn!(
                "probe timeout {:?} exceeds check interval {:?}; probe cycles will run back to back",
                self.probe_timeout(),
                self.check_interval()
            );
        }

        Ok(())
    }
}

/// 转换为毫秒，不足1ms的正数时长向上取整，避免被当作未配置
fn duration_to_ms(duration: Duration) -> u64 {
    let millis = duration.as_nanos().div_ceil(1_000_000);
    u64::try_from(millis).unwrap_or(u64::MAX)
}

// Default value functions
fn default_check_interval_ms() -> u64 {
    10_000
}

fn default_probe_timeout_ms() -> u64 {
    10
}
