use thiserror::Error;

/// 配置错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 未知的负载均衡算法名称
    #[error("unknown balancing algorithm: '{0}'")]
    UnknownAlgorithm(String),
}
