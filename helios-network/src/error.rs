use thiserror::Error;

/// 网络相关错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// 地址或地址范围格式错误
    #[error("invalid IP range: {range} ({reason})")]
    InvalidRange { range: String, reason: String },

    /// 范围内已无可用地址
    #[error("no available IPs in range {0}")]
    Exhausted(String),
}

impl NetworkError {
    pub(crate) fn invalid(range: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            range: range.to_string(),
            reason: reason.into(),
        }
    }
}
