//! 错误类型
//!
//! `GatewayError` 描述一次集群 API 调用的失败；`OperatorError` 是处理器返回给
//! 事件投递框架的信号：可重试（带延迟）或永久失败。

use std::time::Duration;
use thiserror::Error;

use crate::resources::ResourceKind;

/// 集群网关调用失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// 创建时资源已存在
    #[error("{kind} {name} 已存在")]
    AlreadyExists { kind: ResourceKind, name: String },

    /// 替换或删除时资源不存在
    #[error("{kind} {name} 不存在")]
    NotFound { kind: ResourceKind, name: String },

    /// 其他任何失败（网络、冲突、限流等）
    #[error("集群 API 调用失败: {0}")]
    Transient(String),
}

/// Operator 错误
#[derive(Error, Debug)]
pub enum OperatorError {
    /// 临时错误，调用方应在 `delay` 之后重新调用同一处理器
    #[error("{message}（{}s 后重试）", .delay.as_secs())]
    Temporary { message: String, delay: Duration },

    /// 永久错误，重试无意义
    #[error("永久错误: {0}")]
    Permanent(String),

    /// Kubernetes API 错误
    #[error("Kubernetes API 错误: {0}")]
    Kube(#[from] kube::Error),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Finalizer 错误
    #[error("Finalizer 错误: {0}")]
    Finalizer(String),
}

/// Operator 结果类型别名
pub type Result<T> = std::result::Result<T, OperatorError>;

impl OperatorError {
    /// 构造临时错误
    pub fn temporary(message: impl Into<String>, delay: Duration) -> Self {
        OperatorError::Temporary {
            message: message.into(),
            delay,
        }
    }

    /// 是否可以重试
    pub fn is_retryable(&self) -> bool {
        !matches!(self, OperatorError::Permanent(_))
    }

    /// 错误自带的重试延迟
    pub fn requeue_delay(&self) -> Option<Duration> {
        match self {
            OperatorError::Temporary { delay, .. } => Some(*delay),
            _ => None,
        }
    }
}
