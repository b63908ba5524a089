//! 错误处理模块
//!
//! 该模块提供 Plane 公共库的统一错误类型，主要覆盖组件注册表的加载与校验。

use thiserror::Error;

/// Plane 公共库统一错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 配置源解析错误
    #[error("配置源解析错误: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// 组件定义无效
    #[error("组件定义无效 '{name}': {reason}")]
    InvalidComponent {
        /// 组件名称
        name: String,
        /// 失败原因
        reason: String,
    },
}

/// Plane 结果类型别名
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// 构造组件定义错误
    pub fn invalid_component(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidComponent {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
