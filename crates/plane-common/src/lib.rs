//! Plane Common - 跨模块共享工具与数据结构
//!
//! 该模块提供 Plane Operator 使用的组件模型、组件注册表加载以及统一的错误处理机制。

pub mod config;
pub mod error;
pub mod models;

/// 重新导出常用类型，方便使用
pub use crate::config::load_registry;
pub use error::Error;
pub use error::Result;
pub use models::component::*;
