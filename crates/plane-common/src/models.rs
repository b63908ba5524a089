//! 数据模型模块
//!
//! 该模块定义了 Plane 应用的组件模型：组件描述符以及进程启动时加载一次的组件注册表。

pub mod component;
