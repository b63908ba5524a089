//! Plane Operator - Kubernetes Operator 自动化管理 Plane 多组件部署
//!
//! 该 crate 监听 PlaneCE 自定义资源，为注册表中的每个组件维护一个 Deployment
//! 和一个 Service，并为整个实例维护一个共享 ConfigMap，确保实际状态与期望状态一致。

pub mod controller;
pub mod crd;
pub mod error;
pub mod event_handler;
pub mod gateway;
pub mod reconcile;
pub mod resources;
pub mod spec;

use anyhow::{Context, Result};
use kube::Client;
use plane_common::ComponentRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use crate::crd::{PlaneCE, PlaneCESpec, PlaneCEStatus, PlanePhase};
pub use crate::error::{GatewayError, OperatorError};
pub use crate::gateway::{ClusterGateway, KubeGateway};
pub use crate::reconcile::{DeletionReport, Reconciler, DEFAULT_RETRY_DELAY};

/// Operator 运行参数
#[derive(Debug, Clone)]
pub struct OperatorOptions {
    /// 监听的命名空间，None 表示整个集群
    pub namespace: Option<String>,
    /// 组件注册表
    pub registry: Arc<ComponentRegistry>,
    /// 可重试错误的延迟
    pub retry_delay: Duration,
}

impl Default for OperatorOptions {
    fn default() -> Self {
        Self {
            namespace: None,
            registry: Arc::new(ComponentRegistry::builtin()),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Operator 主结构体
pub struct PlaneOperator {
    /// Kubernetes 客户端
    client: Client,
    /// 运行参数
    options: OperatorOptions,
}

impl PlaneOperator {
    /// 使用默认 kubeconfig 或集群内配置创建 Operator 实例
    pub async fn new(options: OperatorOptions) -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("创建 Kubernetes 客户端失败")?;

        Ok(Self::with_client(client, options))
    }

    /// 使用已有客户端创建 Operator 实例
    pub fn with_client(client: Client, options: OperatorOptions) -> Self {
        Self { client, options }
    }

    /// 启动 Operator，阻塞直到收到退出信号
    pub async fn start(&self) -> Result<()> {
        info!(
            "Plane Operator 启动，组件: {:?}",
            self.options
                .registry
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
        );

        controller::run_controller(
            self.client.clone(),
            self.options.namespace.clone(),
            self.options.registry.clone(),
            self.options.retry_delay,
        )
        .await
        .context("PlaneCE 控制器异常退出")?;

        Ok(())
    }
}
