//! 控制器模块
//!
//! 该模块实现 Plane Operator 的核心控制循环：监听 PlaneCE，
//! 通过 finalizer 把对象的生命周期分发给事件处理器，并回写状态。

use chrono::Utc;
use futures::StreamExt;
use kube::{
    api::{Api, Patch, PatchParams},
    client::Client,
    runtime::{
        controller::{Action, Controller},
        finalizer::{finalizer, Error as FinalizerError, Event as FinalizerEvent},
        watcher::Config,
    },
    ResourceExt,
};
use plane_common::ComponentRegistry;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::crd::{PlaneCE, PlanePhase};
use crate::error::{OperatorError, Result};
use crate::event_handler::{EventHandler, EventType};
use crate::gateway::KubeGateway;
use crate::reconcile::Reconciler;

/// 清理子资源用的 finalizer 名称
pub const FINALIZER_NAME: &str = "plane.co/finalizer";

/// 没有自带延迟的错误的重试间隔
const ERROR_REQUEUE_SECONDS: u64 = 30;

/// 控制器上下文
pub struct ControllerContext {
    /// Kubernetes 客户端
    pub client: Client,
    /// 事件处理器
    pub handler: EventHandler,
}

impl ControllerContext {
    /// 创建新的控制器上下文
    pub fn new(client: Client, reconciler: Arc<Reconciler>) -> Self {
        Self {
            client,
            handler: EventHandler::new(reconciler),
        }
    }
}

/// 启动 PlaneCE 控制器，直到收到退出信号
pub async fn run_controller(
    client: Client,
    namespace: Option<String>,
    registry: Arc<ComponentRegistry>,
    retry_delay: Duration,
) -> Result<()> {
    let gateway = Arc::new(KubeGateway::new(client.clone()));
    let reconciler = Arc::new(Reconciler::new(gateway, registry).with_retry_delay(retry_delay));
    let ctx = Arc::new(ControllerContext::new(client.clone(), reconciler));

    let planes: Api<PlaneCE> = match namespace.as_deref() {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    info!(
        "启动 PlaneCE 控制器，监听命名空间: {}",
        namespace.as_deref().unwrap_or("全部")
    );

    // 只监听 PlaneCE 本身：子资源变化不会改变 generation，监听它们只会产生 Unchanged 事件。
    // 子资源的回收依赖属主引用，由 Kubernetes 垃圾回收完成。
    Controller::new(planes, Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, action)) => debug!("协调成功: {} {:?}", obj.name, action),
                Err(e) => error!("协调错误: {}", e),
            }
        })
        .await;

    info!("PlaneCE 控制器已停止");
    Ok(())
}

/// 协调入口
async fn reconcile(plane: Arc<PlaneCE>, ctx: Arc<ControllerContext>) -> Result<Action> {
    let name = plane.name_any();
    let namespace = plane
        .namespace()
        .ok_or_else(|| OperatorError::Permanent(format!("PlaneCE {} 缺少命名空间", name)))?;
    let planes: Api<PlaneCE> = Api::namespaced(ctx.client.clone(), &namespace);

    finalizer(&planes, FINALIZER_NAME, plane, |event| async {
        match event {
            FinalizerEvent::Apply(plane) => apply_plane(plane, ctx.clone()).await,
            FinalizerEvent::Cleanup(plane) => cleanup_plane(plane, ctx.clone()).await,
        }
    })
    .await
    .map_err(finalizer_error)
}

/// 处理创建/更新
async fn apply_plane(plane: Arc<PlaneCE>, ctx: Arc<ControllerContext>) -> Result<Action> {
    match ctx.handler.handle(&plane).await {
        Ok(EventType::Unchanged) => Ok(Action::await_change()),
        Ok(_) => {
            // 记录已协调的 generation
            let status = json!({
                "status": {
                    "phase": PlanePhase::Ready,
                    "observedGeneration": plane.metadata.generation,
                    "message": null,
                    "lastUpdated": Utc::now(),
                }
            });
            patch_status(&ctx.client, &plane, &status).await?;
            Ok(Action::await_change())
        }
        Err(e) => {
            // 状态写入失败不影响重试
            record_failure(&ctx.client, &plane, &e).await;
            Err(e)
        }
    }
}

/// 处理删除
async fn cleanup_plane(plane: Arc<PlaneCE>, ctx: Arc<ControllerContext>) -> Result<Action> {
    let report = ctx.handler.handle_delete(&plane).await?;
    debug!(
        "PlaneCE {} 清理完成，请求 {} 次，失败 {} 次",
        plane.name_any(),
        report.attempted.len(),
        report.failed.len()
    );
    Ok(Action::await_change())
}

async fn patch_status(client: &Client, plane: &PlaneCE, status: &serde_json::Value) -> Result<()> {
    let namespace = plane.namespace().unwrap_or_default();
    let api: Api<PlaneCE> = Api::namespaced(client.clone(), &namespace);

    api.patch_status(&plane.name_any(), &PatchParams::default(), &Patch::Merge(status))
        .await?;
    Ok(())
}

/// 尽力写入失败状态；observedGeneration 保持不变，下次仍按原事件类型重试
async fn record_failure(client: &Client, plane: &PlaneCE, error: &OperatorError) {
    let phase = if error.is_retryable() {
        PlanePhase::Retrying
    } else {
        PlanePhase::Failed
    };
    let status = json!({
        "status": {
            "phase": phase,
            "message": error.to_string(),
            "lastUpdated": Utc::now(),
        }
    });

    if let Err(e) = patch_status(client, plane, &status).await {
        warn!("更新 PlaneCE {} 状态失败: {}", plane.name_any(), e);
    }
}

fn finalizer_error(error: FinalizerError<OperatorError>) -> OperatorError {
    match error {
        FinalizerError::ApplyFailed(e) | FinalizerError::CleanupFailed(e) => e,
        other => OperatorError::Finalizer(other.to_string()),
    }
}

/// 错误重试策略
fn error_policy(plane: Arc<PlaneCE>, error: &OperatorError, _ctx: Arc<ControllerContext>) -> Action {
    warn!("协调 PlaneCE {} 失败: {}", plane.name_any(), error);
    requeue_action(error)
}

/// 将错误映射为控制器动作
pub fn requeue_action(error: &OperatorError) -> Action {
    if !error.is_retryable() {
        return Action::await_change();
    }

    Action::requeue(
        error
            .requeue_delay()
            .unwrap_or(Duration::from_secs(ERROR_REQUEUE_SECONDS)),
    )
}
