//! 事件处理模块
//!
//! 该模块负责把控制器收到的 PlaneCE 对象归类为创建、更新或未变化事件，
//! 并分发给协调器对应的处理器。

use kube::{Resource, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info};

use crate::crd::PlaneCE;
use crate::error::{OperatorError, Result};
use crate::reconcile::{DeletionReport, Reconciler};

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// 从未成功协调过
    Create,
    /// 期望状态的 generation 领先于已观察的 generation
    Update,
    /// 已经协调到最新 generation
    Unchanged,
}

/// 按 status.observedGeneration 归类对象
pub fn classify(plane: &PlaneCE) -> EventType {
    let observed = plane
        .status
        .as_ref()
        .and_then(|status| status.observed_generation);

    match (observed, plane.metadata.generation) {
        (None, _) => EventType::Create,
        (Some(observed), Some(generation)) if generation > observed => EventType::Update,
        _ => EventType::Unchanged,
    }
}

/// 事件处理器结构体
pub struct EventHandler {
    /// 协调器
    reconciler: Arc<Reconciler>,
}

impl EventHandler {
    /// 创建新的事件处理器
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self { reconciler }
    }

    /// 处理创建或更新事件，返回本次识别出的事件类型
    pub async fn handle(&self, plane: &PlaneCE) -> Result<EventType> {
        let name = plane.name_any();
        let namespace = require_namespace(plane)?;
        let owner = plane.controller_owner_ref(&());

        let event = classify(plane);
        debug!("PlaneCE {}/{} 事件类型: {:?}", namespace, name, event);

        match event {
            EventType::Create => {
                self.reconciler
                    .on_create(&plane.spec, &name, &namespace, owner)
                    .await?
            }
            EventType::Update => {
                self.reconciler
                    .on_update(&plane.spec, &name, &namespace, owner)
                    .await?
            }
            EventType::Unchanged => {
                info!("PlaneCE {}/{} 已是最新状态，跳过", namespace, name);
            }
        }

        Ok(event)
    }

    /// 处理删除事件
    pub async fn handle_delete(&self, plane: &PlaneCE) -> Result<DeletionReport> {
        let name = plane.name_any();
        let namespace = require_namespace(plane)?;

        Ok(self.reconciler.on_delete(&name, &namespace).await)
    }
}

fn require_namespace(plane: &PlaneCE) -> Result<String> {
    plane.namespace().ok_or_else(|| {
        OperatorError::Permanent(format!("PlaneCE {} 缺少命名空间", plane.name_any()))
    })
}
