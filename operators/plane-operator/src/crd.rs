//! 自定义资源定义模块
//!
//! 该模块定义了 Plane 的自定义资源 `PlaneCE`（group `plane.co`，version `v1`）。
//! 用户通过它声明一个多组件 Plane 应用的期望状态，Operator 负责派生并维护
//! 对应的 Deployment、Service 和 ConfigMap。

use chrono::{DateTime, Utc};
use kube::CustomResource;
use plane_common::ComponentDescriptor;
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Plane 期望状态文档
///
/// 所有字段均为可选，缺省值由规范化阶段补齐。
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(group = "plane.co", version = "v1", kind = "PlaneCE", namespaced)]
#[kube(status = "PlaneCEStatus", shortname = "plane")]
#[kube(printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#)]
#[kube(printcolumn = r#"{"name":"Updated", "type":"date", "jsonPath":".status.lastUpdated"}"#)]
#[serde(rename_all = "camelCase")]
pub struct PlaneCESpec {
    /// 旧版单组件副本数，多组件模式下忽略
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// 旧版单组件镜像，多组件模式下忽略
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beat_worker_image: Option<String>,

    /// 按组件名指定镜像，供注册表文件中新增的组件使用
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub images: BTreeMap<String, String>,

    /// 资源请求与限制，原样保存，构建容器时才解析
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub resources: Option<BTreeMap<String, serde_json::Value>>,

    /// 共享配置，转换为环境变量并写入共享 ConfigMap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub config: Option<BTreeMap<String, serde_json::Value>>,
}

impl PlaneCESpec {
    /// 查找组件的显式镜像：专用字段优先，其次是 `images` 映射
    pub fn image_for(&self, component: &ComponentDescriptor) -> Option<&str> {
        let dedicated = match component.image_field().as_str() {
            "webImage" => self.web_image.as_deref(),
            "spaceImage" => self.space_image.as_deref(),
            "liveImage" => self.live_image.as_deref(),
            "apiImage" => self.api_image.as_deref(),
            "workerImage" => self.worker_image.as_deref(),
            "beatWorkerImage" => self.beat_worker_image.as_deref(),
            _ => None,
        };

        dedicated.or_else(|| self.images.get(&component.name).map(String::as_str))
    }

    /// 已设置但会被忽略的旧版字段
    pub fn legacy_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.replicas.is_some() {
            fields.push("replicas");
        }
        if self.image.is_some() {
            fields.push("image");
        }
        fields
    }
}

/// 资源阶段
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum PlanePhase {
    /// 尚未处理
    #[default]
    Pending,
    /// 子资源已收敛
    Ready,
    /// 处理失败，等待重试
    Retrying,
    /// 处理失败，不再重试
    Failed,
}

impl fmt::Display for PlanePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanePhase::Pending => write!(f, "Pending"),
            PlanePhase::Ready => write!(f, "Ready"),
            PlanePhase::Retrying => write!(f, "Retrying"),
            PlanePhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Plane 状态
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaneCEStatus {
    /// 当前阶段
    pub phase: PlanePhase,

    /// 最近一次成功处理的 metadata.generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// 状态消息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// 上次更新时间
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// 任意结构的对象，交由 API Server 原样保存
fn preserve_unknown_fields(_: &mut SchemaGenerator) -> Schema {
    let mut schema = SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        ..Default::default()
    };
    schema.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    Schema::Object(schema)
}
