//! 期望状态规范化
//!
//! 将用户提交的 `PlaneCESpec` 转换为所有字段都已补齐默认值的 `PlaneSpec`。
//! 规范化永不失败，也没有副作用。

use k8s_openapi::api::core::v1::ResourceRequirements;
use plane_common::{ComponentDescriptor, ComponentRegistry};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::crd::PlaneCESpec;

/// 规范化后的期望状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaneSpec {
    /// 组件名 -> 镜像，覆盖注册表中的每个组件
    pub images: BTreeMap<String, String>,
    /// 资源请求与限制，保持用户提交的原样
    pub resources: BTreeMap<String, Value>,
    /// 共享配置
    pub config: BTreeMap<String, Value>,
}

impl PlaneSpec {
    /// 组件镜像；未知组件回退到其默认镜像
    pub fn image_for<'a>(&'a self, component: &'a ComponentDescriptor) -> &'a str {
        self.images
            .get(&component.name)
            .map(String::as_str)
            .unwrap_or(component.image.as_str())
    }

    /// 解析为容器的资源需求
    ///
    /// `limits` 和 `requests` 中的数字按 Kubernetes 的习惯视为数量字符串（`cpu: 1` 即 `"1"`），
    /// 未知的键被忽略。
    pub fn resource_requirements(&self) -> Result<ResourceRequirements, serde_json::Error> {
        let value = self
            .resources
            .iter()
            .map(|(key, value)| (key.clone(), quantities_as_strings(value)))
            .collect::<serde_json::Map<String, Value>>();

        serde_json::from_value(Value::Object(value))
    }

    /// 字符串化后的配置，用于环境变量与 ConfigMap 数据
    pub fn string_config(&self) -> BTreeMap<String, String> {
        stringify_config(&self.config)
    }
}

/// 规范化期望状态文档
pub fn normalize(raw: &PlaneCESpec, registry: &ComponentRegistry) -> PlaneSpec {
    let images = registry
        .iter()
        .map(|component| {
            let image = raw
                .image_for(component)
                .unwrap_or(component.image.as_str())
                .to_string();
            (component.name.clone(), image)
        })
        .collect();

    PlaneSpec {
        images,
        resources: raw.resources.clone().unwrap_or_default(),
        config: raw.config.clone().unwrap_or_default(),
    }
}

fn quantities_as_strings(value: &Value) -> Value {
    match value {
        Value::Object(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, quantity)| {
                    let quantity = match quantity {
                        Value::Number(n) => Value::String(n.to_string()),
                        other => other.clone(),
                    };
                    (key.clone(), quantity)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// 逐项字符串化配置
pub fn stringify_config(config: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
    config
        .iter()
        .map(|(key, value)| (key.clone(), stringify_value(value)))
        .collect()
}

/// 配置值转为字符串
///
/// 这是有损转换：数字和布尔值在此处丢失原始类型。
/// null 变为空字符串，数组和对象变为紧凑 JSON。
pub fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
