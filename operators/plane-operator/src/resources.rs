//! Kubernetes 资源构建
//!
//! 从规范化后的 `PlaneSpec` 派生子资源：每个组件一个 Deployment 和一个 Service，
//! 外加一个所有组件共享的 ConfigMap。构建过程是纯函数，不感知集群当前状态。
//!
//! 命名约定：组件 `c` 的子资源名为 `{name}-{c}`，共享 ConfigMap 名为 `{name}-config`。

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements, Service,
    ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use plane_common::{ComponentDescriptor, CONFIG_SUFFIX};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::spec::{stringify_config, PlaneSpec};

/// Service 对外端口
pub const SERVICE_PORT: i32 = 80;

/// 容器端口
pub const CONTAINER_PORT: i32 = 8080;

/// 写入 `app.kubernetes.io/managed-by` 的值
pub const MANAGED_BY: &str = "plane-operator";

/// 子资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Deployment,
    Service,
    ConfigMap,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Deployment => write!(f, "Deployment"),
            ResourceKind::Service => write!(f, "Service"),
            ResourceKind::ConfigMap => write!(f, "ConfigMap"),
        }
    }
}

/// 派生出的子资源
#[derive(Debug, Clone, PartialEq)]
pub enum ChildResource {
    Deployment(Deployment),
    Service(Service),
    ConfigMap(ConfigMap),
}

impl ChildResource {
    /// 资源类型
    pub fn kind(&self) -> ResourceKind {
        match self {
            ChildResource::Deployment(_) => ResourceKind::Deployment,
            ChildResource::Service(_) => ResourceKind::Service,
            ChildResource::ConfigMap(_) => ResourceKind::ConfigMap,
        }
    }

    /// 资源名称
    pub fn name(&self) -> &str {
        let meta = match self {
            ChildResource::Deployment(d) => &d.metadata,
            ChildResource::Service(s) => &s.metadata,
            ChildResource::ConfigMap(c) => &c.metadata,
        };
        meta.name.as_deref().unwrap_or_default()
    }
}

/// 单个组件的子资源
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentResources {
    pub deployment: Deployment,
    pub service: Service,
}

/// 组件子资源名称
pub fn child_name(plane: &str, component: &str) -> String {
    format!("{plane}-{component}")
}

/// 共享 ConfigMap 名称
pub fn config_map_name(plane: &str) -> String {
    child_name(plane, CONFIG_SUFFIX)
}

/// 子资源构建器
pub struct ResourceBuilder<'a> {
    spec: &'a PlaneSpec,
    name: &'a str,
    namespace: &'a str,
    resources: ResourceRequirements,
    owner: Option<OwnerReference>,
}

impl<'a> ResourceBuilder<'a> {
    /// 创建新的构建器
    ///
    /// `resources` 无法解析为容器资源需求时返回错误。
    pub fn new(
        spec: &'a PlaneSpec,
        name: &'a str,
        namespace: &'a str,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            spec,
            name,
            namespace,
            resources: spec.resource_requirements()?,
            owner: None,
        })
    }

    /// 设置写入每个子资源的属主引用
    pub fn with_owner(mut self, owner: Option<OwnerReference>) -> Self {
        self.owner = owner;
        self
    }

    /// 构建组件的 Deployment 与 Service
    pub fn build_component(&self, component: &ComponentDescriptor) -> ComponentResources {
        ComponentResources {
            deployment: self.build_deployment(component),
            service: self.build_service(component),
        }
    }

    /// 构建组件 Deployment
    pub fn build_deployment(&self, component: &ComponentDescriptor) -> Deployment {
        let labels = self.component_labels(component);
        let selector = self.selector_labels(component);

        // Pod 模板沿用组件标签，选择器只匹配 app 标签
        Deployment {
            metadata: self.metadata(child_name(self.name, &component.name), labels.clone()),
            spec: Some(DeploymentSpec {
                replicas: Some(component.replicas),
                selector: LabelSelector {
                    match_labels: Some(selector),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![self.build_container(component)],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn build_container(&self, component: &ComponentDescriptor) -> Container {
        // 共享配置同时注入为每个容器的环境变量
        let env = self
            .spec
            .string_config()
            .into_iter()
            .map(|(name, value)| EnvVar {
                name,
                value: Some(value),
                ..Default::default()
            })
            .collect();

        Container {
            name: component.name.clone(),
            image: Some(self.spec.image_for(component).to_string()),
            resources: Some(self.resources.clone()),
            env: Some(env),
            ..Default::default()
        }
    }

    /// 构建组件 Service：所有组件统一暴露 80 -> 8080
    pub fn build_service(&self, component: &ComponentDescriptor) -> Service {
        Service {
            metadata: self.metadata(
                child_name(self.name, &component.name),
                self.component_labels(component),
            ),
            spec: Some(ServiceSpec {
                selector: Some(self.selector_labels(component)),
                ports: Some(vec![ServicePort {
                    protocol: Some("TCP".to_string()),
                    port: SERVICE_PORT,
                    target_port: Some(IntOrString::Int(CONTAINER_PORT)),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// 构建共享 ConfigMap
    pub fn build_configmap(&self) -> ConfigMap {
        let mut configmap = build_configmap(self.name, self.namespace, &self.spec.config);
        // 与工作负载一样挂上属主引用
        configmap.metadata.owner_references = self.owner.clone().map(|owner| vec![owner]);
        configmap
    }

    fn metadata(&self, name: String, labels: BTreeMap<String, String>) -> ObjectMeta {
        ObjectMeta {
            name: Some(name),
            namespace: Some(self.namespace.to_string()),
            labels: Some(labels),
            owner_references: self.owner.clone().map(|owner| vec![owner]),
            ..Default::default()
        }
    }

    fn selector_labels(&self, component: &ComponentDescriptor) -> BTreeMap<String, String> {
        BTreeMap::from([("app".to_string(), child_name(self.name, &component.name))])
    }

    fn component_labels(&self, component: &ComponentDescriptor) -> BTreeMap<String, String> {
        let mut labels = common_labels(self.name, &component.name);
        labels.extend(self.selector_labels(component));
        labels
    }
}

/// 构建共享 ConfigMap，数据为字符串化后的配置
pub fn build_configmap(name: &str, namespace: &str, config: &BTreeMap<String, Value>) -> ConfigMap {
    let mut labels = common_labels(name, CONFIG_SUFFIX);
    labels.insert("app".to_string(), name.to_string());

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(config_map_name(name)),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        data: Some(stringify_config(config)),
        ..Default::default()
    }
}

fn common_labels(name: &str, component: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app.kubernetes.io/name".to_string(), "plane".to_string()),
        ("app.kubernetes.io/instance".to_string(), name.to_string()),
        ("app.kubernetes.io/component".to_string(), component.to_string()),
        ("app.kubernetes.io/managed-by".to_string(), MANAGED_BY.to_string()),
    ])
}
