//! 集群网关
//!
//! 协调器通过 `ClusterGateway` 对子资源执行创建、替换、删除。
//! 生产实现 `KubeGateway` 基于 kube-rs 的 `Api<K>`，测试中使用 mock。

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use tracing::debug;

use crate::error::GatewayError;
use crate::resources::{ChildResource, ResourceKind, MANAGED_BY};

/// 集群网关契约
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterGateway: Send + Sync {
    /// 创建子资源
    async fn create_resource(
        &self,
        namespace: &str,
        resource: &ChildResource,
    ) -> Result<(), GatewayError>;

    /// 按名称整体替换子资源
    async fn replace_resource(
        &self,
        name: &str,
        namespace: &str,
        resource: &ChildResource,
    ) -> Result<(), GatewayError>;

    /// 按名称删除子资源
    async fn delete_resource(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
    ) -> Result<(), GatewayError>;
}

/// 基于 kube-rs 的集群网关
#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
}

impl KubeGateway {
    /// 创建新的网关
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(MANAGED_BY.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ClusterGateway for KubeGateway {
    async fn create_resource(
        &self,
        namespace: &str,
        resource: &ChildResource,
    ) -> Result<(), GatewayError> {
        debug!("创建 {} {}/{}", resource.kind(), namespace, resource.name());

        let pp = Self::post_params();
        let result = match resource {
            ChildResource::Deployment(d) => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                api.create(&pp, d).await.map(|_| ())
            }
            ChildResource::Service(s) => {
                let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
                api.create(&pp, s).await.map(|_| ())
            }
            ChildResource::ConfigMap(c) => {
                let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
                api.create(&pp, c).await.map(|_| ())
            }
        };

        result.map_err(|e| map_kube_error(e, resource.kind(), resource.name()))
    }

    async fn replace_resource(
        &self,
        name: &str,
        namespace: &str,
        resource: &ChildResource,
    ) -> Result<(), GatewayError> {
        debug!("替换 {} {}/{}", resource.kind(), namespace, name);

        let pp = Self::post_params();
        let result = match resource {
            ChildResource::Deployment(d) => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                api.replace(name, &pp, d).await.map(|_| ())
            }
            ChildResource::Service(s) => {
                let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
                api.replace(name, &pp, s).await.map(|_| ())
            }
            ChildResource::ConfigMap(c) => {
                let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
                api.replace(name, &pp, c).await.map(|_| ())
            }
        };

        result.map_err(|e| map_kube_error(e, resource.kind(), name))
    }

    async fn delete_resource(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
    ) -> Result<(), GatewayError> {
        debug!("删除 {} {}/{}", kind, namespace, name);

        let dp = DeleteParams::default();
        let result = match kind {
            ResourceKind::Deployment => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                api.delete(name, &dp).await.map(|_| ())
            }
            ResourceKind::Service => {
                let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
                api.delete(name, &dp).await.map(|_| ())
            }
            ResourceKind::ConfigMap => {
                let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
                api.delete(name, &dp).await.map(|_| ())
            }
        };

        result.map_err(|e| map_kube_error(e, kind, name))
    }
}

/// 将 kube 错误归类为网关错误
///
/// 409 只有在 reason 为 AlreadyExists 时才算已存在；版本冲突等其他 409 视为临时错误。
pub fn map_kube_error(error: kube::Error, kind: ResourceKind, name: &str) -> GatewayError {
    match error {
        kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
            GatewayError::AlreadyExists {
                kind,
                name: name.to_string(),
            }
        }
        kube::Error::Api(ae) if ae.code == 404 => GatewayError::NotFound {
            kind,
            name: name.to_string(),
        },
        other => GatewayError::Transient(other.to_string()),
    }
}
