//! 资源协调模块
//!
//! 该模块实现 Plane 的三个生命周期处理器：创建、更新、删除。
//! 每次调用都是无状态的，按注册表顺序逐个组件处理，期间不做任何并行。
//!
//! - 创建/更新：第一次失败即中止本次调用，返回带固定延迟的可重试错误，已完成的部分不回滚。
//! - 删除：尽力而为，每个失败只记录警告，继续清理其余子资源。

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use plane_common::ComponentRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::crd::PlaneCESpec;
use crate::error::{GatewayError, OperatorError, Result};
use crate::gateway::ClusterGateway;
use crate::resources::{
    child_name, config_map_name, ChildResource, ComponentResources, ResourceBuilder, ResourceKind,
};
use crate::spec::{normalize, PlaneSpec};

/// 创建/更新失败后的默认重试延迟
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// 协调器结构体
pub struct Reconciler {
    /// 集群网关
    gateway: Arc<dyn ClusterGateway>,
    /// 组件注册表
    registry: Arc<ComponentRegistry>,
    /// 可重试错误携带的延迟
    retry_delay: Duration,
}

/// 删除结果
#[derive(Debug, Default)]
pub struct DeletionReport {
    /// 已请求删除的子资源
    pub attempted: Vec<(ResourceKind, String)>,
    /// 删除失败的子资源
    pub failed: Vec<(ResourceKind, String, GatewayError)>,
}

impl DeletionReport {
    /// 是否全部删除成功
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Reconciler {
    /// 创建新的协调器
    pub fn new(gateway: Arc<dyn ClusterGateway>, registry: Arc<ComponentRegistry>) -> Self {
        Self {
            gateway,
            registry,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// 设置重试延迟
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// 获取组件注册表
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// 处理创建事件
    ///
    /// 顺序：先创建共享 ConfigMap，再按组件依次创建 Deployment 和 Service。
    pub async fn on_create(
        &self,
        raw: &PlaneCESpec,
        name: &str,
        namespace: &str,
        owner: Option<OwnerReference>,
    ) -> Result<()> {
        info!("创建 Plane {}/{}", namespace, name);
        self.warn_legacy_fields(raw, name, namespace);

        let spec = normalize(raw, &self.registry);
        let builder = self.builder(&spec, name, namespace, owner)?;

        // 共享 ConfigMap 先于工作负载创建
        self.create_child(namespace, ChildResource::ConfigMap(builder.build_configmap()))
            .await?;

        // 按注册表顺序逐个组件创建 Deployment 和 Service
        for component in self.registry.iter() {
            let ComponentResources {
                deployment,
                service,
            } = builder.build_component(component);

            self.create_child(namespace, ChildResource::Deployment(deployment))
                .await?;
            self.create_child(namespace, ChildResource::Service(service))
                .await?;
        }

        info!(
            "Plane {}/{} 的 {} 个组件已创建",
            namespace,
            name,
            self.registry.len()
        );
        Ok(())
    }

    /// 处理更新事件
    ///
    /// 只替换 ConfigMap 和各组件的 Deployment；Service 不会被更新，
    /// 端口或选择器变化需要手动删除重建。
    pub async fn on_update(
        &self,
        raw: &PlaneCESpec,
        name: &str,
        namespace: &str,
        owner: Option<OwnerReference>,
    ) -> Result<()> {
        info!("更新 Plane {}/{}", namespace, name);
        self.warn_legacy_fields(raw, name, namespace);

        let spec = normalize(raw, &self.registry);
        let builder = self.builder(&spec, name, namespace, owner)?;

        // 替换共享 ConfigMap
        self.replace_child(namespace, ChildResource::ConfigMap(builder.build_configmap()))
            .await?;

        // 只替换 Deployment，Service 保持不变
        for component in self.registry.iter() {
            let deployment = builder.build_deployment(component);
            self.replace_child(namespace, ChildResource::Deployment(deployment))
                .await?;
        }

        info!("Plane {}/{} 已更新", namespace, name);
        Ok(())
    }

    /// 处理删除事件
    ///
    /// 从不返回错误：某个子资源删除失败不会阻塞其余子资源的清理。
    pub async fn on_delete(&self, name: &str, namespace: &str) -> DeletionReport {
        info!("删除 Plane {}/{}", namespace, name);

        let mut report = DeletionReport::default();

        // 先删除各组件的工作负载，最后删除共享 ConfigMap
        for component in self.registry.iter() {
            let child = child_name(name, &component.name);
            self.delete_child(ResourceKind::Deployment, &child, namespace, &mut report)
                .await;
            self.delete_child(ResourceKind::Service, &child, namespace, &mut report)
                .await;
        }

        self.delete_child(
            ResourceKind::ConfigMap,
            &config_map_name(name),
            namespace,
            &mut report,
        )
        .await;

        if report.is_clean() {
            info!("Plane {}/{} 的子资源已全部删除", namespace, name);
        } else {
            warn!(
                "Plane {}/{} 清理完成，{} 个子资源删除失败",
                namespace,
                name,
                report.failed.len()
            );
        }

        report
    }

    async fn create_child(&self, namespace: &str, resource: ChildResource) -> Result<()> {
        let kind = resource.kind();

        match self.gateway.create_resource(namespace, &resource).await {
            Ok(()) => {
                info!("{} {}/{} 已创建", kind, namespace, resource.name());
                Ok(())
            }
            Err(GatewayError::AlreadyExists { .. }) if kind == ResourceKind::Service => {
                debug!("{} {}/{} 已存在，跳过", kind, namespace, resource.name());
                Ok(())
            }
            Err(GatewayError::AlreadyExists { .. }) => {
                // 上次创建中途失败后期望状态可能已变化，用最新内容覆盖
                debug!("{} {}/{} 已存在，改为更新", kind, namespace, resource.name());
                self.gateway
                    .replace_resource(resource.name(), namespace, &resource)
                    .await
                    .map_err(|e| {
                        self.retryable(format!(
                            "更新 {} {}/{} 失败: {}",
                            kind,
                            namespace,
                            resource.name(),
                            e
                        ))
                    })?;
                info!("{} {}/{} 已更新", kind, namespace, resource.name());
                Ok(())
            }
            Err(e) => Err(self.retryable(format!(
                "创建 {} {}/{} 失败: {}",
                kind,
                namespace,
                resource.name(),
                e
            ))),
        }
    }

    async fn replace_child(&self, namespace: &str, resource: ChildResource) -> Result<()> {
        let kind = resource.kind();
        let name = resource.name().to_string();

        match self.gateway.replace_resource(&name, namespace, &resource).await {
            Ok(()) => {
                info!("{} {}/{} 已更新", kind, namespace, name);
                Ok(())
            }
            Err(GatewayError::NotFound { .. }) => {
                warn!("{} {}/{} 不存在，改为创建", kind, namespace, name);
                self.create_child(namespace, resource).await
            }
            Err(e) => Err(self.retryable(format!(
                "更新 {} {}/{} 失败: {}",
                kind, namespace, name, e
            ))),
        }
    }

    async fn delete_child(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
        report: &mut DeletionReport,
    ) {
        report.attempted.push((kind, name.to_string()));

        match self.gateway.delete_resource(kind, name, namespace).await {
            Ok(()) => info!("{} {}/{} 已删除", kind, namespace, name),
            Err(e) => {
                warn!("删除 {} {}/{} 失败: {}", kind, namespace, name, e);
                report.failed.push((kind, name.to_string(), e));
            }
        }
    }

    fn builder<'a>(
        &self,
        spec: &'a PlaneSpec,
        name: &'a str,
        namespace: &'a str,
        owner: Option<OwnerReference>,
    ) -> Result<ResourceBuilder<'a>> {
        ResourceBuilder::new(spec, name, namespace)
            .map(|builder| builder.with_owner(owner))
            .map_err(|e| {
                self.retryable(format!(
                    "Plane {}/{} 的 resources 无法解析: {}",
                    namespace, name, e
                ))
            })
    }

    fn retryable(&self, message: String) -> OperatorError {
        OperatorError::temporary(message, self.retry_delay)
    }

    fn warn_legacy_fields(&self, raw: &PlaneCESpec, name: &str, namespace: &str) {
        let legacy = raw.legacy_fields();
        if !legacy.is_empty() {
            warn!(
                "Plane {}/{} 设置了旧版字段 {:?}，多组件模式下将被忽略",
                namespace, name, legacy
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockClusterGateway;
    use async_trait::async_trait;
    use k8s_openapi::api::apps::v1::Deployment;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum Call {
        Create(ResourceKind, String),
        Replace(ResourceKind, String),
        Delete(ResourceKind, String),
    }

    fn create(kind: ResourceKind, name: &str) -> Call {
        Call::Create(kind, name.to_string())
    }

    fn replace(kind: ResourceKind, name: &str) -> Call {
        Call::Replace(kind, name.to_string())
    }

    fn delete(kind: ResourceKind, name: &str) -> Call {
        Call::Delete(kind, name.to_string())
    }

    /// 记录每一次调用的网关，可按调用注入失败
    #[derive(Default)]
    struct RecordingGateway {
        calls: Mutex<Vec<Call>>,
        bodies: Mutex<Vec<ChildResource>>,
        failures: HashMap<Call, GatewayError>,
    }

    impl RecordingGateway {
        fn fail_on(mut self, call: Call, error: GatewayError) -> Self {
            self.failures.insert(call, error);
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn bodies(&self) -> Vec<ChildResource> {
            self.bodies.lock().unwrap().clone()
        }

        fn record(&self, call: Call, body: Option<&ChildResource>) -> std::result::Result<(), GatewayError> {
            self.calls.lock().unwrap().push(call.clone());
            if let Some(body) = body {
                self.bodies.lock().unwrap().push(body.clone());
            }
            match self.failures.get(&call) {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl ClusterGateway for RecordingGateway {
        async fn create_resource(
            &self,
            _namespace: &str,
            resource: &ChildResource,
        ) -> std::result::Result<(), GatewayError> {
            self.record(create(resource.kind(), resource.name()), Some(resource))
        }

        async fn replace_resource(
            &self,
            name: &str,
            _namespace: &str,
            resource: &ChildResource,
        ) -> std::result::Result<(), GatewayError> {
            self.record(replace(resource.kind(), name), Some(resource))
        }

        async fn delete_resource(
            &self,
            kind: ResourceKind,
            name: &str,
            _namespace: &str,
        ) -> std::result::Result<(), GatewayError> {
            self.record(delete(kind, name), None)
        }
    }

    fn reconciler(gateway: Arc<dyn ClusterGateway>) -> Reconciler {
        Reconciler::new(gateway, Arc::new(ComponentRegistry::builtin()))
    }

    fn transient() -> GatewayError {
        GatewayError::Transient("connection reset".to_string())
    }

    fn deployments(bodies: &[ChildResource]) -> Vec<Deployment> {
        bodies
            .iter()
            .filter_map(|body| match body {
                ChildResource::Deployment(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }

    #[test_log::test(tokio::test)]
    async fn test_create_order() {
        let gateway = Arc::new(RecordingGateway::default());
        reconciler(gateway.clone())
            .on_create(&PlaneCESpec::default(), "plane", "apps", None)
            .await
            .unwrap();

        let mut expected = vec![create(ResourceKind::ConfigMap, "plane-config")];
        for component in ["web", "space", "live", "api", "worker", "beat-worker"] {
            let name = format!("plane-{component}");
            expected.push(create(ResourceKind::Deployment, &name));
            expected.push(create(ResourceKind::Service, &name));
        }
        assert_eq!(gateway.calls(), expected);
    }

    #[tokio::test]
    async fn test_create_defaults_from_empty_spec() {
        let gateway = Arc::new(RecordingGateway::default());
        reconciler(gateway.clone())
            .on_create(&PlaneCESpec::default(), "plane", "apps", None)
            .await
            .unwrap();

        let table: Vec<(String, i32, String)> = deployments(&gateway.bodies())
            .into_iter()
            .map(|d| {
                let spec = d.spec.unwrap();
                let pod = spec.template.spec.unwrap();
                (
                    d.metadata.name.unwrap(),
                    spec.replicas.unwrap(),
                    pod.containers[0].image.clone().unwrap(),
                )
            })
            .collect();

        assert_eq!(
            table,
            vec![
                ("plane-web".to_string(), 2, "web:latest".to_string()),
                ("plane-space".to_string(), 1, "space:latest".to_string()),
                ("plane-live".to_string(), 1, "live:latest".to_string()),
                ("plane-api".to_string(), 2, "api:latest".to_string()),
                ("plane-worker".to_string(), 2, "worker:latest".to_string()),
                ("plane-beat-worker".to_string(), 1, "beat-worker:latest".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_propagates_config() {
        let gateway = Arc::new(RecordingGateway::default());
        let raw: PlaneCESpec = serde_json::from_value(json!({
            "config": {"LOG_LEVEL": "debug", "MAX_CONNS": 10}
        }))
        .unwrap();

        reconciler(gateway.clone())
            .on_create(&raw, "plane", "apps", None)
            .await
            .unwrap();

        let bodies = gateway.bodies();
        for deployment in deployments(&bodies) {
            let pod = deployment.spec.unwrap().template.spec.unwrap();
            let env: Vec<(String, Option<String>)> = pod.containers[0]
                .env
                .clone()
                .unwrap()
                .into_iter()
                .map(|e| (e.name, e.value))
                .collect();
            assert_eq!(
                env,
                vec![
                    ("LOG_LEVEL".to_string(), Some("debug".to_string())),
                    ("MAX_CONNS".to_string(), Some("10".to_string())),
                ]
            );
        }

        let configmap = bodies
            .iter()
            .find_map(|body| match body {
                ChildResource::ConfigMap(c) => Some(c.clone()),
                _ => None,
            })
            .unwrap();
        let data = configmap.data.unwrap();
        assert_eq!(data.get("LOG_LEVEL").map(String::as_str), Some("debug"));
        assert_eq!(data.get("MAX_CONNS").map(String::as_str), Some("10"));
        assert_eq!(data.len(), 2);
    }

    #[tokio::test]
    async fn test_create_aborts_on_third_component() {
        let gateway = Arc::new(
            RecordingGateway::default()
                .fail_on(create(ResourceKind::Deployment, "plane-live"), transient()),
        );

        let err = reconciler(gateway.clone())
            .on_create(&PlaneCESpec::default(), "plane", "apps", None)
            .await
            .unwrap_err();

        assert_eq!(err.requeue_delay(), Some(Duration::from_secs(30)));
        assert!(err.to_string().contains("plane-live"));
        assert_eq!(
            gateway.calls(),
            vec![
                create(ResourceKind::ConfigMap, "plane-config"),
                create(ResourceKind::Deployment, "plane-web"),
                create(ResourceKind::Service, "plane-web"),
                create(ResourceKind::Deployment, "plane-space"),
                create(ResourceKind::Service, "plane-space"),
                create(ResourceKind::Deployment, "plane-live"),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_configmap_failure_stops_before_workloads() {
        let gateway = Arc::new(
            RecordingGateway::default()
                .fail_on(create(ResourceKind::ConfigMap, "plane-config"), transient()),
        );

        let err = reconciler(gateway.clone())
            .on_create(&PlaneCESpec::default(), "plane", "apps", None)
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(gateway.calls(), vec![create(ResourceKind::ConfigMap, "plane-config")]);
    }

    #[tokio::test]
    async fn test_create_skips_existing_service() {
        let gateway = Arc::new(RecordingGateway::default().fail_on(
            create(ResourceKind::Service, "plane-web"),
            GatewayError::AlreadyExists {
                kind: ResourceKind::Service,
                name: "plane-web".to_string(),
            },
        ));

        reconciler(gateway.clone())
            .on_create(&PlaneCESpec::default(), "plane", "apps", None)
            .await
            .unwrap();

        let calls = gateway.calls();
        assert_eq!(calls.len(), 13);
        assert!(!calls.iter().any(|call| matches!(call, Call::Replace(..))));
    }

    #[test_log::test(tokio::test)]
    async fn test_create_overwrites_existing_deployment_with_new_image() {
        let mut gateway = MockClusterGateway::new();
        gateway.expect_create_resource().returning(|_, resource| {
            if resource.kind() == ResourceKind::Deployment && resource.name() == "plane-web" {
                Err(GatewayError::AlreadyExists {
                    kind: ResourceKind::Deployment,
                    name: "plane-web".to_string(),
                })
            } else {
                Ok(())
            }
        });
        gateway
            .expect_replace_resource()
            .withf(|name, namespace, resource| {
                let image = match resource {
                    ChildResource::Deployment(d) => d
                        .spec
                        .as_ref()
                        .and_then(|spec| spec.template.spec.as_ref())
                        .and_then(|pod| pod.containers[0].image.clone()),
                    _ => None,
                };
                name == "plane-web" && namespace == "apps" && image.as_deref() == Some("web:v2")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let raw = PlaneCESpec {
            web_image: Some("web:v2".to_string()),
            ..Default::default()
        };

        reconciler(Arc::new(gateway))
            .on_create(&raw, "plane", "apps", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_existing_configmap_replace_failure_is_retryable() {
        let gateway = Arc::new(
            RecordingGateway::default()
                .fail_on(
                    create(ResourceKind::ConfigMap, "plane-config"),
                    GatewayError::AlreadyExists {
                        kind: ResourceKind::ConfigMap,
                        name: "plane-config".to_string(),
                    },
                )
                .fail_on(replace(ResourceKind::ConfigMap, "plane-config"), transient()),
        );

        let err = reconciler(gateway.clone())
            .on_create(&PlaneCESpec::default(), "plane", "apps", None)
            .await
            .unwrap_err();

        assert_eq!(err.requeue_delay(), Some(DEFAULT_RETRY_DELAY));
        assert_eq!(
            gateway.calls(),
            vec![
                create(ResourceKind::ConfigMap, "plane-config"),
                replace(ResourceKind::ConfigMap, "plane-config"),
            ]
        );
    }

    #[tokio::test]
    async fn test_unparseable_resources_fail_before_any_call() {
        let gateway = Arc::new(RecordingGateway::default());
        let raw: PlaneCESpec = serde_json::from_value(json!({
            "resources": {"limits": "lots"}
        }))
        .unwrap();

        let err = reconciler(gateway.clone())
            .on_create(&raw, "plane", "apps", None)
            .await
            .unwrap_err();

        assert_eq!(err.requeue_delay(), Some(DEFAULT_RETRY_DELAY));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_integer_quantity_reaches_containers() {
        let gateway = Arc::new(RecordingGateway::default());
        let raw: PlaneCESpec = serde_json::from_value(json!({
            "resources": {"limits": {"cpu": 1}}
        }))
        .unwrap();

        reconciler(gateway.clone())
            .on_create(&raw, "plane", "apps", None)
            .await
            .unwrap();

        for deployment in deployments(&gateway.bodies()) {
            let pod = deployment.spec.unwrap().template.spec.unwrap();
            let limits = pod.containers[0].resources.clone().unwrap().limits.unwrap();
            assert_eq!(limits["cpu"].0, "1");
        }
    }

    #[tokio::test]
    async fn test_custom_retry_delay() {
        let gateway = Arc::new(
            RecordingGateway::default()
                .fail_on(replace(ResourceKind::ConfigMap, "plane-config"), transient()),
        );

        let err = reconciler(gateway)
            .with_retry_delay(Duration::from_secs(5))
            .on_update(&PlaneCESpec::default(), "plane", "apps", None)
            .await
            .unwrap_err();

        assert_eq!(err.requeue_delay(), Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_update_replaces_configmap_and_deployments_only() {
        let gateway = Arc::new(RecordingGateway::default());
        reconciler(gateway.clone())
            .on_update(&PlaneCESpec::default(), "plane", "apps", None)
            .await
            .unwrap();

        let mut expected = vec![replace(ResourceKind::ConfigMap, "plane-config")];
        for component in ["web", "space", "live", "api", "worker", "beat-worker"] {
            expected.push(replace(ResourceKind::Deployment, &format!("plane-{component}")));
        }
        assert_eq!(gateway.calls(), expected);
    }

    #[tokio::test]
    async fn test_update_never_replaces_services() {
        let mut gateway = MockClusterGateway::new();
        gateway
            .expect_replace_resource()
            .withf(|_, _, resource| resource.kind() != ResourceKind::Service)
            .times(7)
            .returning(|_, _, _| Ok(()));
        gateway.expect_create_resource().never();
        gateway.expect_delete_resource().never();

        let raw = PlaneCESpec {
            api_image: Some("plane/api:2".to_string()),
            ..Default::default()
        };

        reconciler(Arc::new(gateway))
            .on_update(&raw, "plane", "apps", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_aborts_on_first_failure() {
        let gateway = Arc::new(
            RecordingGateway::default()
                .fail_on(replace(ResourceKind::Deployment, "plane-space"), transient()),
        );

        let err = reconciler(gateway.clone())
            .on_update(&PlaneCESpec::default(), "plane", "apps", None)
            .await
            .unwrap_err();

        assert_eq!(err.requeue_delay(), Some(DEFAULT_RETRY_DELAY));
        assert_eq!(
            gateway.calls(),
            vec![
                replace(ResourceKind::ConfigMap, "plane-config"),
                replace(ResourceKind::Deployment, "plane-web"),
                replace(ResourceKind::Deployment, "plane-space"),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_recreates_missing_child() {
        let gateway = Arc::new(RecordingGateway::default().fail_on(
            replace(ResourceKind::Deployment, "plane-web"),
            GatewayError::NotFound {
                kind: ResourceKind::Deployment,
                name: "plane-web".to_string(),
            },
        ));

        reconciler(gateway.clone())
            .on_update(&PlaneCESpec::default(), "plane", "apps", None)
            .await
            .unwrap();

        let calls = gateway.calls();
        assert_eq!(calls[1], replace(ResourceKind::Deployment, "plane-web"));
        assert_eq!(calls[2], create(ResourceKind::Deployment, "plane-web"));
        assert_eq!(calls.len(), 8);
    }

    #[test_log::test(tokio::test)]
    async fn test_delete_is_best_effort() {
        let gateway = Arc::new(
            RecordingGateway::default()
                .fail_on(delete(ResourceKind::Deployment, "plane-api"), transient()),
        );

        let report = reconciler(gateway.clone()).on_delete("plane", "apps").await;

        let calls = gateway.calls();
        assert_eq!(calls.len(), 13);
        assert!(calls.contains(&delete(ResourceKind::Service, "plane-api")));
        assert!(calls.contains(&delete(ResourceKind::Deployment, "plane-worker")));
        assert!(calls.contains(&delete(ResourceKind::Deployment, "plane-beat-worker")));
        assert_eq!(calls.last(), Some(&delete(ResourceKind::ConfigMap, "plane-config")));

        assert!(!report.is_clean());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].1, "plane-api");
        assert_eq!(report.attempted.len(), 13);
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_children() {
        let mut gateway = MockClusterGateway::new();
        gateway
            .expect_delete_resource()
            .times(13)
            .returning(|kind, name, _| {
                Err(GatewayError::NotFound {
                    kind,
                    name: name.to_string(),
                })
            });

        let report = reconciler(Arc::new(gateway)).on_delete("plane", "apps").await;
        assert_eq!(report.failed.len(), 13);
    }

    #[tokio::test]
    async fn test_child_names_follow_convention() {
        let gateway = Arc::new(RecordingGateway::default());
        let reconciler = reconciler(gateway.clone());
        reconciler
            .on_create(&PlaneCESpec::default(), "acme", "apps", None)
            .await
            .unwrap();
        reconciler.on_delete("acme", "apps").await;

        let mut names: Vec<String> = gateway
            .calls()
            .into_iter()
            .map(|call| match call {
                Call::Create(_, name) | Call::Replace(_, name) | Call::Delete(_, name) => name,
            })
            .collect();
        names.sort();
        names.dedup();

        assert_eq!(
            names,
            vec![
                "acme-api",
                "acme-beat-worker",
                "acme-config",
                "acme-live",
                "acme-space",
                "acme-web",
                "acme-worker",
            ]
        );
    }
}
