//! 组件注册表配置加载
//!
//! 支持 YAML/JSON 格式的注册表文件，格式如下：
//!
//! ```yaml
//! components:
//!   - name: web
//!     replicas: 2
//!   - name: admin
//!     image: plane-admin:1.2.0
//! ```
//!
//! 未指定 `replicas` 时默认 1，未指定 `image` 时默认 `<name>:latest`。

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::component::{ComponentDescriptor, ComponentRegistry};

/// 注册表文件结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryFile {
    /// 组件列表，顺序即协调顺序
    pub components: Vec<ComponentEntry>,
}

/// 注册表文件中的单个组件条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentEntry {
    /// 组件名称
    pub name: String,
    /// 默认副本数
    #[serde(default)]
    pub replicas: Option<i32>,
    /// 默认镜像
    #[serde(default)]
    pub image: Option<String>,
}

impl From<ComponentEntry> for ComponentDescriptor {
    fn from(entry: ComponentEntry) -> Self {
        let descriptor = ComponentDescriptor::new(entry.name, entry.replicas.unwrap_or(1));
        match entry.image {
            Some(image) => descriptor.with_image(image),
            None => descriptor,
        }
    }
}

impl ComponentRegistry {
    /// 从 YAML/JSON 文件加载组件注册表
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // 确定配置文件格式
        let format = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => {
                return Err(Error::Config(format!(
                    "不支持的注册表文件格式，仅支持 YAML 或 JSON: {}",
                    path.display()
                )))
            }
        };

        let config = Config::builder()
            .add_source(File::from(path).format(format))
            .build()?;

        let file = config.try_deserialize::<RegistryFile>()?;
        debug!("注册表文件 {} 包含 {} 个组件", path.display(), file.components.len());

        let registry = Self::try_from(file)?;
        info!("已从 {} 加载组件注册表", path.display());

        Ok(registry)
    }
}

impl TryFrom<RegistryFile> for ComponentRegistry {
    type Error = Error;

    fn try_from(file: RegistryFile) -> Result<Self> {
        ComponentRegistry::new(file.components.into_iter().map(Into::into).collect())
    }
}

/// 按需加载注册表：未提供路径时使用内置组件表
pub fn load_registry(path: Option<&Path>) -> Result<ComponentRegistry> {
    match path {
        Some(path) => ComponentRegistry::from_file(path),
        None => {
            info!("未指定注册表文件，使用内置组件表");
            Ok(ComponentRegistry::builtin())
        }
    }
}
