//! 组件模型
//!
//! 一个 Plane 应用由若干逻辑组件（web、space、live、api、worker、beat-worker）组成。
//! 每个组件都有固定的默认副本数和默认镜像。组件表在进程启动时加载一次，之后只读共享。

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{Error, Result};

/// ConfigMap 名称后缀，不能再作为组件名使用
pub const CONFIG_SUFFIX: &str = "config";

/// 内置组件表：(名称, 默认副本数)
const BUILTIN_COMPONENTS: [(&str, i32); 6] = [
    ("web", 2),
    ("space", 1),
    ("live", 1),
    ("api", 2),
    ("worker", 2),
    ("beat-worker", 1),
];

static BUILTIN: Lazy<ComponentRegistry> = Lazy::new(|| ComponentRegistry {
    components: BUILTIN_COMPONENTS
        .iter()
        .map(|(name, replicas)| ComponentDescriptor::new(*name, *replicas))
        .collect(),
});

/// 组件描述符
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// 组件名称，同时也是子资源名称的后缀
    pub name: String,
    /// 默认副本数
    pub replicas: i32,
    /// 默认镜像
    pub image: String,
}

impl ComponentDescriptor {
    /// 使用 `<name>:latest` 作为默认镜像创建组件描述符
    pub fn new(name: impl Into<String>, replicas: i32) -> Self {
        let name = name.into();
        let image = default_image(&name);
        Self {
            name,
            replicas,
            image,
        }
    }

    /// 指定默认镜像
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// 期望状态文档中对应的镜像字段名，例如 `beat-worker` -> `beatWorkerImage`
    pub fn image_field(&self) -> String {
        let mut field = String::with_capacity(self.name.len() + 5);
        let mut upper_next = false;
        for c in self.name.chars() {
            if c == '-' {
                upper_next = true;
            } else if upper_next {
                field.extend(c.to_uppercase());
                upper_next = false;
            } else {
                field.push(c);
            }
        }
        field.push_str("Image");
        field
    }

    /// 校验组件定义
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        if self.replicas < 0 {
            return Err(Error::invalid_component(
                &self.name,
                format!("副本数不能为负数: {}", self.replicas),
            ));
        }
        if self.image.trim().is_empty() {
            return Err(Error::invalid_component(&self.name, "镜像不能为空"));
        }
        Ok(())
    }
}

impl fmt::Display for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// 组件注册表
///
/// 保持声明顺序：协调器按此顺序逐个处理组件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRegistry {
    components: Vec<ComponentDescriptor>,
}

impl ComponentRegistry {
    /// 内置的六组件注册表
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// 从组件列表创建注册表，并执行校验
    pub fn new(components: Vec<ComponentDescriptor>) -> Result<Self> {
        if components.is_empty() {
            return Err(Error::Config("组件注册表不能为空".to_string()));
        }

        let mut seen = HashSet::new();
        for component in &components {
            component.validate()?;
            if !seen.insert(component.name.as_str()) {
                return Err(Error::invalid_component(&component.name, "组件名称重复"));
            }
        }

        Ok(Self { components })
    }

    /// 按声明顺序遍历组件
    pub fn iter(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.components.iter()
    }

    /// 按名称查找组件
    pub fn get(&self, name: &str) -> Option<&ComponentDescriptor> {
        self.components.iter().find(|c| c.name == name)
    }

    /// 组件数量
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// 注册表是否为空
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl<'a> IntoIterator for &'a ComponentRegistry {
    type Item = &'a ComponentDescriptor;
    type IntoIter = std::slice::Iter<'a, ComponentDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

/// 组件的默认镜像
pub fn default_image(name: &str) -> String {
    format!("{name}:latest")
}

/// 组件名必须是合法的 DNS-1123 标签，且不能与 ConfigMap 后缀冲突
/// DNS-1123 标签长度上限
const MAX_NAME_LEN: usize = 63;

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_component(name, "名称不能为空"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::invalid_component(
            name,
            format!("名称长度不能超过 {} 个字符", MAX_NAME_LEN),
        ));
    }
    if name == CONFIG_SUFFIX {
        return Err(Error::invalid_component(name, "名称 config 已保留给共享 ConfigMap"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(Error::invalid_component(name, "名称只能包含小写字母、数字和 '-'"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(Error::invalid_component(name, "名称不能以 '-' 开头或结尾"));
    }
    Ok(())
}
