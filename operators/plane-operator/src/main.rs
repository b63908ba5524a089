//! Plane Operator 可执行入口

use anyhow::{Context, Result};
use clap::Parser;
use kube::CustomResourceExt;
use plane_common::load_registry;
use plane_operator::{OperatorOptions, PlaneCE, PlaneOperator};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Plane Kubernetes Operator
#[derive(Parser, Debug)]
#[command(name = "plane-operator")]
#[command(about = "Kubernetes operator for Plane multi-component deployments")]
#[command(version)]
struct Args {
    /// 监听的命名空间（为空表示整个集群）
    #[arg(long, env = "WATCH_NAMESPACE", default_value = "")]
    namespace: String,

    /// 组件注册表文件（YAML 或 JSON），不指定时使用内置组件表
    #[arg(long, env = "PLANE_COMPONENT_REGISTRY")]
    registry: Option<PathBuf>,

    /// 创建/更新失败后的重试延迟（秒）
    #[arg(long, env = "PLANE_RETRY_DELAY_SECS", default_value_t = 30)]
    retry_delay_secs: u64,

    /// 日志过滤指令，例如 info 或 plane_operator=debug
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// 以 JSON 格式输出日志
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    log_json: bool,

    /// 打印 CRD YAML 后退出
    #[arg(long)]
    print_crd: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_crd {
        let crd = serde_yaml::to_string(&PlaneCE::crd()).context("序列化 CRD 失败")?;
        print!("{crd}");
        return Ok(());
    }

    init_logging(&args)?;

    let registry = load_registry(args.registry.as_deref()).context("加载组件注册表失败")?;
    let namespace = if args.namespace.is_empty() {
        None
    } else {
        Some(args.namespace.clone())
    };

    info!(
        "Plane Operator {} 启动，命名空间: {}，组件数: {}",
        env!("CARGO_PKG_VERSION"),
        namespace.as_deref().unwrap_or("全部"),
        registry.len()
    );

    let options = OperatorOptions {
        namespace,
        registry: Arc::new(registry),
        retry_delay: Duration::from_secs(args.retry_delay_secs),
    };

    PlaneOperator::new(options).await?.start().await
}

/// 初始化日志
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_new(&args.log_level)
        .with_context(|| format!("无效的日志级别: {}", args.log_level))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
