//! 统一可观测性模块
//!
//! 提供 logging 与 metrics 的统一初始化。
//! 规则引擎本身只依赖 `tracing` / `metrics` 门面，嵌入方通过此模块决定输出方式。

pub mod metrics;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;

pub use crate::config::ObservabilityConfig;

/// 可观测性资源守卫
///
/// 持有 Prometheus 渲染句柄（启用指标时），供嵌入方导出当前指标快照。
pub struct ObservabilityGuard {
    metrics_handle: Option<metrics::MetricsHandle>,
}

impl ObservabilityGuard {
    /// 创建一个空的 Guard（用于测试或禁用可观测性时）
    pub fn empty() -> Self {
        Self {
            metrics_handle: None,
        }
    }

    /// 渲染 Prometheus 文本格式的指标快照
    pub fn render_metrics(&self) -> Option<String> {
        self.metrics_handle.as_ref().map(|h| h.render())
    }
}

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. Tracing（日志）
/// 2. Metrics（仅在 `metrics_enabled` 时安装 Prometheus recorder）
///
/// # Example
///
/// ```ignore
/// use veritas_shared::config::AppConfig;
/// use veritas_shared::observability;
///
/// let config = AppConfig::load("veritas")?;
/// let _guard = observability::init(&config.observability())?;
/// ```
pub fn init(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    tracing::init(config)?;

    let metrics_handle = if config.metrics_enabled {
        Some(metrics::init(config)?)
    } else {
        None
    };

    info!(
        service = %config.service_name,
        log_format = %config.log_format,
        metrics_enabled = config.metrics_enabled,
        "Observability initialized"
    );

    Ok(ObservabilityGuard { metrics_handle })
}
