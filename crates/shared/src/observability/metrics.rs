//! Prometheus 指标模块
//!
//! 基于 metrics crate 收集规则引擎指标；启用时安装进程内 Prometheus recorder，
//! 由嵌入方决定如何暴露渲染结果。

use anyhow::{Result, anyhow};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use super::ObservabilityConfig;

pub const RULE_EVALUATIONS_TOTAL: &str = "rule_evaluations_total";
pub const RULE_MATCHES_TOTAL: &str = "rule_matches_total";
pub const RULE_EVALUATION_DURATION_SECONDS: &str = "rule_evaluation_duration_seconds";
pub const ACTION_DISPATCHES_TOTAL: &str = "action_dispatches_total";
pub const RULES_LOADED: &str = "rules_loaded";

/// Metrics 句柄
pub struct MetricsHandle {
    handle: PrometheusHandle,
}

impl MetricsHandle {
    /// 渲染 Prometheus 文本格式
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// 安装全局 Prometheus recorder 并注册指标描述
pub fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    metrics::set_global_recorder(recorder)
        .map_err(|_| anyhow!("metrics recorder already installed"))?;

    register_common_metrics(&config.service_name);

    Ok(MetricsHandle { handle })
}

/// 注册规则引擎指标描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        RULE_EVALUATIONS_TOTAL,
        "Total number of rule condition-chain evaluations"
    );
    metrics::describe_counter!(RULE_MATCHES_TOTAL, "Total number of matched rules");
    metrics::describe_histogram!(
        RULE_EVALUATION_DURATION_SECONDS,
        "Duration of one engine evaluate call in seconds"
    );
    metrics::describe_counter!(
        ACTION_DISPATCHES_TOTAL,
        "Total number of action dispatches by action type and status"
    );
    metrics::describe_gauge!(RULES_LOADED, "Number of rules in the active rule set");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录一次规则评估
#[inline]
pub fn record_rule_evaluation(matched: bool) {
    metrics::counter!(RULE_EVALUATIONS_TOTAL, "matched" => matched.to_string()).increment(1);
    if matched {
        metrics::counter!(RULE_MATCHES_TOTAL).increment(1);
    }
}

/// 记录一次 evaluate 调用耗时
#[inline]
pub fn record_evaluation_duration(status: &'static str, duration_secs: f64) {
    metrics::histogram!(RULE_EVALUATION_DURATION_SECONDS, "status" => status)
        .record(duration_secs);
}

/// 记录动作分发
#[inline]
pub fn record_action_dispatch(action_type: &str, status: &'static str) {
    metrics::counter!(
        ACTION_DISPATCHES_TOTAL,
        "action_type" => action_type.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 更新当前规则数量
#[inline]
pub fn set_rules_loaded(count: usize) {
    metrics::gauge!(RULES_LOADED).set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        // 即使没有初始化 recorder，这些函数也不应该 panic
        record_rule_evaluation(true);
        record_rule_evaluation(false);
        record_evaluation_duration("ok", 0.01);
        record_action_dispatch("sendSMS", "success");
        set_rules_loaded(3);
    }
}
