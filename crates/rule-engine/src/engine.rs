//! 规则引擎
//!
//! 持有规则集与动作处理器注册表。对每条输入记录按加载顺序评估全部规则，
//! 命中即分发动作；任何错误都会立即终止本次评估。

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};
use veritas_shared::config::EngineConfig;
use veritas_shared::observability::metrics as engine_metrics;

use crate::compiler::RuleCompiler;
use crate::dispatcher::{ActionHandler, HandlerRegistry, HandlerResult};
use crate::error::{Result, RuleError};
use crate::executor::RuleExecutor;
use crate::models::{
    ActionParams, EvaluationResult, EvaluationSummary, InputRecord, Rule, RuleDefinition,
};

/// 规则引擎
///
/// 引擎内部不加锁：加载与注册需要 `&mut self`，评估只需要 `&self`。
/// 需要在评估流量进行中修改规则或处理器时，使用
/// [`SharedRuleEngine`](crate::store::SharedRuleEngine)。
#[derive(Clone, Default)]
pub struct RuleEngine {
    rules: Vec<Rule>,
    registry: HandlerRegistry,
    executor: RuleExecutor,
    compiler: RuleCompiler,
    /// 规则集版本，每次成功加载递增
    generation: u64,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用自定义执行器（追踪、路径解析器）
    pub fn with_executor(mut self, executor: RuleExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// 按配置创建引擎，配置了 rules_path 时立即加载规则文件
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let executor = if config.trace_enabled {
            RuleExecutor::new().with_trace()
        } else {
            RuleExecutor::new()
        };

        let mut engine = Self::new().with_executor(executor);
        if let Some(path) = &config.rules_path {
            engine.load_rules_from_file(path)?;
        }
        Ok(engine)
    }

    // ==================== 规则加载 ====================

    /// 加载规则集，整体替换已加载的规则
    ///
    /// 所有定义校验通过后才会替换；失败时保留原有规则集。
    #[instrument(skip(self, definitions), fields(count = definitions.len()))]
    pub fn load_rules(&mut self, definitions: Vec<RuleDefinition>) -> Result<()> {
        let rules = self.compiler.compile_all(definitions).inspect_err(|e| {
            warn!(error = %e, "规则集加载失败，保留原有规则");
        })?;
        self.replace_rules(rules);
        Ok(())
    }

    /// 从 JSON 数组加载规则集
    #[instrument(skip(self, json))]
    pub fn load_rules_from_json(&mut self, json: &str) -> Result<()> {
        let definitions = self.compiler.parse_definitions(json)?;
        self.load_rules(definitions)
    }

    /// 从 JSON 文件加载规则集
    pub fn load_rules_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RuleError::RuleLoad(format!("无法读取规则文件 {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "从文件加载规则");
        self.load_rules_from_json(&json)
    }

    fn replace_rules(&mut self, rules: Vec<Rule>) {
        self.rules = rules;
        self.generation += 1;
        engine_metrics::set_rules_loaded(self.rules.len());
        info!(
            rules_count = self.rules.len(),
            generation = self.generation,
            "规则集已加载"
        );
    }

    // ==================== 处理器注册 ====================

    /// 注册动作处理器（闭包），同类型的已有处理器会被覆盖
    pub fn register_action_handler<F>(&mut self, action_type: impl Into<String>, handler: F)
    where
        F: Fn(&ActionParams) -> HandlerResult + Send + Sync + 'static,
    {
        self.registry.register(action_type, Arc::new(handler));
    }

    /// 注册实现了 [`ActionHandler`] 的处理器
    pub fn register_handler(
        &mut self,
        action_type: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) {
        self.registry.register(action_type, handler);
    }

    // ==================== 评估 ====================

    /// 对输入记录评估全部规则
    ///
    /// 1. 校验前置条件：已加载规则且至少注册了一个处理器
    /// 2. 按加载顺序评估每条规则，命中则分发其动作
    /// 3. 第一个错误立即返回，之后的规则不再评估；已执行的动作不会回滚
    #[instrument(skip(self, input), fields(generation = self.generation))]
    pub fn evaluate(&self, input: &InputRecord) -> Result<EvaluationSummary> {
        self.validate_prerequisites()?;
        self.evaluate_unchecked(input)
    }

    /// 解码 JSON 输入后评估
    ///
    /// 前置条件先于输入解码校验。
    #[instrument(skip(self, json), fields(generation = self.generation))]
    pub fn evaluate_json(&self, json: &str) -> Result<EvaluationSummary> {
        self.validate_prerequisites()?;
        let input = InputRecord::from_json(json)?;
        self.evaluate_unchecked(&input)
    }

    fn evaluate_unchecked(&self, input: &InputRecord) -> Result<EvaluationSummary> {
        let start = Instant::now();
        let outcome = self.evaluate_rules(input);
        let status = if outcome.is_ok() { "ok" } else { "error" };
        engine_metrics::record_evaluation_duration(status, start.elapsed().as_secs_f64());

        outcome
    }

    /// 单独评估一条规则的条件链，不分发动作
    pub fn evaluate_rule(&self, rule: &Rule, input: &InputRecord) -> Result<EvaluationResult> {
        self.executor.execute(rule, input)
    }

    fn evaluate_rules(&self, input: &InputRecord) -> Result<EvaluationSummary> {
        let mut summary = EvaluationSummary::default();

        for rule in &self.rules {
            let result = self.executor.execute(rule, input).inspect_err(|e| {
                warn!(rule_id = %rule.id, error = %e, "规则评估失败，终止本次评估");
            })?;
            summary.rules_evaluated += 1;
            engine_metrics::record_rule_evaluation(result.matched);

            if !result.matched {
                continue;
            }

            info!(
                rule_id = %rule.id,
                rule_name = %rule.name,
                action_type = %rule.action.action_type,
                evaluation_time_us = result.evaluation_time_us,
                "规则命中"
            );
            summary.matched_rules.push(rule.id.clone());

            self.registry.dispatch(&rule.action)?;
            summary.actions_dispatched += 1;
        }

        Ok(summary)
    }

    fn validate_prerequisites(&self) -> Result<()> {
        if self.rules.is_empty() {
            return Err(RuleError::Prerequisite("未加载任何规则".to_string()));
        }

        if self.registry.is_empty() {
            return Err(RuleError::Prerequisite("未注册任何动作处理器".to_string()));
        }

        Ok(())
    }

    // ==================== 查询 ====================

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 所有规则使用的字段路径
    pub fn required_fields(&self) -> BTreeSet<&str> {
        self.rules
            .iter()
            .flat_map(|rule| rule.required_fields())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    const SMS_RULE: &str = r#"
    [
        {
            "conditions": [
                {
                    "path": "temperature",
                    "operator": { "type": "lessThan", "value": 100 }
                },
                {
                    "and": {
                        "path": "size",
                        "operator": { "type": "lessThan", "value": 100 }
                    }
                }
            ],
            "then": {
                "type": "sendSMS",
                "params": { "contact": "0724454572" }
            }
        }
    ]
    "#;

    fn counting_engine() -> (RuleEngine, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let mut engine = RuleEngine::new();
        engine.load_rules_from_json(SMS_RULE).unwrap();
        engine.register_action_handler("sendSMS", move |_params| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        (engine, calls)
    }

    #[test]
    fn test_evaluate_without_rules() {
        let mut engine = RuleEngine::new();
        engine.register_action_handler("sendSMS", |_| Ok(()));

        let err = engine
            .evaluate(&InputRecord::from_value(json!({"temperature": 90})).unwrap())
            .unwrap_err();
        assert_eq!(err.code(), "PREREQUISITE_NOT_MET");
    }

    #[test]
    fn test_evaluate_json_checks_prerequisites_before_decoding() {
        let mut engine = RuleEngine::new();
        engine.register_action_handler("sendSMS", |_| Ok(()));

        // 输入不是合法 JSON，但应先报告前置条件错误
        let err = engine.evaluate_json("{not json").unwrap_err();
        assert_eq!(err.code(), "PREREQUISITE_NOT_MET");
    }

    #[test]
    fn test_evaluate_json_rejects_malformed_input() {
        let (engine, calls) = counting_engine();

        let err = engine.evaluate_json("{not json").unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");

        let err = engine.evaluate_json("[90, 20]").unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_evaluate_without_handlers() {
        let mut engine = RuleEngine::new();
        engine.load_rules_from_json(SMS_RULE).unwrap();

        let err = engine.evaluate_json(r#"{"temperature": 90}"#).unwrap_err();
        assert!(err.to_string().contains("未注册任何动作处理器"));
    }

    #[test]
    fn test_empty_rule_set_counts_as_not_loaded() {
        let mut engine = RuleEngine::new();
        engine.load_rules_from_json("[]").unwrap();
        engine.register_action_handler("sendSMS", |_| Ok(()));

        let err = engine.evaluate_json(r#"{"temperature": 90}"#).unwrap_err();
        assert_eq!(err.code(), "PREREQUISITE_NOT_MET");
    }

    #[test]
    fn test_matching_rule_dispatches_once() {
        let (engine, calls) = counting_engine();

        let summary = engine
            .evaluate_json(r#"{"temperature": 90, "size": 20}"#)
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(summary.rules_evaluated, 1);
        assert_eq!(summary.matched_rules, vec!["rule-0"]);
        assert_eq!(summary.actions_dispatched, 1);
    }

    #[test]
    fn test_non_matching_rule_does_not_dispatch() {
        let (engine, calls) = counting_engine();

        let summary = engine
            .evaluate_json(r#"{"temperature": 150, "size": 20}"#)
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!summary.matched());
    }

    #[test]
    fn test_failed_load_keeps_previous_rules() {
        let (mut engine, _) = counting_engine();
        assert_eq!(engine.generation(), 1);

        let err = engine
            .load_rules_from_json(r#"[{"conditions": [], "then": {"type": "sendSMS"}}]"#)
            .unwrap_err();

        assert_eq!(err.code(), "RULE_LOAD_FAILED");
        assert_eq!(engine.rule_count(), 1);
        assert_eq!(engine.generation(), 1);
    }

    #[test]
    fn test_load_replaces_rule_set() {
        let (mut engine, _) = counting_engine();

        engine
            .load_rules_from_json(
                r#"
                [
                    {"id": "a", "conditions": [{"path": "x", "operator": {"type": "equals", "value": 1}}], "then": {"type": "sendSMS"}},
                    {"id": "b", "conditions": [{"path": "y", "operator": {"type": "equals", "value": 2}}], "then": {"type": "sendSMS"}}
                ]
                "#,
            )
            .unwrap();

        let ids: Vec<&str> = engine.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(engine.generation(), 2);
        assert_eq!(
            engine.required_fields().into_iter().collect::<Vec<_>>(),
            vec!["x", "y"]
        );
    }

    #[test]
    fn test_evaluate_rule_does_not_dispatch() {
        let (engine, calls) = counting_engine();
        let input = InputRecord::from_value(json!({"temperature": 90, "size": 20})).unwrap();

        let result = engine.evaluate_rule(&engine.rules()[0], &input).unwrap();

        assert!(result.matched);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_from_config_loads_rules_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, SMS_RULE).unwrap();

        let config = EngineConfig {
            trace_enabled: true,
            rules_path: Some(path),
        };
        let engine = RuleEngine::from_config(&config).unwrap();
        let input = InputRecord::from_value(json!({"temperature": 90, "size": 20})).unwrap();

        assert_eq!(engine.rule_count(), 1);
        let result = engine.evaluate_rule(&engine.rules()[0], &input).unwrap();
        assert!(!result.evaluation_trace.is_empty());
    }

    #[test]
    fn test_from_config_missing_file() {
        let config = EngineConfig {
            trace_enabled: false,
            rules_path: Some("/nonexistent/rules.json".into()),
        };
        let err = RuleEngine::from_config(&config).err().unwrap();
        assert!(err.to_string().contains("无法读取规则文件"));
    }
}
