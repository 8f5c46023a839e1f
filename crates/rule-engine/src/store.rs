//! 共享规则引擎
//!
//! 使用 parking_lot 读写锁包装 [`RuleEngine`]：加载规则与注册处理器持有写锁，
//! 每次评估在整个调用期间持有读锁，多个评估可以并行执行。

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::instrument;

use crate::dispatcher::HandlerResult;
use crate::engine::RuleEngine;
use crate::error::Result;
use crate::models::{ActionParams, EvaluationSummary, InputRecord, RuleDefinition};

/// 线程安全的规则引擎句柄
///
/// 处理器在读锁内执行，不能在处理器中回调同一个句柄的加载或注册方法，否则会死锁。
#[derive(Clone, Default)]
pub struct SharedRuleEngine {
    inner: Arc<RwLock<RuleEngine>>,
}

impl SharedRuleEngine {
    pub fn new(engine: RuleEngine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    /// 加载规则集（写锁）
    #[instrument(skip(self, definitions))]
    pub fn load_rules(&self, definitions: Vec<RuleDefinition>) -> Result<()> {
        self.inner.write().load_rules(definitions)
    }

    /// 从 JSON 数组加载规则集（写锁）
    pub fn load_rules_from_json(&self, json: &str) -> Result<()> {
        self.inner.write().load_rules_from_json(json)
    }

    /// 注册动作处理器（写锁）
    pub fn register_action_handler<F>(&self, action_type: impl Into<String>, handler: F)
    where
        F: Fn(&ActionParams) -> HandlerResult + Send + Sync + 'static,
    {
        self.inner
            .write()
            .register_action_handler(action_type, handler);
    }

    /// 评估输入记录（读锁）
    pub fn evaluate(&self, input: &InputRecord) -> Result<EvaluationSummary> {
        self.inner.read().evaluate(input)
    }

    /// 解码 JSON 输入后评估（读锁）
    pub fn evaluate_json(&self, json: &str) -> Result<EvaluationSummary> {
        self.inner.read().evaluate_json(json)
    }

    /// 获取读锁，用于查询规则与处理器
    pub fn read(&self) -> RwLockReadGuard<'_, RuleEngine> {
        self.inner.read()
    }

    pub fn rule_count(&self) -> usize {
        self.inner.read().rule_count()
    }
}

impl From<RuleEngine> for SharedRuleEngine {
    fn from(engine: RuleEngine) -> Self {
        Self::new(engine)
    }
}
