//! 规则执行器
//!
//! 按从左到右的顺序评估条件链，并按各条件声明的组合符折叠出规则结论。
//! 所有条件都会被评估，不做短路；组合符之间没有优先级，也不支持分组。

use crate::error::{Result, RuleError};
use crate::evaluator::ConditionEvaluator;
use crate::models::{Clause, Condition, EvaluationResult, InputRecord, Rule};
use crate::operators::Combinator;
use crate::resolver::{FlatPathResolver, PathResolver};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// 单个条件的判定
pub trait ConditionCheck {
    fn check(&self, clause: &Clause, record: &InputRecord) -> Result<bool>;
}

/// 默认判定：路径解析 + 操作符评估
pub struct OperatorCheck<'a> {
    resolver: &'a dyn PathResolver,
}

impl<'a> OperatorCheck<'a> {
    pub fn new(resolver: &'a dyn PathResolver) -> Self {
        Self { resolver }
    }
}

impl ConditionCheck for OperatorCheck<'_> {
    fn check(&self, clause: &Clause, record: &InputRecord) -> Result<bool> {
        let field_value = self.resolver.resolve(record, &clause.path);
        ConditionEvaluator::evaluate(field_value, &clause.operator.kind, &clause.operator.operand)
    }
}

/// 规则执行器
#[derive(Clone)]
pub struct RuleExecutor {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
    resolver: Arc<dyn PathResolver>,
}

impl RuleExecutor {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
            resolver: Arc::new(FlatPathResolver),
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 替换路径解析器
    pub fn with_resolver(mut self, resolver: Arc<dyn PathResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace_enabled
    }

    /// 执行规则评估
    pub fn execute(&self, rule: &Rule, record: &InputRecord) -> Result<EvaluationResult> {
        let check = OperatorCheck::new(self.resolver.as_ref());
        self.execute_with(rule, record, &check)
    }

    /// 使用指定的条件判定执行规则评估
    pub fn execute_with<C>(
        &self,
        rule: &Rule,
        record: &InputRecord,
        check: &C,
    ) -> Result<EvaluationResult>
    where
        C: ConditionCheck + ?Sized,
    {
        let start = Instant::now();

        if rule.conditions.is_empty() {
            return Err(RuleError::InvalidChain {
                rule_id: rule.id.clone(),
                position: 0,
                reason: "不存在，条件链为空".to_string(),
            });
        }

        let mut result = EvaluationResult::new(rule.id.clone(), rule.name.clone());
        let mut verdict = false;

        for (position, condition) in rule.conditions.iter().enumerate() {
            let combinator = Self::combinator_at(rule, position, condition)?;
            let clause = condition.clause();

            let matched = check.check(clause, record)?;
            result.conditions_evaluated += 1;

            verdict = match combinator {
                None => matched,
                Some(combinator) => combinator.fold(verdict, matched),
            };

            debug!(
                rule_id = %rule.id,
                position,
                path = %clause.path,
                operator = %clause.operator.kind,
                operand = %clause.operator.operand,
                matched,
                verdict,
                "条件评估"
            );

            let label = match combinator {
                Some(combinator) => format!("conditions[{}] {}", position, combinator),
                None => format!("conditions[{}]", position),
            };

            if self.trace_enabled {
                result.evaluation_trace.push(format!(
                    "{}: {} {} {} => {}",
                    label,
                    clause.path,
                    clause.operator.kind,
                    clause.operator.operand,
                    if matched { "MATCHED" } else { "NOT_MATCHED" }
                ));
            }

            if matched {
                result.matched_conditions.push(format!(
                    "{}: {} {} {}",
                    label, clause.path, clause.operator.kind, clause.operator.operand
                ));
            }
        }

        if self.trace_enabled {
            result.evaluation_trace.push(format!(
                "rule {}: {}",
                rule.id,
                if verdict { "MATCHED" } else { "NOT_MATCHED" }
            ));
        }

        result.matched = verdict;
        result.evaluation_time_us = start.elapsed().as_micros() as u64;

        Ok(result)
    }

    /// 校验条件所处位置与其形态是否一致，返回该位置的组合符
    fn combinator_at(
        rule: &Rule,
        position: usize,
        condition: &Condition,
    ) -> Result<Option<Combinator>> {
        match (position, condition.combinator()) {
            (0, None) => Ok(None),
            (0, Some(combinator)) => Err(RuleError::InvalidChain {
                rule_id: rule.id.clone(),
                position,
                reason: format!("不能携带组合符 {}", combinator),
            }),
            (_, None) => Err(RuleError::InvalidChain {
                rule_id: rule.id.clone(),
                position,
                reason: "缺少 and/or 组合符".to_string(),
            }),
            (_, Some(combinator)) => Ok(Some(combinator)),
        }
    }
}

impl Default for RuleExecutor {
    fn default() -> Self {
        Self::new()
    }
}
