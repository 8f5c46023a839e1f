//! 规则编译器
//!
//! 将规则定义校验并转换为执行模型。条件形态（简单 / and / or）在这里一次性确定，
//! 评估阶段不再检查可选字段。

use crate::error::{Result, RuleError};
use crate::models::{Clause, Condition, ConditionDefinition, Rule, RuleDefinition};
use tracing::warn;

/// 规则编译器
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleCompiler;

impl RuleCompiler {
    pub fn new() -> Self {
        Self
    }

    /// 解析 JSON 规则数组
    pub fn parse_definitions(&self, json: &str) -> Result<Vec<RuleDefinition>> {
        serde_json::from_str(json)
            .map_err(|e| RuleError::RuleLoad(format!("无法解析规则 JSON: {}", e)))
    }

    /// 从 JSON 字符串编译规则集
    pub fn compile_from_json(&self, json: &str) -> Result<Vec<Rule>> {
        let definitions = self.parse_definitions(json)?;
        self.compile_all(definitions)
    }

    /// 编译整个规则集，任一规则无效则整体失败
    pub fn compile_all(&self, definitions: Vec<RuleDefinition>) -> Result<Vec<Rule>> {
        definitions
            .into_iter()
            .enumerate()
            .map(|(index, definition)| self.compile(index, definition))
            .collect()
    }

    /// 编译单条规则
    pub fn compile(&self, index: usize, definition: RuleDefinition) -> Result<Rule> {
        let RuleDefinition {
            id,
            name,
            conditions,
            then,
        } = definition;

        let id = id.unwrap_or_else(|| format!("rule-{}", index));
        if id.is_empty() {
            return Err(RuleError::RuleLoad(format!("规则 #{} 的 ID 不能为空", index)));
        }
        let name = name.unwrap_or_else(|| id.clone());

        if conditions.is_empty() {
            return Err(RuleError::RuleLoad(format!(
                "规则 '{}' 的条件链不能为空",
                id
            )));
        }

        if then.action_type.is_empty() {
            return Err(RuleError::RuleLoad(format!(
                "规则 '{}' 的动作类型不能为空",
                id
            )));
        }

        let conditions = conditions
            .into_iter()
            .enumerate()
            .map(|(position, def)| self.compile_condition(&id, position, def))
            .collect::<Result<Vec<_>>>()?;

        Ok(Rule {
            id,
            name,
            conditions,
            action: then,
        })
    }

    /// 编译单个条件，并校验其形态与所处位置
    fn compile_condition(
        &self,
        rule_id: &str,
        position: usize,
        definition: ConditionDefinition,
    ) -> Result<Condition> {
        let invalid = |reason: &str| {
            RuleError::RuleLoad(format!(
                "规则 '{}' 的第 {} 个条件{}",
                rule_id, position, reason
            ))
        };

        let condition = match definition {
            ConditionDefinition {
                path: Some(path),
                operator: Some(operator),
                and: None,
                or: None,
            } => Condition::Simple(Clause { path, operator }),
            ConditionDefinition {
                path: None,
                operator: None,
                and: Some(clause),
                or: None,
            } => Condition::And(clause),
            ConditionDefinition {
                path: None,
                operator: None,
                and: None,
                or: Some(clause),
            } => Condition::Or(clause),
            ConditionDefinition {
                and: Some(_),
                or: Some(_),
                ..
            } => return Err(invalid("同时声明了 and 与 or")),
            ConditionDefinition {
                path: None,
                operator: None,
                ..
            } => return Err(invalid("为空")),
            ConditionDefinition {
                and: None,
                or: None,
                path: Some(_),
                ..
            } => return Err(invalid("缺少 operator")),
            ConditionDefinition {
                and: None,
                or: None,
                ..
            } => return Err(invalid("缺少 path")),
            _ => return Err(invalid("不能同时声明 path/operator 与 and/or")),
        };

        match (position, condition.combinator()) {
            (0, Some(combinator)) => {
                return Err(invalid(&format!("不能携带组合符 {}", combinator)));
            }
            (1.., None) => return Err(invalid("缺少 and/or 组合符")),
            _ => {}
        }

        let clause = condition.clause();
        if clause.path.is_empty() {
            return Err(invalid("的 path 不能为空"));
        }

        if !clause.operator.kind.is_supported() {
            // 不支持的操作符延迟到评估时报错
            warn!(
                rule_id,
                position,
                operator = %clause.operator.kind,
                "规则包含不支持的操作符"
            );
        }

        Ok(condition)
    }
}
