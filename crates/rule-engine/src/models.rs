//! 规则引擎领域模型
//!
//! 分为两层：
//! - `*Definition`：与配置格式一一对应的反序列化结构，字段可选，尚未校验
//! - `Rule` / `Condition`：经 [`RuleCompiler`](crate::compiler::RuleCompiler) 校验后的执行模型

use crate::error::{Result, RuleError};
use crate::operators::{Combinator, OperatorKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// 动作参数
pub type ActionParams = Map<String, Value>;

// ==================== 规则定义（配置格式） ====================

/// 规则定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub conditions: Vec<ConditionDefinition>,
    pub then: Action,
}

/// 条件定义
///
/// 三种形态共用一个结构：`{path, operator}`、`{and: {...}}`、`{or: {...}}`。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and: Option<Clause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or: Option<Clause>,
}

impl ConditionDefinition {
    pub fn simple(path: impl Into<String>, operator: Operator) -> Self {
        Self {
            path: Some(path.into()),
            operator: Some(operator),
            ..Default::default()
        }
    }

    pub fn and(path: impl Into<String>, operator: Operator) -> Self {
        Self {
            and: Some(Clause::new(path, operator)),
            ..Default::default()
        }
    }

    pub fn or(path: impl Into<String>, operator: Operator) -> Self {
        Self {
            or: Some(Clause::new(path, operator)),
            ..Default::default()
        }
    }
}

// ==================== 执行模型 ====================

/// 操作符及其操作数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Operator {
    #[serde(rename = "type")]
    pub kind: OperatorKind,
    #[serde(rename = "value")]
    pub operand: Value,
}

impl Operator {
    pub fn new(kind: OperatorKind, operand: impl Into<Value>) -> Self {
        Self {
            kind,
            operand: operand.into(),
        }
    }

    pub fn equals(operand: impl Into<Value>) -> Self {
        Self::new(OperatorKind::Equals, operand)
    }

    pub fn greater_than(operand: impl Into<Value>) -> Self {
        Self::new(OperatorKind::GreaterThan, operand)
    }

    pub fn less_than(operand: impl Into<Value>) -> Self {
        Self::new(OperatorKind::LessThan, operand)
    }

    pub fn contains(operand: impl Into<Value>) -> Self {
        Self::new(OperatorKind::Contains, operand)
    }
}

/// 路径 + 操作符
///
/// 组合符内部不允许再嵌套 and / or，多余字段在解析时即被拒绝。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Clause {
    pub path: String,
    pub operator: Operator,
}

impl Clause {
    pub fn new(path: impl Into<String>, operator: Operator) -> Self {
        Self {
            path: path.into(),
            operator,
        }
    }
}

/// 条件节点
///
/// 只有条件链的第一个位置可以是 `Simple`，其后每个条件都必须携带组合符。
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Simple(Clause),
    And(Clause),
    Or(Clause),
}

impl Condition {
    pub fn clause(&self) -> &Clause {
        match self {
            Self::Simple(clause) | Self::And(clause) | Self::Or(clause) => clause,
        }
    }

    pub fn combinator(&self) -> Option<Combinator> {
        match self {
            Self::Simple(_) => None,
            Self::And(_) => Some(Combinator::And),
            Self::Or(_) => Some(Combinator::Or),
        }
    }
}

/// 动作定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub params: ActionParams,
}

impl Action {
    pub fn new(action_type: impl Into<String>, params: ActionParams) -> Self {
        Self {
            action_type: action_type.into(),
            params,
        }
    }
}

/// 规则
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub conditions: Vec<Condition>,
    pub action: Action,
}

impl Rule {
    /// 规则中使用的所有字段路径
    pub fn required_fields(&self) -> BTreeSet<&str> {
        self.conditions
            .iter()
            .map(|c| c.clause().path.as_str())
            .collect()
    }
}

// ==================== 输入与结果 ====================

/// 输入记录：字段名到值的扁平映射，每次评估由调用方提供
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputRecord {
    fields: Map<String, Value>,
}

impl InputRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// 从 JSON 值创建，顶层必须是对象
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(RuleError::InvalidInput(format!(
                "输入必须是 JSON 对象，实际为 {}",
                value_type_name(&other)
            ))),
        }
    }

    /// 从 JSON 字符串创建
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| RuleError::InvalidInput(format!("无法解析输入 JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// 获取顶层字段
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for InputRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for InputRecord {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// 单条规则的评估结果
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub matched: bool,
    pub rule_id: String,
    pub rule_name: String,
    /// 实际评估过的条件数（不短路，应等于条件链长度）
    pub conditions_evaluated: usize,
    pub matched_conditions: Vec<String>,
    pub evaluation_trace: Vec<String>,
    pub evaluation_time_us: u64,
}

impl EvaluationResult {
    pub fn new(rule_id: String, rule_name: String) -> Self {
        Self {
            matched: false,
            rule_id,
            rule_name,
            conditions_evaluated: 0,
            matched_conditions: Vec::new(),
            evaluation_trace: Vec::new(),
            evaluation_time_us: 0,
        }
    }
}

/// 一次 evaluate 调用的汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationSummary {
    pub rules_evaluated: usize,
    /// 按加载顺序排列的命中规则 ID
    pub matched_rules: Vec<String>,
    pub actions_dispatched: usize,
}

impl EvaluationSummary {
    pub fn matched(&self) -> bool {
        !self.matched_rules.is_empty()
    }
}

/// 获取值的类型名称
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
