//! 条件评估器
//!
//! 实现各操作符的评估逻辑，以及数值归一化与深度相等比较。

use crate::error::{Result, RuleError};
use crate::operators::OperatorKind;
use serde_json::Value;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件
    ///
    /// # Arguments
    /// * `field_value` - 从输入记录中解析出的字段值，`None` 表示字段缺失
    /// * `operator` - 操作符
    /// * `operand` - 规则中定义的操作数
    ///
    /// 字段缺失时任何已支持的操作符都返回 false；不支持的操作符总是报错。
    pub fn evaluate(
        field_value: Option<&Value>,
        operator: &OperatorKind,
        operand: &Value,
    ) -> Result<bool> {
        match operator {
            OperatorKind::Unsupported(name) => Err(RuleError::UnsupportedOperator {
                operator: name.clone(),
            }),
            _ => Ok(field_value.is_some_and(|field| Self::apply(operator, field, operand))),
        }
    }

    fn apply(operator: &OperatorKind, field: &Value, operand: &Value) -> bool {
        match operator {
            OperatorKind::Equals => Self::values_equal(field, operand),
            OperatorKind::GreaterThan => Self::compare(field, operand, |a, b| a > b),
            OperatorKind::LessThan => Self::compare(field, operand, |a, b| a < b),
            OperatorKind::Contains => Self::contains(field, operand),
            OperatorKind::Unsupported(_) => false,
        }
    }

    /// 将数值统一转为 f64
    ///
    /// 只接受 JSON 数值（整数或浮点数）；字符串、布尔、数组等返回 None，
    /// 表示“无法比较”而不是错误。
    pub fn to_number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// 深度相等比较
    ///
    /// 数值在任意嵌套层级都按 f64 比较，避免 90 与 90.0 不相等。
    pub fn values_equal(left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Self::values_equal(x, y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, x)| b.get(k).is_some_and(|y| Self::values_equal(x, y)))
            }
            _ => left == right,
        }
    }

    /// 数值比较，任一侧无法转为数值时返回 false
    fn compare<F>(field: &Value, operand: &Value, cmp: F) -> bool
    where
        F: Fn(f64, f64) -> bool,
    {
        match (Self::to_number(field), Self::to_number(operand)) {
            (Some(a), Some(b)) => cmp(a, b),
            _ => false,
        }
    }

    /// 数组元素包含 / 字符串后缀匹配
    fn contains(field: &Value, operand: &Value) -> bool {
        match field {
            Value::Array(items) => items.iter().any(|item| Self::values_equal(item, operand)),
            Value::String(s) => operand
                .as_str()
                .is_some_and(|suffix| Self::is_proper_suffix(s, suffix)),
            _ => false,
        }
    }

    /// suffix 非空、比 s 短，且是 s 的结尾
    ///
    /// 只做后缀匹配，不是任意子串匹配；与 s 完全相同也不算。
    pub fn is_proper_suffix(s: &str, suffix: &str) -> bool {
        !suffix.is_empty() && s.len() > suffix.len() && s.ends_with(suffix)
    }
}
