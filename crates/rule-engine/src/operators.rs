//! 规则操作符定义

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 条件操作符
///
/// 未识别的操作符名称在加载时保留为 `Unsupported`，评估到该条件时才报错。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Equals,
    GreaterThan,
    LessThan,
    Contains,
    Unsupported(String),
}

impl OperatorKind {
    /// 解析操作符名称，兼容 eq / gt / lt 简写
    pub fn parse(name: &str) -> Self {
        match name {
            "equals" | "eq" => Self::Equals,
            "greaterThan" | "gt" => Self::GreaterThan,
            "lessThan" | "lt" => Self::LessThan,
            "contains" => Self::Contains,
            other => Self::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "equals",
            Self::GreaterThan => "greaterThan",
            Self::LessThan => "lessThan",
            Self::Contains => "contains",
            Self::Unsupported(name) => name,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for OperatorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OperatorKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse(&name))
    }
}

/// 条件之间的组合符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    /// 将当前条件结果并入累计结果（不短路）
    pub fn fold(self, acc: bool, value: bool) -> bool {
        match self {
            Self::And => acc & value,
            Self::Or => acc | value,
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}
