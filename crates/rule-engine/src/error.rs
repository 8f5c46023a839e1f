//! 规则引擎错误类型

use thiserror::Error;

/// 动作处理器上报的失败原因
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("规则加载失败: {0}")]
    RuleLoad(String),

    #[error("前置条件不满足: {0}")]
    Prerequisite(String),

    #[error("不支持的操作符: {operator}")]
    UnsupportedOperator { operator: String },

    #[error("条件链结构无效: 规则 {rule_id} 的第 {position} 个条件{reason}")]
    InvalidChain {
        rule_id: String,
        position: usize,
        reason: String,
    },

    #[error("未注册动作处理器: {action_type}")]
    HandlerNotFound { action_type: String },

    #[error("动作处理器执行失败: {action_type}: {source}")]
    HandlerExecution {
        action_type: String,
        #[source]
        source: HandlerError,
    },

    #[error("输入数据无效: {0}")]
    InvalidInput(String),
}

impl RuleError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::RuleLoad(_) => "RULE_LOAD_FAILED",
            Self::Prerequisite(_) => "PREREQUISITE_NOT_MET",
            Self::UnsupportedOperator { .. } => "UNSUPPORTED_OPERATOR",
            Self::InvalidChain { .. } => "INVALID_CONDITION_CHAIN",
            Self::HandlerNotFound { .. } => "HANDLER_NOT_FOUND",
            Self::HandlerExecution { .. } => "HANDLER_EXECUTION_FAILED",
            Self::InvalidInput(_) => "INVALID_INPUT",
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
