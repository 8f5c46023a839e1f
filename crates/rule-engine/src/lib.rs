//! Veritas 规则引擎
//!
//! 声明式的条件 / 动作规则评估：
//! - JSON 规则定义解析与加载期结构校验
//! - 按组合符从左到右折叠的条件链评估（不短路）
//! - 按动作类型注册处理器并同步分发

pub mod compiler;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod models;
pub mod operators;
pub mod resolver;
pub mod store;

pub use compiler::RuleCompiler;
pub use dispatcher::{ActionHandler, HandlerRegistry, HandlerResult};
pub use engine::RuleEngine;
pub use error::{HandlerError, Result, RuleError};
pub use evaluator::ConditionEvaluator;
pub use executor::{ConditionCheck, OperatorCheck, RuleExecutor};
pub use models::{
    Action, ActionParams, Clause, Condition, ConditionDefinition, EvaluationResult,
    EvaluationSummary, InputRecord, Operator, Rule, RuleDefinition,
};
pub use operators::{Combinator, OperatorKind};
pub use resolver::{FlatPathResolver, PathResolver};
pub use store::SharedRuleEngine;
