//! 动作处理器注册表
//!
//! 按动作类型索引处理器，规则命中后同步调用对应处理器。
//!
//! ## 使用示例
//!
//! ```ignore
//! use rule_engine::dispatcher::HandlerRegistry;
//! use std::sync::Arc;
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register("sendSMS", Arc::new(|params: &ActionParams| -> HandlerResult {
//!     println!("sending SMS to {}", params["contact"]);
//!     Ok(())
//! }));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};
use veritas_shared::observability::metrics as engine_metrics;

use crate::error::{HandlerError, Result, RuleError};
use crate::models::{Action, ActionParams};

/// 处理器返回值
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// 动作处理器
///
/// 处理器在评估线程上同步执行；需要超时控制时由调用方自行包装。
pub trait ActionHandler: Send + Sync {
    /// 执行动作
    fn handle(&self, params: &ActionParams) -> HandlerResult;

    /// 获取 Handler 的描述信息（用于日志）
    fn description(&self) -> &'static str {
        "Generic Action Handler"
    }
}

impl<F> ActionHandler for F
where
    F: Fn(&ActionParams) -> HandlerResult + Send + Sync,
{
    fn handle(&self, params: &ActionParams) -> HandlerResult {
        self(params)
    }

    fn description(&self) -> &'static str {
        "Closure Action Handler"
    }
}

/// Handler 注册表
///
/// 每个引擎实例持有独立的注册表；同一动作类型只保留最后一次注册的处理器。
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// 注册一个 Handler，已存在的同类型 Handler 会被替换
    pub fn register(
        &mut self,
        action_type: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) -> &mut Self {
        let action_type = action_type.into();
        debug!(
            action_type = %action_type,
            description = handler.description(),
            "注册动作处理器"
        );

        if self.handlers.insert(action_type.clone(), handler).is_some() {
            info!(action_type = %action_type, "动作处理器已被覆盖");
        }
        self
    }

    /// 获取指定类型的 Handler
    pub fn get(&self, action_type: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(action_type).cloned()
    }

    /// 检查是否已注册指定类型的 Handler
    pub fn contains(&self, action_type: &str) -> bool {
        self.handlers.contains_key(action_type)
    }

    /// 获取所有已注册的动作类型（按字典序）
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }

    /// 获取已注册的 Handler 数量
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// 检查注册表是否为空
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// 分发动作
    ///
    /// 未注册的类型返回 `HandlerNotFound` 且不调用任何处理器；
    /// 处理器上报的失败包装为 `HandlerExecution`。
    pub fn dispatch(&self, action: &Action) -> Result<()> {
        let Some(handler) = self.handlers.get(&action.action_type) else {
            warn!(action_type = %action.action_type, "未找到动作处理器");
            engine_metrics::record_action_dispatch(&action.action_type, "not_found");
            return Err(RuleError::HandlerNotFound {
                action_type: action.action_type.clone(),
            });
        };

        match handler.handle(&action.params) {
            Ok(()) => {
                debug!(action_type = %action.action_type, "动作执行成功");
                engine_metrics::record_action_dispatch(&action.action_type, "success");
                Ok(())
            }
            Err(source) => {
                warn!(
                    action_type = %action.action_type,
                    error = %source,
                    "动作执行失败"
                );
                engine_metrics::record_action_dispatch(&action.action_type, "failed");
                Err(RuleError::HandlerExecution {
                    action_type: action.action_type.clone(),
                    source,
                })
            }
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("types", &self.registered_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// 测试用的计数 Handler
    struct CountingHandler {
        call_count: AtomicU32,
    }

    impl CountingHandler {
        fn new() -> Self {
            Self {
                call_count: AtomicU32::new(0),
            }
        }

        fn get_call_count(&self) -> u32 {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    impl ActionHandler for CountingHandler {
        fn handle(&self, _params: &ActionParams) -> HandlerResult {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn description(&self) -> &'static str {
            "Counting Handler for Testing"
        }
    }

    fn sms_action() -> Action {
        let mut params = ActionParams::new();
        params.insert("contact".to_string(), json!("0724454572"));
        Action::new("sendSMS", params)
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = HandlerRegistry::new();
        registry.register("sendSMS", Arc::new(CountingHandler::new()));

        assert!(registry.contains("sendSMS"));
        assert!(!registry.contains("sendEmail"));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("sendSMS").unwrap().description(),
            "Counting Handler for Testing"
        );
    }

    #[test]
    fn test_dispatch_passes_params() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();

        let mut registry = HandlerRegistry::new();
        registry.register(
            "sendSMS",
            Arc::new(move |params: &ActionParams| -> HandlerResult {
                sink.lock().push(params.clone());
                Ok(())
            }),
        );

        registry.dispatch(&sms_action()).unwrap();

        let received = received.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["contact"], json!("0724454572"));
    }

    #[test]
    fn test_dispatch_unregistered_type() {
        let handler = Arc::new(CountingHandler::new());
        let mut registry = HandlerRegistry::new();
        registry.register("sendEmail", handler.clone());

        let err = registry.dispatch(&sms_action()).unwrap_err();

        assert!(matches!(
            err,
            RuleError::HandlerNotFound { ref action_type } if action_type == "sendSMS"
        ));
        assert_eq!(handler.get_call_count(), 0);
    }

    #[test]
    fn test_dispatch_handler_failure() {
        let mut registry = HandlerRegistry::new();
        registry.register(
            "sendSMS",
            Arc::new(|_: &ActionParams| -> HandlerResult { Err("gateway unavailable".into()) }),
        );

        let err = registry.dispatch(&sms_action()).unwrap_err();

        assert_eq!(err.code(), "HANDLER_EXECUTION_FAILED");
        assert!(err.to_string().contains("gateway unavailable"));
    }

    #[test]
    fn test_register_overwrites() {
        let first = Arc::new(CountingHandler::new());
        let second = Arc::new(CountingHandler::new());

        let mut registry = HandlerRegistry::new();
        registry.register("sendSMS", first.clone());
        registry.register("sendSMS", second.clone());
        registry.dispatch(&sms_action()).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(first.get_call_count(), 0);
        assert_eq!(second.get_call_count(), 1);
    }

    #[test]
    fn test_registered_types_sorted() {
        let mut registry = HandlerRegistry::new();
        registry
            .register("sendSMS", Arc::new(CountingHandler::new()))
            .register("alert", Arc::new(CountingHandler::new()));

        assert_eq!(registry.registered_types(), vec!["alert", "sendSMS"]);
    }
}
