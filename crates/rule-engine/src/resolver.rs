//! 字段路径解析

use crate::models::InputRecord;
use serde_json::Value;

/// 路径解析器
///
/// 返回 `None` 表示字段缺失，与字段存在但值为 `null` 区分开。
pub trait PathResolver: Send + Sync {
    fn resolve<'a>(&self, record: &'a InputRecord, path: &str) -> Option<&'a Value>;
}

/// 扁平路径解析：将 path 作为顶层键直接查找
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatPathResolver;

impl PathResolver for FlatPathResolver {
    fn resolve<'a>(&self, record: &'a InputRecord, path: &str) -> Option<&'a Value> {
        record.get(path)
    }
}
