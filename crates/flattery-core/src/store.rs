//! 儲存層介面
//!
//! 引擎只依賴這組最小能力：依鍵查找、範圍查詢、寫入、
//! 伺服器端批量更新與交易。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Record, Result, Value};

/// 查詢範圍：`entity` 中 `attribute == value` 的所有記錄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub entity: String,
    pub attribute: String,
    pub value: Value,
}

impl Scope {
    /// 創建新的查詢範圍
    pub fn new(entity: impl Into<String>, attribute: impl Into<String>, value: Value) -> Self {
        Self {
            entity: entity.into(),
            attribute: attribute.into(),
            value,
        }
    }

    /// 檢查記錄是否落在範圍內
    ///
    /// `Null` 不與任何值相等（包含 `Null`）。
    pub fn matches(&self, record: &Record) -> bool {
        !self.value.is_null()
            && record.entity == self.entity
            && *record.get(&self.attribute) == self.value
    }
}

/// 儲存層
pub trait Store {
    /// 依屬性查找單筆記錄（關聯單數遍歷）
    fn find_by(&self, entity: &str, attribute: &str, value: &Value) -> Result<Option<Record>>;

    /// 載入範圍內所有記錄（關聯複數遍歷）
    fn select(&self, scope: &Scope) -> Result<Vec<Record>>;

    /// 新增記錄；寫入後由儲存層回填主鍵等屬性
    fn insert(&mut self, record: &mut Record) -> Result<()>;

    /// 更新已持久化的記錄
    fn update(&mut self, record: &mut Record) -> Result<()>;

    /// 批量更新範圍內所有記錄，回傳受影響筆數
    fn update_all(&mut self, scope: &Scope, assignments: &BTreeMap<String, Value>)
        -> Result<usize>;

    /// 在單一交易中執行 `f`；`f` 回傳錯誤時回滾所有寫入
    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>;
}
