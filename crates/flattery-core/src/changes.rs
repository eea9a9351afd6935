//! 變更集
//!
//! 每次儲存都帶有一組明確的 `(屬性, 舊值, 新值)`，
//! 快取與傳播引擎只讀取變更集，不查詢記錄的隱藏狀態。

use serde::{Deserialize, Serialize};

use crate::Value;

/// 單一屬性變更
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// 屬性名稱
    pub attribute: String,
    /// 上次持久化的值（新記錄為 `Null`）
    pub old: Value,
    /// 記憶體中的新值
    pub new: Value,
}

impl Change {
    /// 創建新的變更
    pub fn new(attribute: impl Into<String>, old: Value, new: Value) -> Self {
        Self {
            attribute: attribute.into(),
            old,
            new,
        }
    }
}

/// 變更集
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// 是否為新記錄（沒有先前狀態可比較）
    pub new_record: bool,
    changes: Vec<Change>,
}

impl ChangeSet {
    /// 創建空的變更集
    pub fn new(new_record: bool) -> Self {
        Self {
            new_record,
            changes: Vec::new(),
        }
    }

    /// 建構器模式：加入變更
    pub fn with_change(mut self, change: Change) -> Self {
        self.push(change);
        self
    }

    /// 加入變更；同一屬性只保留一筆，舊值取最早一筆
    pub fn push(&mut self, change: Change) {
        match self
            .changes
            .iter_mut()
            .find(|c| c.attribute == change.attribute)
        {
            Some(existing) => existing.new = change.new,
            None => self.changes.push(change),
        }
    }

    /// 檢查屬性是否有待寫入的變更
    pub fn changed(&self, attribute: &str) -> bool {
        self.get(attribute).is_some()
    }

    /// 檢查任一屬性是否有變更
    pub fn any_changed<S: AsRef<str>>(&self, attributes: &[S]) -> bool {
        attributes.iter().any(|a| self.changed(a.as_ref()))
    }

    /// 取得屬性的變更
    pub fn get(&self, attribute: &str) -> Option<&Change> {
        self.changes.iter().find(|c| c.attribute == attribute)
    }

    /// 所有變更（依發生順序）
    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
