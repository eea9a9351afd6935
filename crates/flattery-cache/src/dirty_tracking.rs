//! 髒標記追蹤

use std::collections::{BTreeMap, BTreeSet};

use flattery_core::ChangeSet;

use crate::CacheEntry;

/// 髒標記追蹤器（記錄需要重新計算的快取欄位）
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    dirty_columns: BTreeSet<String>,
}

impl DirtyTracker {
    /// 創建新的追蹤器
    pub fn new() -> Self {
        Self::default()
    }

    /// 依變更集標記過期的快取欄位
    ///
    /// - 新記錄：所有欄位皆需計算
    /// - 已持久化記錄：任一 `changed_on` 屬性有變更的欄位
    pub fn from_changes(settings: &BTreeMap<String, CacheEntry>, changes: &ChangeSet) -> Self {
        let mut tracker = Self::new();
        for (column, entry) in settings {
            if changes.new_record || changes.any_changed(&entry.changed_on) {
                tracker.dirty_columns.insert(column.clone());
            }
        }
        tracker
    }

    /// 獲取所有髒欄位（依名稱排序）
    pub fn get_dirty_columns(&self) -> Vec<String> {
        self.dirty_columns.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.dirty_columns.is_empty()
    }
}
