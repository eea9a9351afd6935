//! 寫入前重新計算快取欄位

use std::collections::{BTreeMap, HashMap};

use flattery_core::{ChangeSet, Record, Result, SchemaRegistry, Store, Value};

use crate::{CacheEntry, DirtyTracker};

/// 快取重算處理器
///
/// 只修改記憶體中的記錄，實際寫入由外層的儲存流程完成。
pub struct Processor<'a> {
    settings: &'a BTreeMap<String, CacheEntry>,
    schema: &'a SchemaRegistry,
}

impl<'a> Processor<'a> {
    /// 創建新的處理器
    pub fn new(settings: &'a BTreeMap<String, CacheEntry>, schema: &'a SchemaRegistry) -> Self {
        Self { settings, schema }
    }

    /// 寫入前鉤子：重算過期的快取欄位，回傳被重算的欄位名稱
    pub fn before_save<S: Store>(
        &self,
        record: &mut Record,
        changes: &ChangeSet,
        store: &S,
    ) -> Result<Vec<String>> {
        let tracker = DirtyTracker::from_changes(self.settings, changes);
        if tracker.is_empty() {
            return Ok(Vec::new());
        }

        // 同一關聯只載入一次
        let mut targets: HashMap<String, Option<Record>> = HashMap::new();
        let mut refreshed = Vec::new();

        for column in tracker.get_dirty_columns() {
            let Some(entry) = self.settings.get(&column) else {
                continue;
            };

            if !targets.contains_key(&entry.association_name) {
                let target = self.load_target(record, &entry.association_name, store)?;
                targets.insert(entry.association_name.clone(), target);
            }

            let value = targets
                .get(&entry.association_name)
                .and_then(Option::as_ref)
                .and_then(|target| self.read(target, &entry.association_method))
                .unwrap_or(Value::Null);

            tracing::debug!("{}.{} 重新計算為 {}", record.entity, column, value);
            record.set(column.clone(), value);
            refreshed.push(column);
        }

        Ok(refreshed)
    }

    /// 依外鍵載入關聯目標；關聯不存在或外鍵為空時回傳 `None`
    fn load_target<S: Store>(
        &self,
        record: &Record,
        association_name: &str,
        store: &S,
    ) -> Result<Option<Record>> {
        let Some(association) = self
            .schema
            .entity(&record.entity)
            .and_then(|schema| schema.association(association_name))
        else {
            return Ok(None);
        };

        let key = record.get(&association.foreign_key);
        if key.is_null() {
            return Ok(None);
        }

        store.find_by(&association.target, &association.primary_key, key)
    }

    fn read(&self, target: &Record, method: &str) -> Option<Value> {
        self.schema
            .entity(&target.entity)
            .and_then(|schema| schema.read(target, method))
    }
}
