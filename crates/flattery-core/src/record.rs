//! 記錄模型

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Change, ChangeSet, Value};

/// 記錄（某實體類型的一筆資料）
///
/// 同時保存記憶體中的屬性與上次持久化的快照，
/// 兩者的差異即為待寫入的變更。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// 實體名稱（如 `note`）
    pub entity: String,

    /// 記憶體中的屬性
    attributes: BTreeMap<String, Value>,

    /// 上次持久化的屬性；新記錄為 `None`
    persisted: Option<BTreeMap<String, Value>>,
}

impl Record {
    /// 創建新的（尚未持久化）記錄
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            attributes: BTreeMap::new(),
            persisted: None,
        }
    }

    /// 由儲存層載入的記錄（沒有待寫入變更）
    pub fn loaded(entity: impl Into<String>, attributes: BTreeMap<String, Value>) -> Self {
        Self {
            entity: entity.into(),
            persisted: Some(attributes.clone()),
            attributes,
        }
    }

    /// 建構器模式：設置屬性
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(attribute, value);
        self
    }

    /// 讀取屬性；未設定的屬性視為 `Null`
    pub fn get(&self, attribute: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.attributes.get(attribute).unwrap_or(&NULL)
    }

    /// 設置屬性
    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(attribute.into(), value.into());
    }

    /// 所有屬性
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// 是否為新記錄
    pub fn is_new_record(&self) -> bool {
        self.persisted.is_none()
    }

    /// 上次持久化的值
    pub fn persisted_value(&self, attribute: &str) -> Option<&Value> {
        self.persisted.as_ref().and_then(|p| p.get(attribute))
    }

    /// 上次持久化的值（髒標記語意：新記錄的舊值為 `Null`）
    pub fn previous_value(&self, attribute: &str) -> Value {
        self.persisted_value(attribute).cloned().unwrap_or_default()
    }

    /// 檢查屬性是否與上次持久化的值不同
    pub fn attribute_changed(&self, attribute: &str) -> bool {
        match &self.persisted {
            Some(_) => self.previous_value(attribute) != *self.get(attribute),
            None => !self.get(attribute).is_null(),
        }
    }

    /// 計算變更集
    pub fn changes(&self) -> ChangeSet {
        let mut changes = ChangeSet::new(self.is_new_record());

        for (attribute, value) in &self.attributes {
            if self.attribute_changed(attribute) {
                changes.push(Change::new(
                    attribute.clone(),
                    self.previous_value(attribute),
                    value.clone(),
                ));
            }
        }

        // 從快照中移除的屬性也算變更
        if let Some(persisted) = &self.persisted {
            for (attribute, old) in persisted {
                if !self.attributes.contains_key(attribute) && !old.is_null() {
                    changes.push(Change::new(attribute.clone(), old.clone(), Value::Null));
                }
            }
        }

        changes
    }

    /// 標記為已持久化（寫入成功後由儲存流程呼叫）
    pub fn mark_persisted(&mut self) {
        self.persisted = Some(self.attributes.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_changes() {
        let note = Record::new("note").with("category_id", 5).with("body", Value::Null);

        assert!(note.is_new_record());
        let changes = note.changes();
        assert!(changes.new_record);
        assert!(changes.changed("category_id"));
        assert!(!changes.changed("body"));
    }

    #[test]
    fn test_loaded_record_dirty_tracking() {
        let mut attrs = BTreeMap::new();
        attrs.insert("id".to_string(), Value::Int(1));
        attrs.insert("category_id".to_string(), Value::Int(5));
        let mut note = Record::loaded("note", attrs);

        assert!(note.changes().is_empty());

        note.set("category_id", 6);
        assert!(note.attribute_changed("category_id"));
        assert_eq!(note.previous_value("category_id"), Value::Int(5));

        let changes = note.changes();
        assert!(!changes.new_record);
        assert_eq!(changes.len(), 1);

        note.mark_persisted();
        assert!(note.changes().is_empty());
    }

    #[test]
    fn test_setting_same_value_is_not_a_change() {
        let mut attrs = BTreeMap::new();
        attrs.insert("category_id".to_string(), Value::Int(5));
        let mut note = Record::loaded("note", attrs);

        note.set("category_id", 5);
        assert!(!note.attribute_changed("category_id"));
    }
}
