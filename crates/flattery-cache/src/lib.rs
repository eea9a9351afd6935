//! # Flattery Cache
//!
//! 持有快取值的一方：解析 `flatten_value` 宣告，並在寫入前重算過期的快取欄位

pub mod dirty_tracking;
pub mod options;
pub mod processor;
pub mod resolver;

use std::collections::BTreeMap;

use flattery_core::{ChangeSet, Record, Result, SchemaRegistry, Settings, Store};

// Re-export 主要類型
pub use dirty_tracking::DirtyTracker;
pub use options::{CacheDeclaration, FlattenValue};
pub use processor::Processor;
pub use resolver::CacheEntry;

/// 實體的快取設定
#[derive(Debug, Clone)]
pub struct ValueCache {
    entity: String,
    settings: Settings<CacheDeclaration, CacheEntry>,
}

impl ValueCache {
    /// 創建實體的空快取設定
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            settings: Settings::new(),
        }
    }

    /// 實體名稱
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// 宣告快取值
    ///
    /// `None` 或完全空白的宣告清除所有設定；否則與既有設定合併。
    /// 只有 `as` 而沒有配對的宣告不加入任何設定。
    pub fn flatten_value(&mut self, options: Option<FlattenValue>) {
        match options {
            Some(options) if !options.is_empty() => {
                for declaration in options.declarations() {
                    self.settings.push(declaration);
                }
            }
            _ => {
                tracing::debug!("清除實體 {} 的快取設定", self.entity);
                self.settings.clear();
            }
        }
    }

    /// 清除所有設定
    pub fn clear(&mut self) {
        self.settings.clear();
    }

    /// 原始宣告
    pub fn raw_settings(&self) -> &[CacheDeclaration] {
        self.settings.raw_settings()
    }

    /// 是否已解析
    pub fn resolved(&self) -> bool {
        self.settings.resolved()
    }

    /// 解析後的設定（第一次呼叫時解析）
    pub fn settings(&self, schema: &SchemaRegistry) -> &BTreeMap<String, CacheEntry> {
        self.settings
            .settings_with(|raw| resolver::resolve(&self.entity, raw, schema))
    }

    /// 寫入前鉤子：重算過期的快取欄位
    pub fn before_save<S: Store>(
        &self,
        record: &mut Record,
        changes: &ChangeSet,
        schema: &SchemaRegistry,
        store: &S,
    ) -> Result<Vec<String>> {
        let settings = self.settings(schema);
        if settings.is_empty() {
            return Ok(Vec::new());
        }
        Processor::new(settings, schema).before_save(record, changes, store)
    }
}
