//! 儲存流程：把快取重算與批量傳播接到儲存層的寫入前後

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use flattery_cache::{CacheEntry, FlattenValue, ValueCache};
use flattery_core::{EngineConfig, PropagationTiming, Record, Result, SchemaRegistry, Store};
use flattery_provider::{PropagationReport, PushFlattenedValues, ValueProvider};

/// 單次儲存的結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// 是否為新增
    pub created: bool,

    /// 被重算的快取欄位
    pub refreshed: Vec<String>,

    /// 批量傳播結果
    pub propagation: PropagationReport,
}

/// 快取值同步引擎
///
/// 每個實體最多一份快取設定與一份傳播設定。
/// 宣告在啟動時完成，之後以共享參照使用。
#[derive(Debug)]
pub struct Flattery {
    schema: SchemaRegistry,
    config: EngineConfig,
    caches: HashMap<String, ValueCache>,
    providers: HashMap<String, ValueProvider>,
}

impl Flattery {
    /// 創建新的引擎
    pub fn new(schema: SchemaRegistry, config: EngineConfig) -> Self {
        Self {
            schema,
            config,
            caches: HashMap::new(),
            providers: HashMap::new(),
        }
    }

    /// 獲取結構描述註冊表引用
    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    /// 獲取引擎配置引用
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 宣告實體的快取值；`None` 或空宣告清除該實體的設定
    pub fn flatten_value(&mut self, entity: &str, options: Option<FlattenValue>) -> Result<()> {
        self.schema.require(entity)?;
        self.caches
            .entry(entity.to_string())
            .or_insert_with(|| ValueCache::new(entity))
            .flatten_value(options);
        Ok(())
    }

    /// 宣告實體的傳播設定
    pub fn push_flattened_values_for(
        &mut self,
        entity: &str,
        options: PushFlattenedValues,
    ) -> Result<()> {
        self.schema.require(entity)?;
        let default_method = self.config.default_method;
        self.providers
            .entry(entity.to_string())
            .or_insert_with(|| ValueProvider::new(entity).with_default_method(default_method))
            .push_flattened_values_for(options);
        Ok(())
    }

    /// 以配置的預設策略宣告 `from => to, as:`
    pub fn push_value(
        &mut self,
        entity: &str,
        from: &str,
        to: &str,
        as_column: &str,
    ) -> Result<()> {
        let options =
            PushFlattenedValues::new(from, to, as_column).method(self.config.default_method);
        self.push_flattened_values_for(entity, options)
    }

    /// 實體的快取設定
    pub fn value_cache(&self, entity: &str) -> Option<&ValueCache> {
        self.caches.get(entity)
    }

    /// 實體的傳播設定
    pub fn value_provider_options(&self, entity: &str) -> Option<&ValueProvider> {
        self.providers.get(entity)
    }

    /// 實體解析後的快取設定（未宣告時為空）
    pub fn value_cache_options(&self, entity: &str) -> BTreeMap<String, CacheEntry> {
        self.caches
            .get(entity)
            .map(|cache| cache.settings(&self.schema).clone())
            .unwrap_or_default()
    }

    /// 立即解析所有設定
    ///
    /// 宣告完成後、開始併發處理前呼叫，之後的讀取不再觸發解析。
    pub fn resolve_all(&self) {
        for cache in self.caches.values() {
            let settings = cache.settings(&self.schema);
            tracing::info!("實體 {} 快取欄位: {} 個", cache.entity(), settings.len());
        }
        for provider in self.providers.values() {
            let settings = provider.settings();
            tracing::info!("實體 {} 傳播來源: {} 個", provider.entity(), settings.len());
        }
    }

    /// 儲存記錄（新增或更新）
    ///
    /// 順序：快取重算 → 寫入前傳播 → 寫入 → 寫入後傳播。
    /// `atomic` 時整個流程在同一交易中；失敗時記錄還原為呼叫前的狀態。
    pub fn save<S: Store>(&self, store: &mut S, record: &mut Record) -> Result<SaveReport> {
        self.schema.require(&record.entity)?;

        let snapshot = record.clone();
        let result = if self.config.atomic {
            store.transaction(|tx| self.save_in(tx, record))
        } else {
            self.save_in(store, record)
        };

        match result {
            Ok(report) => {
                record.mark_persisted();
                Ok(report)
            }
            Err(e) => {
                tracing::warn!("儲存 {} 失敗: {}", record.entity, e);
                *record = snapshot;
                Err(e)
            }
        }
    }

    /// 新增記錄並回傳已持久化的版本
    pub fn create<S: Store>(&self, store: &mut S, record: Record) -> Result<Record> {
        let mut record = record;
        self.save(store, &mut record)?;
        Ok(record)
    }

    fn save_in<S: Store>(&self, store: &mut S, record: &mut Record) -> Result<SaveReport> {
        let changes = record.changes();
        let mut report = SaveReport {
            created: changes.new_record,
            ..SaveReport::default()
        };

        if let Some(cache) = self.caches.get(&record.entity) {
            report.refreshed = cache.before_save(record, &changes, &self.schema, &*store)?;
        }

        let provider = self.providers.get(&record.entity);
        let timing = self.config.timing;

        if let (Some(provider), PropagationTiming::BeforeSave) = (provider, timing) {
            report.propagation = provider.propagate(record, &changes, &self.schema, store, timing)?;
        }

        if changes.new_record {
            store.insert(record)?;
        } else {
            store.update(record)?;
        }

        if let (Some(provider), PropagationTiming::AfterSave) = (provider, timing) {
            report.propagation = provider.propagate(record, &changes, &self.schema, store, timing)?;
        }

        tracing::debug!(
            "儲存 {}：重算 {} 個欄位，傳播 {} 筆",
            record.entity,
            report.refreshed.len(),
            report.propagation.total_rows()
        );

        Ok(report)
    }
}
