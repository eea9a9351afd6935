//! 批量傳播引擎
//!
//! 來源屬性變更時，把新值寫入所有目前關聯目標記錄的快取欄位。

use serde::Serialize;
use std::collections::BTreeMap;

use flattery_core::{
    AssociationKind, ChangeSet, FlatteryError, PropagationMethod, PropagationTiming, Record,
    Result, SchemaRegistry, Scope, Store, Value,
};

use crate::ProviderEntry;

/// 單筆傳播結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropagatedUpdate {
    /// 來源屬性
    pub from_entity: String,
    /// 目標範圍
    pub scope: Scope,
    /// 寫入的欄位
    pub as_column: String,
    /// 寫入的值
    pub value: Value,
    /// 受影響筆數
    pub rows: usize,
}

/// 傳播報告
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropagationReport {
    pub updates: Vec<PropagatedUpdate>,
}

impl PropagationReport {
    /// 受影響的總筆數
    pub fn total_rows(&self) -> usize {
        self.updates.iter().map(|u| u.rows).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// 批量傳播器
pub struct Propagator<'a> {
    settings: &'a BTreeMap<String, ProviderEntry>,
    schema: &'a SchemaRegistry,
}

impl<'a> Propagator<'a> {
    /// 創建新的傳播器
    pub fn new(settings: &'a BTreeMap<String, ProviderEntry>, schema: &'a SchemaRegistry) -> Self {
        Self { settings, schema }
    }

    /// 對每個來源屬性有變更的設定項目執行批量寫入
    ///
    /// 從未持久化的來源記錄沒有關聯目標，直接略過。
    /// 儲存層錯誤原樣回傳，不重試。
    pub fn propagate<S: Store>(
        &self,
        record: &Record,
        changes: &ChangeSet,
        store: &mut S,
        timing: PropagationTiming,
    ) -> Result<PropagationReport> {
        let mut report = PropagationReport::default();

        if changes.new_record {
            return Ok(report);
        }

        for (from, entry) in self.settings {
            let Some(change) = changes.get(from) else {
                continue;
            };

            let scope = self.scope_for(record, entry, timing)?;
            let rows = match entry.method {
                PropagationMethod::UpdateAll => {
                    let mut assignments = BTreeMap::new();
                    assignments.insert(entry.as_column.clone(), change.new.clone());
                    store.update_all(&scope, &assignments)?
                }
                PropagationMethod::EachRecord => {
                    each_record(store, &scope, &entry.as_column, &change.new)?
                }
            };

            tracing::info!(
                "{}.{} 傳播至 {}.{}（{}）: {} 筆",
                record.entity,
                from,
                scope.entity,
                entry.as_column,
                entry.method.as_str(),
                rows
            );

            report.updates.push(PropagatedUpdate {
                from_entity: from.clone(),
                scope,
                as_column: entry.as_column.clone(),
                value: change.new.clone(),
                rows,
            });
        }

        Ok(report)
    }

    /// 目前關聯目標的查詢範圍
    ///
    /// `BeforeSave` 使用上次持久化的主鍵值（寫入前目標仍指向它），
    /// `AfterSave` 使用目前的主鍵值。
    fn scope_for(
        &self,
        record: &Record,
        entry: &ProviderEntry,
        timing: PropagationTiming,
    ) -> Result<Scope> {
        let association = self
            .schema
            .require_association(&record.entity, &entry.to_entity)?;

        if association.kind == AssociationKind::BelongsTo {
            return Err(FlatteryError::InvalidAssociation {
                entity: record.entity.clone(),
                association: entry.to_entity.clone(),
                reason: "傳播目標必須是 has_many 或 has_one".to_string(),
            });
        }

        let key = match timing {
            PropagationTiming::BeforeSave => record
                .persisted_value(&association.primary_key)
                .cloned()
                .unwrap_or_default(),
            PropagationTiming::AfterSave => record.get(&association.primary_key).clone(),
        };

        Ok(Scope::new(
            association.target.clone(),
            association.foreign_key.clone(),
            key,
        ))
    }
}

/// 逐筆載入、設值並寫回，包在同一交易中
fn each_record<S: Store>(
    store: &mut S,
    scope: &Scope,
    column: &str,
    value: &Value,
) -> Result<usize> {
    store.transaction(|tx| {
        let targets = tx.select(scope)?;
        let count = targets.len();
        for mut target in targets {
            target.set(column, value.clone());
            tx.update(&mut target)?;
            target.mark_persisted();
        }
        Ok(count)
    })
}
