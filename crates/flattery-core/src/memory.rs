//! 記憶體儲存層
//!
//! 以 `id` 自動遞增整數作為列識別，支援唯一性約束與快照式交易，
//! 供測試與示範使用。

use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::{FlatteryError, Record, Result, Scope, Store, Value};

type Row = BTreeMap<String, Value>;

/// 記憶體儲存層
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: HashMap<String, Vec<Row>>,
    sequences: HashMap<String, i64>,
    unique: HashMap<String, BTreeSet<String>>,
    statements: usize,
}

impl MemoryStore {
    /// 創建空的儲存層
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：加入唯一性約束
    pub fn with_unique(mut self, entity: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.unique
            .entry(entity.into())
            .or_default()
            .insert(attribute.into());
        self
    }

    /// 已執行的寫入語句數（insert / update / update_all 各算一次）
    pub fn statements(&self) -> usize {
        self.statements
    }

    /// 實體的記錄數
    pub fn count(&self, entity: &str) -> usize {
        self.tables.get(entity).map(Vec::len).unwrap_or(0)
    }

    /// 依 `id` 重新載入記錄
    pub fn reload(&self, record: &Record) -> Result<Record> {
        let id = record.get("id");
        self.find_by(&record.entity, "id", id)?
            .ok_or_else(|| FlatteryError::RecordNotFound {
                entity: record.entity.clone(),
                key: id.to_string(),
            })
    }

    /// 唯一性檢查：`row` 寫入位置 `position` 後是否違反約束
    fn check_unique(&self, entity: &str, row: &Row, position: Option<usize>) -> Result<()> {
        let Some(attributes) = self.unique.get(entity) else {
            return Ok(());
        };
        let rows = self.tables.get(entity).map(Vec::as_slice).unwrap_or(&[]);

        for attribute in attributes {
            let value = match row.get(attribute) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };
            let conflict = rows
                .iter()
                .enumerate()
                .any(|(i, other)| Some(i) != position && other.get(attribute) == Some(value));
            if conflict {
                return Err(FlatteryError::Storage(format!(
                    "違反唯一性約束 {}.{} = {}",
                    entity, attribute, value
                )));
            }
        }
        Ok(())
    }

    fn position_of(&self, record: &Record) -> Result<usize> {
        let id = record
            .persisted_value("id")
            .cloned()
            .unwrap_or_else(|| record.get("id").clone());
        self.tables
            .get(&record.entity)
            .and_then(|rows| rows.iter().position(|row| row.get("id") == Some(&id)))
            .ok_or_else(|| FlatteryError::RecordNotFound {
                entity: record.entity.clone(),
                key: id.to_string(),
            })
    }
}

fn row_matches(row: &Row, scope: &Scope) -> bool {
    !scope.value.is_null() && row.get(&scope.attribute) == Some(&scope.value)
}

impl Store for MemoryStore {
    fn find_by(&self, entity: &str, attribute: &str, value: &Value) -> Result<Option<Record>> {
        if value.is_null() {
            return Ok(None);
        }
        Ok(self.tables.get(entity).and_then(|rows| {
            rows.iter()
                .find(|row| row.get(attribute) == Some(value))
                .map(|row| Record::loaded(entity, row.clone()))
        }))
    }

    fn select(&self, scope: &Scope) -> Result<Vec<Record>> {
        Ok(self
            .tables
            .get(&scope.entity)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row_matches(row, scope))
                    .map(|row| Record::loaded(scope.entity.as_str(), row.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn insert(&mut self, record: &mut Record) -> Result<()> {
        let current = self.sequences.get(&record.entity).copied().unwrap_or(0);
        let (id, sequence) = match record.get("id") {
            Value::Null => (Value::Int(current + 1), current + 1),
            Value::Int(given) => (Value::Int(*given), current.max(*given)),
            other => (other.clone(), current),
        };

        let exists = self
            .tables
            .get(&record.entity)
            .is_some_and(|rows| rows.iter().any(|row| row.get("id") == Some(&id)));
        if exists {
            return Err(FlatteryError::Storage(format!(
                "主鍵重複 {}.id = {}",
                record.entity, id
            )));
        }

        let mut row = record.attributes().clone();
        row.insert("id".to_string(), id.clone());
        self.check_unique(&record.entity, &row, None)?;

        // 約束通過後才配發 id
        record.set("id", id);
        self.sequences.insert(record.entity.clone(), sequence);
        self.tables.entry(record.entity.clone()).or_default().push(row);
        self.statements += 1;
        Ok(())
    }

    fn update(&mut self, record: &mut Record) -> Result<()> {
        let position = self.position_of(record)?;
        let row = record.attributes().clone();
        self.check_unique(&record.entity, &row, Some(position))?;

        if let Some(rows) = self.tables.get_mut(&record.entity) {
            rows[position] = row;
        }
        self.statements += 1;
        Ok(())
    }

    fn update_all(
        &mut self,
        scope: &Scope,
        assignments: &BTreeMap<String, Value>,
    ) -> Result<usize> {
        self.statements += 1;

        // 先檢查約束，語句要嘛全部生效，要嘛完全不生效
        if let Some(unique) = self.unique.get(&scope.entity) {
            let rows = self.tables.get(&scope.entity).map(Vec::as_slice).unwrap_or(&[]);
            let matched = rows.iter().filter(|row| row_matches(row, scope)).count();
            for (attribute, value) in assignments {
                if !unique.contains(attribute) || value.is_null() {
                    continue;
                }
                let taken = rows
                    .iter()
                    .any(|row| !row_matches(row, scope) && row.get(attribute) == Some(value));
                if matched > 1 || taken {
                    return Err(FlatteryError::Storage(format!(
                        "違反唯一性約束 {}.{} = {}",
                        scope.entity, attribute, value
                    )));
                }
            }
        }

        let Some(rows) = self.tables.get_mut(&scope.entity) else {
            return Ok(0);
        };

        let affected = rows
            .par_iter_mut()
            .filter(|row| row_matches(row, scope))
            .map(|row| {
                for (attribute, value) in assignments {
                    row.insert(attribute.clone(), value.clone());
                }
            })
            .count();

        Ok(affected)
    }

    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let snapshot = (self.tables.clone(), self.sequences.clone());
        match f(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::debug!("交易回滾: {}", e);
                (self.tables, self.sequences) = snapshot;
                Err(e)
            }
        }
    }
}
