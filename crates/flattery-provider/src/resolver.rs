//! 傳播設定解析

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use flattery_core::PropagationMethod;

use crate::PushFlattenedValues;

/// 解析後的傳播設定項目（以來源屬性為鍵）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// 接收值的關聯
    pub to_entity: String,

    /// 目標記錄上要寫入的欄位
    #[serde(rename = "as")]
    pub as_column: String,

    /// 批量寫入策略
    pub method: PropagationMethod,
}

/// 依來源屬性整理宣告；同一來源屬性以最後一筆為準
pub fn resolve(raw: &[PushFlattenedValues]) -> BTreeMap<String, ProviderEntry> {
    raw.iter()
        .map(|declaration| {
            (
                declaration.from_entity.clone(),
                ProviderEntry {
                    to_entity: declaration.to_entity.clone(),
                    as_column: declaration.as_column.clone(),
                    method: declaration.method,
                },
            )
        })
        .collect()
}
