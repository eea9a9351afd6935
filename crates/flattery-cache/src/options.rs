//! 快取宣告選項

use serde::{Deserialize, Serialize};

use flattery_core::{FlatteryError, Result};

/// 覆寫快取欄位名稱的保留鍵
pub const AS_KEY: &str = "as";

/// 一次 `flatten_value` 宣告
///
/// 由若干 `(關聯, 方法)` 組成，可選擇以 `as` 覆寫快取欄位名稱。
/// 覆寫套用到本次宣告的每一組；多組共用同一欄位時，後者覆蓋前者。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenValue {
    pairs: Vec<(String, String)>,
    cache_as: Option<String>,
}

impl FlattenValue {
    /// 創建空的宣告
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：加入 `關聯 => 方法`
    pub fn value(mut self, association: impl AsRef<str>, method: impl AsRef<str>) -> Self {
        self.pairs.push((
            association.as_ref().to_string(),
            method.as_ref().to_string(),
        ));
        self
    }

    /// 建構器模式：覆寫快取欄位名稱
    pub fn cache_as(mut self, column: impl AsRef<str>) -> Self {
        self.cache_as = Some(column.as_ref().to_string());
        self
    }

    /// 由 JSON 對照表解析，如 `{"category": "name", "as": "cat_name"}`
    ///
    /// `null` 回傳 `None`（代表清除設定）。
    pub fn from_json(json: &serde_json::Value) -> Result<Option<Self>> {
        let map = match json {
            serde_json::Value::Null => return Ok(None),
            serde_json::Value::Object(map) => map,
            other => {
                return Err(FlatteryError::InvalidOptions(format!(
                    "flatten_value 需要物件，收到 {}",
                    other
                )))
            }
        };

        let mut options = FlattenValue::new();
        for (key, value) in map {
            let value = value.as_str().ok_or_else(|| {
                FlatteryError::InvalidOptions(format!("{} 的值必須是字串: {}", key, value))
            })?;
            if key == AS_KEY {
                options = options.cache_as(value);
            } else {
                options = options.value(key, value);
            }
        }
        Ok(Some(options))
    }

    /// 是否為完全空白的宣告（沒有任何配對，也沒有 `as`）
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.cache_as.is_none()
    }

    /// 展開為逐筆的原始宣告
    pub fn declarations(&self) -> Vec<CacheDeclaration> {
        self.pairs
            .iter()
            .map(|(association, method)| CacheDeclaration {
                association: association.clone(),
                method: method.clone(),
                cache_as: self.cache_as.clone(),
            })
            .collect()
    }
}

/// 原始宣告記錄（未驗證）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDeclaration {
    pub association: String,
    pub method: String,
    pub cache_as: Option<String>,
}

impl CacheDeclaration {
    /// 快取欄位名稱：覆寫值，否則 `<關聯>_<方法>`
    pub fn column(&self) -> String {
        self.cache_as
            .clone()
            .unwrap_or_else(|| format!("{}_{}", self.association, self.method))
    }
}
