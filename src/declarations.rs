//! 由 JSON 文件載入宣告
//!
//! ```json
//! {
//!   "note": { "flatten_value": [{ "category": "name" }] },
//!   "category": { "push_flattened_values_for": [{ "name": "notes", "as": "category_name" }] }
//! }
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;

use flattery_cache::FlattenValue;
use flattery_core::{FlatteryError, Result};
use flattery_provider::PushFlattenedValues;

use crate::Flattery;

/// 單一實體的宣告
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntityDeclarations {
    pub flatten_value: Vec<serde_json::Value>,
    pub push_flattened_values_for: Vec<serde_json::Value>,
}

impl Flattery {
    /// 載入 JSON 宣告文件；依實體名稱順序套用
    pub fn load_declarations(&mut self, json: &str) -> Result<()> {
        let document: BTreeMap<String, EntityDeclarations> =
            serde_json::from_str(json).map_err(|e| FlatteryError::InvalidOptions(e.to_string()))?;

        for (entity, declarations) in document {
            for options in &declarations.flatten_value {
                self.flatten_value(&entity, FlattenValue::from_json(options)?)?;
            }
            for options in &declarations.push_flattened_values_for {
                let options =
                    PushFlattenedValues::from_json(options, self.config().default_method)?;
                self.push_flattened_values_for(&entity, options)?;
            }
            tracing::debug!(
                "載入 {} 的宣告：快取 {} 筆、傳播 {} 筆",
                entity,
                declarations.flatten_value.len(),
                declarations.push_flattened_values_for.len()
            );
        }

        Ok(())
    }
}
