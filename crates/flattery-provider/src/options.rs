//! 傳播宣告選項

use serde::{Deserialize, Serialize};

use flattery_core::{FlatteryError, PropagationMethod, Result};

/// 一筆 `push_flattened_values_for` 宣告（原始設定記錄）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushFlattenedValues {
    /// 來源屬性
    pub from_entity: String,

    /// 接收值的關聯
    pub to_entity: String,

    /// 目標記錄上要寫入的欄位
    #[serde(rename = "as")]
    pub as_column: String,

    /// 批量寫入策略
    pub method: PropagationMethod,
}

impl PushFlattenedValues {
    /// 創建新的宣告，策略預設為 `update_all`
    pub fn new(from: impl AsRef<str>, to: impl AsRef<str>, as_column: impl AsRef<str>) -> Self {
        Self {
            from_entity: from.as_ref().to_string(),
            to_entity: to.as_ref().to_string(),
            as_column: as_column.as_ref().to_string(),
            method: PropagationMethod::default(),
        }
    }

    /// 建構器模式：設置批量寫入策略
    pub fn method(mut self, method: PropagationMethod) -> Self {
        self.method = method;
        self
    }

    /// 由 JSON 解析
    ///
    /// 支援兩種寫法：
    /// - 完整：`{"from": "name", "to": "notes", "as": "category_name", "method": "update_all"}`
    /// - 簡寫：`{"name": "notes", "as": "category_name"}`
    ///
    /// 未指定 `method` 時使用 `default_method`。
    pub fn from_json(json: &serde_json::Value, default_method: PropagationMethod) -> Result<Self> {
        let map = json.as_object().ok_or_else(|| {
            FlatteryError::InvalidOptions(format!(
                "push_flattened_values_for 需要物件，收到 {}",
                json
            ))
        })?;

        let text = |key: &str| -> Result<Option<String>> {
            match map.get(key) {
                None => Ok(None),
                Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
                Some(other) => Err(FlatteryError::InvalidOptions(format!(
                    "{} 的值必須是字串: {}",
                    key, other
                ))),
            }
        };

        let as_column = text("as")?
            .ok_or_else(|| FlatteryError::InvalidOptions("缺少 as".to_string()))?;

        let method = match text("method")? {
            Some(name) => PropagationMethod::parse(&name).ok_or_else(|| {
                FlatteryError::InvalidOptions(format!("未知的批量寫入策略: {}", name))
            })?,
            None => default_method,
        };

        let (from, to) = match (text("from")?, text("to")?) {
            (Some(from), Some(to)) => (from, to),
            (None, None) => {
                let mut rest = map
                    .iter()
                    .filter(|(key, _)| !matches!(key.as_str(), "as" | "method"));
                match (rest.next(), rest.next()) {
                    (Some((from, serde_json::Value::String(to))), None) => {
                        (from.clone(), to.clone())
                    }
                    _ => {
                        return Err(FlatteryError::InvalidOptions(
                            "簡寫形式需要恰好一組 來源 => 關聯".to_string(),
                        ))
                    }
                }
            }
            _ => {
                return Err(FlatteryError::InvalidOptions(
                    "from 與 to 必須同時指定".to_string(),
                ))
            }
        };

        Ok(Self::new(from, to, as_column).method(method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_default_method() {
        let options = PushFlattenedValues::new("name", "notes", "category_name");
        assert_eq!(options.method, PropagationMethod::UpdateAll);
    }

    #[rstest]
    #[case(json!({"from": "name", "to": "notes", "as": "category_name"}))]
    #[case(json!({"name": "notes", "as": "category_name"}))]
    fn test_from_json_forms(#[case] input: serde_json::Value) {
        let options = PushFlattenedValues::from_json(&input, PropagationMethod::UpdateAll).unwrap();
        assert_eq!(options, PushFlattenedValues::new("name", "notes", "category_name"));
    }

    #[test]
    fn test_from_json_method() {
        let options = PushFlattenedValues::from_json(
            &json!({"name": "notes", "as": "category_name", "method": "each_record"}),
            PropagationMethod::UpdateAll,
        )
        .unwrap();
        assert_eq!(options.method, PropagationMethod::EachRecord);

        let defaulted = PushFlattenedValues::from_json(
            &json!({"name": "notes", "as": "category_name"}),
            PropagationMethod::EachRecord,
        )
        .unwrap();
        assert_eq!(defaulted.method, PropagationMethod::EachRecord);
    }

    #[rstest]
    #[case(json!({"name": "notes"}))]
    #[case(json!({"from": "name", "as": "category_name"}))]
    #[case(json!({"name": "notes", "title": "notes", "as": "category_name"}))]
    #[case(json!({"name": "notes", "as": "category_name", "method": "bulk"}))]
    #[case(json!("name"))]
    fn test_from_json_rejects(#[case] input: serde_json::Value) {
        let err = PushFlattenedValues::from_json(&input, PropagationMethod::UpdateAll).unwrap_err();
        assert!(matches!(err, FlatteryError::InvalidOptions(_)));
    }
}
