//! # Flattery Provider
//!
//! 提供值的一方：解析 `push_flattened_values_for` 宣告，
//! 並在來源屬性變更時批量更新所有關聯記錄的快取欄位

pub mod options;
pub mod propagation;
pub mod resolver;

use std::collections::BTreeMap;

use flattery_core::{
    ChangeSet, PropagationMethod, PropagationTiming, Record, Result, SchemaRegistry, Settings,
    Store,
};

// Re-export 主要類型
pub use options::PushFlattenedValues;
pub use propagation::{PropagatedUpdate, PropagationReport, Propagator};
pub use resolver::ProviderEntry;

/// 實體的傳播設定
#[derive(Debug, Clone)]
pub struct ValueProvider {
    entity: String,
    default_method: PropagationMethod,
    settings: Settings<PushFlattenedValues, ProviderEntry>,
}

impl ValueProvider {
    /// 創建實體的空傳播設定
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            default_method: PropagationMethod::default(),
            settings: Settings::new(),
        }
    }

    /// 建構器模式：設置 [`ValueProvider::declare`] 使用的預設策略
    pub fn with_default_method(mut self, method: PropagationMethod) -> Self {
        self.default_method = method;
        self
    }

    /// 實體名稱
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// 加入一筆宣告
    pub fn push_flattened_values_for(&mut self, options: PushFlattenedValues) {
        self.settings.push(options);
    }

    /// 以預設策略加入 `from => to, as:` 宣告
    pub fn declare(&mut self, from: &str, to: &str, as_column: &str) {
        let options = PushFlattenedValues::new(from, to, as_column).method(self.default_method);
        self.push_flattened_values_for(options);
    }

    /// 清除所有宣告
    pub fn clear(&mut self) {
        self.settings.clear();
    }

    /// 原始宣告（依宣告順序）
    pub fn raw_settings(&self) -> &[PushFlattenedValues] {
        self.settings.raw_settings()
    }

    /// 是否已解析
    pub fn resolved(&self) -> bool {
        self.settings.resolved()
    }

    /// 解析後的設定（第一次呼叫時解析）
    pub fn settings(&self) -> &BTreeMap<String, ProviderEntry> {
        self.settings.settings_with(resolver::resolve)
    }

    /// 傳播來源記錄的變更
    pub fn propagate<S: Store>(
        &self,
        record: &Record,
        changes: &ChangeSet,
        schema: &SchemaRegistry,
        store: &mut S,
        timing: PropagationTiming,
    ) -> Result<PropagationReport> {
        let settings = self.settings();
        if settings.is_empty() {
            return Ok(PropagationReport::default());
        }
        Propagator::new(settings, schema).propagate(record, changes, store, timing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flattery_core::{EntitySchema, FlatteryError, MemoryStore, Scope, Value};

    fn schema() -> SchemaRegistry {
        SchemaRegistry::new()
            .with_entity(
                EntitySchema::new("category")
                    .with_attribute("name")
                    .has_many("notes", "note")
                    .belongs_to("parent", "category"),
            )
            .with_entity(
                EntitySchema::new("note")
                    .with_attribute("category_name")
                    .belongs_to("category", "category"),
            )
    }

    fn provider() -> ValueProvider {
        let mut provider = ValueProvider::new("category");
        provider.push_flattened_values_for(PushFlattenedValues::new(
            "name",
            "notes",
            "category_name",
        ));
        provider
    }

    /// 建立兩個分類與各自的筆記，回傳已持久化的第一個分類
    fn seed(store: &mut MemoryStore) -> Record {
        let mut sports = Record::new("category").with("name", "Sports");
        store.insert(&mut sports).unwrap();
        sports.mark_persisted();
        let mut news = Record::new("category").with("name", "News");
        store.insert(&mut news).unwrap();

        for category in [&sports, &news, &sports] {
            let mut note = Record::new("note")
                .with("category_id", category.get("id").clone())
                .with("category_name", category.get("name").clone());
            store.insert(&mut note).unwrap();
        }
        sports
    }

    fn notes_named(store: &MemoryStore, category_id: i64) -> Vec<Value> {
        store
            .select(&Scope::new("note", "category_id", Value::Int(category_id)))
            .unwrap()
            .iter()
            .map(|n| n.get("category_name").clone())
            .collect()
    }

    #[test]
    fn test_settings_before_resolution() {
        let provider = provider();
        assert_eq!(
            provider.raw_settings(),
            &[PushFlattenedValues {
                from_entity: "name".to_string(),
                to_entity: "notes".to_string(),
                as_column: "category_name".to_string(),
                method: PropagationMethod::UpdateAll,
            }]
        );
        assert!(!provider.resolved());
    }

    #[test]
    fn test_settings_after_resolution() {
        let provider = provider();
        let first = provider.settings() as *const _;
        assert!(provider.resolved());

        let mut expected = BTreeMap::new();
        expected.insert(
            "name".to_string(),
            ProviderEntry {
                to_entity: "notes".to_string(),
                as_column: "category_name".to_string(),
                method: PropagationMethod::UpdateAll,
            },
        );
        assert_eq!(provider.settings(), &expected);
        assert!(std::ptr::eq(first, provider.settings()));
    }

    #[test]
    fn test_raw_settings_keep_declaration_order() {
        let mut provider = ValueProvider::new("category");
        provider.declare("name", "notes", "category_name");
        provider.declare("color", "notes", "category_color");

        let froms: Vec<_> = provider
            .raw_settings()
            .iter()
            .map(|r| r.from_entity.as_str())
            .collect();
        assert_eq!(froms, vec!["name", "color"]);
        assert_eq!(provider.settings().len(), 2);
    }

    #[test]
    fn test_update_all_reaches_every_associated_note() {
        let schema = schema();
        let mut store = MemoryStore::new();
        let mut sports = seed(&mut store);
        let statements = store.statements();

        sports.set("name", "Athletics");
        let report = provider()
            .propagate(
                &sports,
                &sports.changes(),
                &schema,
                &mut store,
                PropagationTiming::BeforeSave,
            )
            .unwrap();

        assert_eq!(report.total_rows(), 2);
        assert_eq!(store.statements(), statements + 1);
        assert_eq!(
            notes_named(&store, 1),
            vec![Value::from("Athletics"), Value::from("Athletics")]
        );
        assert_eq!(notes_named(&store, 2), vec![Value::from("News")]);
    }

    #[test]
    fn test_each_record_matches_update_all() {
        let schema = schema();
        let mut store = MemoryStore::new();
        let mut sports = seed(&mut store);

        let mut provider = ValueProvider::new("category")
            .with_default_method(PropagationMethod::EachRecord);
        provider.declare("name", "notes", "category_name");

        sports.set("name", "Athletics");
        let report = provider
            .propagate(
                &sports,
                &sports.changes(),
                &schema,
                &mut store,
                PropagationTiming::BeforeSave,
            )
            .unwrap();

        assert_eq!(report.total_rows(), 2);
        assert_eq!(
            notes_named(&store, 1),
            vec![Value::from("Athletics"), Value::from("Athletics")]
        );
    }

    #[test]
    fn test_unchanged_source_does_nothing() {
        let schema = schema();
        let mut store = MemoryStore::new();
        let sports = seed(&mut store);
        let statements = store.statements();

        let report = provider()
            .propagate(
                &sports,
                &sports.changes(),
                &schema,
                &mut store,
                PropagationTiming::BeforeSave,
            )
            .unwrap();

        assert!(report.is_empty());
        assert_eq!(store.statements(), statements);
    }

    #[test]
    fn test_new_source_record_is_skipped() {
        let schema = schema();
        let mut store = MemoryStore::new();
        let category = Record::new("category").with("name", "Fresh");

        let report = provider()
            .propagate(
                &category,
                &category.changes(),
                &schema,
                &mut store,
                PropagationTiming::BeforeSave,
            )
            .unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_unknown_and_invalid_associations() {
        let schema = schema();
        let mut store = MemoryStore::new();
        let mut sports = seed(&mut store);
        sports.set("name", "Athletics");

        let mut unknown = ValueProvider::new("category");
        unknown.declare("name", "articles", "category_name");
        let err = unknown
            .propagate(
                &sports,
                &sports.changes(),
                &schema,
                &mut store,
                PropagationTiming::BeforeSave,
            )
            .unwrap_err();
        assert!(matches!(err, FlatteryError::UnknownAssociation { .. }));

        let mut invalid = ValueProvider::new("category");
        invalid.declare("name", "parent", "child_name");
        let err = invalid
            .propagate(
                &sports,
                &sports.changes(),
                &schema,
                &mut store,
                PropagationTiming::BeforeSave,
            )
            .unwrap_err();
        assert!(matches!(err, FlatteryError::InvalidAssociation { .. }));
    }

    #[test]
    fn test_storage_error_propagates() {
        let schema = schema();
        let mut store = MemoryStore::new().with_unique("note", "category_name");
        let mut sports = Record::new("category").with("name", "Sports");
        store.insert(&mut sports).unwrap();
        sports.mark_persisted();
        for _ in 0..2 {
            let mut note = Record::new("note").with("category_id", sports.get("id").clone());
            store.insert(&mut note).unwrap();
        }

        sports.set("name", "Athletics");
        let err = provider()
            .propagate(
                &sports,
                &sports.changes(),
                &schema,
                &mut store,
                PropagationTiming::BeforeSave,
            )
            .unwrap_err();
        assert!(matches!(err, FlatteryError::Storage(_)));
    }
}
