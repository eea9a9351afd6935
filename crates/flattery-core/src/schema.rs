//! 實體結構描述與關聯
//!
//! 以明確的註冊表取代執行期反射：解析快取設定時，
//! 透過 [`SchemaRegistry::readable`] 判斷目標實體是否可讀取某方法。

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::{FlatteryError, Record, Result, Value};

/// 衍生讀取器（非欄位的可讀方法）
pub type Reader = Arc<dyn Fn(&Record) -> Value + Send + Sync>;

/// 關聯類型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// 外鍵在本實體（單數）
    BelongsTo,
    /// 外鍵在目標實體（複數）
    HasMany,
    /// 外鍵在目標實體（單數）
    HasOne,
}

/// 關聯定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    /// 關聯名稱（如 `category`、`notes`）
    pub name: String,

    /// 關聯類型
    pub kind: AssociationKind,

    /// 目標實體名稱
    pub target: String,

    /// 外鍵屬性
    /// - BelongsTo：本實體上的屬性
    /// - HasMany/HasOne：目標實體上的屬性
    pub foreign_key: String,

    /// 外鍵所指向的主鍵屬性
    /// - BelongsTo：目標實體上的屬性
    /// - HasMany/HasOne：本實體上的屬性
    pub primary_key: String,
}

impl Association {
    /// 外鍵在本實體上的單數關聯，預設外鍵 `<name>_id`、主鍵 `id`
    pub fn belongs_to(name: impl Into<String>, target: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            foreign_key: format!("{}_id", name),
            kind: AssociationKind::BelongsTo,
            target: target.into(),
            primary_key: "id".to_string(),
            name,
        }
    }

    /// 外鍵在目標實體上的複數關聯，預設外鍵 `<owner>_id`、主鍵 `id`
    pub fn has_many(owner: &str, name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AssociationKind::HasMany,
            target: target.into(),
            foreign_key: format!("{}_id", owner),
            primary_key: "id".to_string(),
        }
    }

    /// 外鍵在目標實體上的單數關聯
    pub fn has_one(owner: &str, name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: AssociationKind::HasOne,
            ..Self::has_many(owner, name, target)
        }
    }

    /// 建構器模式：設置外鍵
    pub fn with_foreign_key(mut self, foreign_key: impl Into<String>) -> Self {
        self.foreign_key = foreign_key.into();
        self
    }

    /// 建構器模式：設置主鍵
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// 本實體上會使關聯目標改變的屬性
    pub fn local_keys(&self) -> Vec<String> {
        match self.kind {
            AssociationKind::BelongsTo => vec![self.foreign_key.clone()],
            AssociationKind::HasMany | AssociationKind::HasOne => vec![self.primary_key.clone()],
        }
    }
}

/// 實體結構描述
#[derive(Clone)]
pub struct EntitySchema {
    /// 實體名稱
    pub name: String,

    /// 主鍵屬性
    pub primary_key: String,

    attributes: BTreeSet<String>,
    readers: BTreeMap<String, Reader>,
    associations: BTreeMap<String, Association>,
}

impl EntitySchema {
    /// 創建新的實體描述，主鍵預設為 `id`
    pub fn new(name: impl Into<String>) -> Self {
        let mut attributes = BTreeSet::new();
        attributes.insert("id".to_string());
        Self {
            name: name.into(),
            primary_key: "id".to_string(),
            attributes,
            readers: BTreeMap::new(),
            associations: BTreeMap::new(),
        }
    }

    /// 建構器模式：設置主鍵
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        let primary_key = primary_key.into();
        self.attributes.insert(primary_key.clone());
        self.primary_key = primary_key;
        self
    }

    /// 建構器模式：加入欄位
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.insert(attribute.into());
        self
    }

    /// 建構器模式：加入多個欄位
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.extend(attributes.into_iter().map(Into::into));
        self
    }

    /// 建構器模式：加入衍生讀取器
    pub fn with_reader<F>(mut self, name: impl Into<String>, reader: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        self.readers.insert(name.into(), Arc::new(reader));
        self
    }

    /// 建構器模式：加入關聯
    ///
    /// BelongsTo 的外鍵會自動登記為本實體欄位。
    pub fn with_association(mut self, association: Association) -> Self {
        if association.kind == AssociationKind::BelongsTo {
            self.attributes.insert(association.foreign_key.clone());
        }
        self.associations.insert(association.name.clone(), association);
        self
    }

    /// 建構器模式：加入 BelongsTo 關聯（預設鍵）
    pub fn belongs_to(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.with_association(Association::belongs_to(name, target))
    }

    /// 建構器模式：加入 HasMany 關聯（預設鍵）
    pub fn has_many(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        let association = Association::has_many(&self.name, name, target);
        self.with_association(association)
    }

    /// 查找關聯
    pub fn association(&self, name: &str) -> Option<&Association> {
        self.associations.get(name)
    }

    /// 所有關聯
    pub fn associations(&self) -> impl Iterator<Item = &Association> {
        self.associations.values()
    }

    /// 是否有此欄位
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }

    /// 是否可讀取（欄位或衍生讀取器）
    pub fn readable(&self, name: &str) -> bool {
        self.has_attribute(name) || self.readers.contains_key(name)
    }

    /// 在記錄上讀取方法；欄位優先，其次衍生讀取器
    pub fn read(&self, record: &Record, name: &str) -> Option<Value> {
        if self.has_attribute(name) {
            return Some(record.get(name).clone());
        }
        self.readers.get(name).map(|reader| reader(record))
    }
}

impl fmt::Debug for EntitySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySchema")
            .field("name", &self.name)
            .field("primary_key", &self.primary_key)
            .field("attributes", &self.attributes)
            .field("readers", &self.readers.keys().collect::<Vec<_>>())
            .field("associations", &self.associations)
            .finish()
    }
}

/// 結構描述註冊表
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entities: HashMap<String, EntitySchema>,
}

impl SchemaRegistry {
    /// 創建空的註冊表
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：註冊實體
    pub fn with_entity(mut self, schema: EntitySchema) -> Self {
        self.register(schema);
        self
    }

    /// 註冊（或取代）實體
    pub fn register(&mut self, schema: EntitySchema) {
        self.entities.insert(schema.name.clone(), schema);
    }

    /// 查找實體
    pub fn entity(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.get(name)
    }

    /// 查找實體，找不到時回傳錯誤
    pub fn require(&self, name: &str) -> Result<&EntitySchema> {
        self.entity(name)
            .ok_or_else(|| FlatteryError::UnknownEntity(name.to_string()))
    }

    /// 查找關聯，找不到時回傳錯誤
    pub fn require_association(&self, entity: &str, association: &str) -> Result<&Association> {
        self.require(entity)?
            .association(association)
            .ok_or_else(|| FlatteryError::UnknownAssociation {
                entity: entity.to_string(),
                association: association.to_string(),
            })
    }

    /// 能力檢查：實體是否可讀取某方法
    pub fn readable(&self, entity: &str, method: &str) -> bool {
        self.entity(entity)
            .map(|schema| schema.readable(method))
            .unwrap_or(false)
    }
}
