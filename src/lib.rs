//! # Flattery
//!
//! 關聯記錄的反正規化快取值同步引擎
//!
//! - 持有快取的一方以 [`FlattenValue`] 宣告 `關聯 => 方法`，寫入前自動重算
//! - 提供值的一方以 [`PushFlattenedValues`] 宣告 `來源屬性 => 關聯, as: 欄位`，
//!   來源變更時批量更新所有關聯記錄

pub mod declarations;
pub mod engine;

// Re-export 主要類型
pub use engine::{Flattery, SaveReport};
pub use flattery_cache::{CacheEntry, FlattenValue, ValueCache};
pub use flattery_core::{
    Association, AssociationKind, Change, ChangeSet, EngineConfig, EntitySchema, FlatteryError,
    MemoryStore, PropagationMethod, PropagationTiming, Record, Result, SchemaRegistry, Scope,
    Store, Value,
};
pub use flattery_provider::{PropagationReport, ProviderEntry, PushFlattenedValues, ValueProvider};
