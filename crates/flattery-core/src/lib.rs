//! # Flattery Core
//!
//! 核心資料模型：值、記錄、變更集、結構描述、設定狀態機與儲存介面

pub mod changes;
pub mod config;
pub mod memory;
pub mod record;
pub mod schema;
pub mod settings;
pub mod store;
pub mod value;

// Re-export 主要類型
pub use changes::{Change, ChangeSet};
pub use config::{EngineConfig, PropagationMethod, PropagationTiming};
pub use memory::MemoryStore;
pub use record::Record;
pub use schema::{Association, AssociationKind, EntitySchema, SchemaRegistry};
pub use settings::Settings;
pub use store::{Scope, Store};
pub use value::Value;

/// Flattery 錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum FlatteryError {
    #[error("找不到實體: {0}")]
    UnknownEntity(String),

    #[error("實體 {entity} 沒有關聯: {association}")]
    UnknownAssociation { entity: String, association: String },

    #[error("關聯類型不符 {entity}.{association}: {reason}")]
    InvalidAssociation {
        entity: String,
        association: String,
        reason: String,
    },

    #[error("找不到記錄: {entity} {key}")]
    RecordNotFound { entity: String, key: String },

    #[error("無效的宣告選項: {0}")]
    InvalidOptions(String),

    #[error("儲存錯誤: {0}")]
    Storage(String),

    #[error("引擎配置錯誤: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FlatteryError>;
