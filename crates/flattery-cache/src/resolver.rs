//! 快取設定解析

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use flattery_core::{AssociationKind, SchemaRegistry};

use crate::options::CacheDeclaration;

/// 解析後的快取設定項目（以快取欄位名稱為鍵）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// 要遍歷的關聯
    pub association_name: String,

    /// 在關聯目標上讀取的方法
    pub association_method: String,

    /// 改變時需要重新計算的本地屬性
    pub changed_on: Vec<String>,
}

/// 將原始宣告解析為快取設定
///
/// 無法解析的宣告（關聯不存在、不是 BelongsTo、目標不可讀取該方法）
/// 直接略過，不視為錯誤。
pub fn resolve(
    entity: &str,
    declarations: &[CacheDeclaration],
    schema: &SchemaRegistry,
) -> BTreeMap<String, CacheEntry> {
    let mut settings = BTreeMap::new();

    let Some(owner) = schema.entity(entity) else {
        tracing::warn!("實體 {} 未註冊，略過 {} 筆快取宣告", entity, declarations.len());
        return settings;
    };

    for declaration in declarations {
        let association = match owner.association(&declaration.association) {
            Some(a) if a.kind == AssociationKind::BelongsTo => a,
            Some(_) => {
                tracing::debug!(
                    "{}.{} 不是 belongs_to 關聯，略過",
                    entity,
                    declaration.association
                );
                continue;
            }
            None => {
                tracing::debug!("{} 沒有關聯 {}，略過", entity, declaration.association);
                continue;
            }
        };

        if !schema.readable(&association.target, &declaration.method) {
            tracing::debug!(
                "{} 無法讀取 {}，略過 {}.{}",
                association.target,
                declaration.method,
                entity,
                declaration.association
            );
            continue;
        }

        settings.insert(
            declaration.column(),
            CacheEntry {
                association_name: association.name.clone(),
                association_method: declaration.method.clone(),
                changed_on: association.local_keys(),
            },
        );
    }

    tracing::debug!("實體 {} 快取設定解析完成: {} 筆", entity, settings.len());
    settings
}
