//! 設定容器：原始宣告與解析後對照表的兩階段狀態機
//!
//! 狀態只有兩種：`unresolved`（僅有原始宣告）與 `resolved`。
//! 第一次讀取 [`Settings::settings_with`] 時執行解析並保存結果，
//! 之後的讀取回傳同一份對照表。原始宣告改變時回到 `unresolved`。

use std::collections::BTreeMap;
use std::sync::OnceLock;

/// 設定容器
///
/// - `R`：原始宣告記錄
/// - `E`：解析後的設定項目（以字串為鍵）
#[derive(Debug, Clone)]
pub struct Settings<R, E> {
    raw: Vec<R>,
    resolved: OnceLock<BTreeMap<String, E>>,
}

impl<R, E> Default for Settings<R, E> {
    fn default() -> Self {
        Self {
            raw: Vec::new(),
            resolved: OnceLock::new(),
        }
    }
}

impl<R, E> Settings<R, E> {
    /// 創建空的設定
    pub fn new() -> Self {
        Self::default()
    }

    /// 原始宣告（依宣告順序，未經正規化）
    pub fn raw_settings(&self) -> &[R] {
        &self.raw
    }

    /// 是否已解析
    pub fn resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// 取得解析後的對照表；僅在第一次呼叫時執行 `resolve`
    pub fn settings_with<F>(&self, resolve: F) -> &BTreeMap<String, E>
    where
        F: FnOnce(&[R]) -> BTreeMap<String, E>,
    {
        self.resolved.get_or_init(|| resolve(&self.raw))
    }

    /// 加入一筆原始宣告，並回到未解析狀態
    pub fn push(&mut self, raw: R) {
        self.raw.push(raw);
        self.reset_resolution();
    }

    /// 清除所有宣告
    pub fn clear(&mut self) {
        self.raw.clear();
        self.reset_resolution();
    }

    /// 丟棄解析結果，保留原始宣告
    pub fn reset_resolution(&mut self) {
        self.resolved = OnceLock::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;

    fn by_upper(raw: &[String]) -> BTreeMap<String, usize> {
        raw.iter()
            .enumerate()
            .map(|(i, s)| (s.to_uppercase(), i))
            .collect()
    }

    #[test]
    fn test_lifecycle() {
        let mut settings: Settings<String, usize> = Settings::new();
        settings.push("name".to_string());

        assert!(!settings.resolved());

        let map = settings.settings_with(by_upper);
        assert_eq!(map.get("NAME"), Some(&0));
        assert!(settings.resolved());

        settings.push("title".to_string());
        assert!(!settings.resolved());
        assert_eq!(settings.settings_with(by_upper).len(), 2);

        settings.clear();
        assert!(settings.raw_settings().is_empty());
        assert!(settings.settings_with(by_upper).is_empty());
    }

    #[test]
    fn test_resolves_only_once() {
        let mut settings: Settings<String, usize> = Settings::new();
        settings.push("name".to_string());

        let calls = Cell::new(0);
        let first = settings.settings_with(|raw| {
            calls.set(calls.get() + 1);
            by_upper(raw)
        }) as *const _;
        let second = settings.settings_with(|raw| {
            calls.set(calls.get() + 1);
            by_upper(raw)
        }) as *const _;

        assert_eq!(calls.get(), 1);
        assert!(std::ptr::eq(first, second));
    }

    proptest! {
        #[test]
        fn prop_raw_settings_keep_declaration_order(names in prop::collection::vec("[a-z]{1,8}", 0..16)) {
            let mut settings: Settings<String, usize> = Settings::new();
            for name in &names {
                settings.push(name.clone());
            }
            let _ = settings.settings_with(by_upper);

            prop_assert_eq!(settings.raw_settings(), names.as_slice());
            prop_assert_eq!(settings.resolved(), true);
        }
    }
}
